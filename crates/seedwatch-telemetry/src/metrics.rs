//! Prometheus-backed metrics registry and snapshot helpers.
//!
//! # Design
//! - Encapsulates collector registration to keep the public API small.
//! - Exposes the counters the monitor and completion pipeline care about.

use std::sync::Arc;

use prometheus::{Encoder, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};
use serde::Serialize;

use crate::error::{Result, TelemetryError};

/// Outcome of a single monitor pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// The job list was fetched and every job evaluated.
    Completed,
    /// The job source could not be queried; the pass was skipped.
    SourceUnavailable,
}

impl PollOutcome {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::SourceUnavailable => "source_unavailable",
        }
    }
}

/// Message operation performed against the notification channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportAction {
    /// A new report message was sent.
    Sent,
    /// An existing report message was edited in place.
    Edited,
    /// A report message was deleted after the idle timeout.
    Deleted,
}

impl ReportAction {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Sent => "sent",
            Self::Edited => "edited",
            Self::Deleted => "deleted",
        }
    }
}

/// Prometheus-backed metrics registry shared across services.
#[derive(Clone)]
pub struct Metrics {
    inner: Arc<MetricsInner>,
}

struct MetricsInner {
    registry: Registry,
    polls_total: IntCounterVec,
    reports_total: IntCounterVec,
    channel_errors_total: IntCounterVec,
    pipeline_steps_total: IntCounterVec,
    completions_triggered_total: IntCounter,
    tracked_jobs: IntGauge,
}

/// Snapshot of selected gauges and counters.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct MetricsSnapshot {
    /// Completed monitor passes.
    pub polls_completed: u64,
    /// Passes skipped because the job source was unavailable.
    pub polls_skipped: u64,
    /// Report messages sent.
    pub reports_sent: u64,
    /// Report messages edited.
    pub reports_edited: u64,
    /// Report messages deleted.
    pub reports_deleted: u64,
    /// Completion pipelines started.
    pub completions_triggered: u64,
    /// Jobs currently holding a tracking entry.
    pub tracked_jobs: i64,
}

impl Metrics {
    /// Construct a new metrics registry with the standard collectors registered.
    ///
    /// # Errors
    ///
    /// Returns an error if any of the Prometheus collectors cannot be built or registered.
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let polls_total = counter_vec(
            "polls_total",
            "Monitor passes by outcome",
            &["outcome"],
        )?;
        let reports_total = counter_vec(
            "reports_total",
            "Report message operations by action",
            &["action"],
        )?;
        let channel_errors_total = counter_vec(
            "channel_errors_total",
            "Notification channel failures by operation",
            &["operation"],
        )?;
        let pipeline_steps_total = counter_vec(
            "pipeline_steps_total",
            "Completion pipeline steps executed by status",
            &["step", "status"],
        )?;
        let completions_triggered_total = IntCounter::with_opts(Opts::new(
            "completions_triggered_total",
            "Completion pipelines dispatched",
        ))
        .map_err(|source| TelemetryError::MetricsCollector {
            name: "completions_triggered_total",
            source,
        })?;
        let tracked_jobs = IntGauge::with_opts(Opts::new(
            "tracked_jobs",
            "Jobs holding a tracking entry",
        ))
        .map_err(|source| TelemetryError::MetricsCollector {
            name: "tracked_jobs",
            source,
        })?;

        register(&registry, "polls_total", Box::new(polls_total.clone()))?;
        register(&registry, "reports_total", Box::new(reports_total.clone()))?;
        register(
            &registry,
            "channel_errors_total",
            Box::new(channel_errors_total.clone()),
        )?;
        register(
            &registry,
            "pipeline_steps_total",
            Box::new(pipeline_steps_total.clone()),
        )?;
        register(
            &registry,
            "completions_triggered_total",
            Box::new(completions_triggered_total.clone()),
        )?;
        register(&registry, "tracked_jobs", Box::new(tracked_jobs.clone()))?;

        Ok(Self {
            inner: Arc::new(MetricsInner {
                registry,
                polls_total,
                reports_total,
                channel_errors_total,
                pipeline_steps_total,
                completions_triggered_total,
                tracked_jobs,
            }),
        })
    }

    /// Count a finished monitor pass.
    pub fn inc_poll(&self, outcome: PollOutcome) {
        self.inner
            .polls_total
            .with_label_values(&[outcome.as_str()])
            .inc();
    }

    /// Count a report message operation.
    pub fn inc_report(&self, action: ReportAction) {
        self.inner
            .reports_total
            .with_label_values(&[action.as_str()])
            .inc();
    }

    /// Count a failed notification channel call.
    pub fn inc_channel_error(&self, operation: &str) {
        self.inner
            .channel_errors_total
            .with_label_values(&[operation])
            .inc();
    }

    /// Count a completion pipeline step transition.
    pub fn inc_pipeline_step(&self, step: &str, status: &str) {
        self.inner
            .pipeline_steps_total
            .with_label_values(&[step, status])
            .inc();
    }

    /// Count a dispatched completion pipeline.
    pub fn inc_completion_triggered(&self) {
        self.inner.completions_triggered_total.inc();
    }

    /// Record how many jobs hold a tracking entry.
    pub fn set_tracked_jobs(&self, count: usize) {
        self.inner
            .tracked_jobs
            .set(i64::try_from(count).unwrap_or(i64::MAX));
    }

    /// Render the metrics registry using the Prometheus text exposition format.
    ///
    /// # Errors
    ///
    /// Returns an error if the metrics cannot be encoded or if the encoded
    /// buffer is not valid UTF-8.
    pub fn render(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.inner.registry.gather();
        let mut buffer = Vec::new();
        encoder
            .encode(&metric_families, &mut buffer)
            .map_err(|source| TelemetryError::MetricsEncode { source })?;
        String::from_utf8(buffer).map_err(|source| TelemetryError::MetricsUtf8 { source })
    }

    /// Take a point-in-time snapshot of the most relevant gauges and counters.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        let polls = |outcome: PollOutcome| {
            self.inner
                .polls_total
                .with_label_values(&[outcome.as_str()])
                .get()
        };
        let reports = |action: ReportAction| {
            self.inner
                .reports_total
                .with_label_values(&[action.as_str()])
                .get()
        };
        MetricsSnapshot {
            polls_completed: polls(PollOutcome::Completed),
            polls_skipped: polls(PollOutcome::SourceUnavailable),
            reports_sent: reports(ReportAction::Sent),
            reports_edited: reports(ReportAction::Edited),
            reports_deleted: reports(ReportAction::Deleted),
            completions_triggered: self.inner.completions_triggered_total.get(),
            tracked_jobs: self.inner.tracked_jobs.get(),
        }
    }
}

fn counter_vec(name: &'static str, help: &str, labels: &[&str]) -> Result<IntCounterVec> {
    IntCounterVec::new(Opts::new(name, help), labels)
        .map_err(|source| TelemetryError::MetricsCollector { name, source })
}

fn register(
    registry: &Registry,
    name: &'static str,
    collector: Box<dyn prometheus::core::Collector>,
) -> Result<()> {
    registry
        .register(collector)
        .map_err(|source| TelemetryError::MetricsRegister { name, source })
}
