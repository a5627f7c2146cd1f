//! Per-poll reconciliation between job snapshots and the posted status reports.
//!
//! # Design
//! - One tracking entry per job name holds the live message handle and the last upload time.
//! - The monitor is driven by a single task, so its tables are owned rather than shared.
//! - Channel and source failures are logged and counted; they never abort a pass.
//! - Completion fires at most once per job name while the job stays in the source list.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use seedwatch_config::MonitorSettings;
use seedwatch_fsops::{CompletionPipeline, CompletionRequest};
use seedwatch_telemetry::{Metrics, PollOutcome, ReportAction};
use seedwatch_torrent_core::{
    ChannelError, HostMetrics, HostProbe, HostSample, JobSnapshot, JobSource, MessageHandle,
    NotificationChannel,
};
use tracing::{debug, info, warn};

use crate::report;

/// Hands a completed job over to packaging and delivery without waiting for it.
pub trait CompletionDispatcher: Send + Sync {
    /// Start processing `request` in the background.
    fn dispatch(&self, request: CompletionRequest);
}

/// Dispatcher running each request on a detached task.
#[derive(Clone)]
pub struct PipelineDispatcher {
    pipeline: Arc<CompletionPipeline>,
}

impl PipelineDispatcher {
    /// Wrap `pipeline`.
    #[must_use]
    pub fn new(pipeline: CompletionPipeline) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
        }
    }
}

impl CompletionDispatcher for PipelineDispatcher {
    fn dispatch(&self, request: CompletionRequest) {
        let pipeline = Arc::clone(&self.pipeline);
        let _detached = tokio::spawn(async move { pipeline.process(request).await });
    }
}

#[derive(Debug, Clone, Copy)]
struct TrackingEntry {
    handle: Option<MessageHandle>,
    last_upload_at: Instant,
}

impl TrackingEntry {
    const fn new(now: Instant) -> Self {
        Self {
            handle: None,
            last_upload_at: now,
        }
    }
}

/// Reconciles each poll's job list with the messages posted to the status chat.
pub struct ActivityMonitor {
    source: Arc<dyn JobSource>,
    channel: Arc<dyn NotificationChannel>,
    probe: Arc<dyn HostProbe>,
    dispatcher: Arc<dyn CompletionDispatcher>,
    metrics: Metrics,
    idle_timeout: Duration,
    downloads_root: PathBuf,
    entries: HashMap<String, TrackingEntry>,
    completed: HashSet<String>,
}

impl ActivityMonitor {
    /// Build a monitor reporting through `channel` with the idle timeout and downloads root
    /// taken from `settings`.
    #[must_use]
    pub fn new(
        source: Arc<dyn JobSource>,
        channel: Arc<dyn NotificationChannel>,
        probe: Arc<dyn HostProbe>,
        dispatcher: Arc<dyn CompletionDispatcher>,
        metrics: Metrics,
        settings: &MonitorSettings,
    ) -> Self {
        Self {
            source,
            channel,
            probe,
            dispatcher,
            metrics,
            idle_timeout: settings.idle_timeout,
            downloads_root: settings.downloads_root.clone(),
            entries: HashMap::new(),
            completed: HashSet::new(),
        }
    }

    /// Number of jobs currently holding a tracking entry.
    #[must_use]
    pub fn tracked_jobs(&self) -> usize {
        self.entries.len()
    }

    /// Run one pass at the current time.
    pub async fn poll(&mut self) -> PollOutcome {
        self.poll_at(Instant::now()).await
    }

    /// Run one pass as if the clock read `now`.
    pub async fn poll_at(&mut self, now: Instant) -> PollOutcome {
        let jobs = match self.source.list_jobs().await {
            Ok(jobs) => jobs,
            Err(err) => {
                warn!(error = %err, "job source unavailable; skipping poll");
                self.metrics.inc_poll(PollOutcome::SourceUnavailable);
                return PollOutcome::SourceUnavailable;
            }
        };
        debug!(jobs = jobs.len(), "poll started");

        let host = if jobs.iter().any(needs_report) {
            self.host_metrics().await
        } else {
            HostMetrics::default()
        };
        for job in &jobs {
            self.evaluate(job, &host, now).await;
        }
        self.prune(&jobs);

        self.metrics.set_tracked_jobs(self.entries.len());
        self.metrics.inc_poll(PollOutcome::Completed);
        PollOutcome::Completed
    }

    async fn evaluate(&mut self, job: &JobSnapshot, host: &HostMetrics, now: Instant) {
        if job.is_idle_seeding() {
            self.check_idle(job, now).await;
        }

        if let Some(text) = report::render(job, host) {
            self.upsert(&job.name, &text, now).await;
        }

        if job.is_completed() && self.completed.insert(job.name.clone()) {
            info!(job = %job.name, "download completed; dispatching completion pipeline");
            self.metrics.inc_completion_triggered();
            self.dispatcher
                .dispatch(CompletionRequest::new(job.name.clone(), &self.downloads_root));
        }

        if job.upspeed > 0 {
            self.entry(&job.name, now).last_upload_at = now;
        }
    }

    /// Retire the report of a seeding job without upload traffic once the idle timeout has passed;
    /// otherwise restart its idle window.
    async fn check_idle(&mut self, job: &JobSnapshot, now: Instant) {
        let idle_timeout = self.idle_timeout;
        let entry = self.entry(&job.name, now);
        let idle = now.saturating_duration_since(entry.last_upload_at);
        let expired = match entry.handle {
            Some(handle) if idle > idle_timeout => Some(handle),
            _ => {
                entry.last_upload_at = now;
                None
            }
        };
        let Some(handle) = expired else {
            return;
        };

        match self.channel.delete_message(handle).await {
            Ok(()) => {
                self.entries.remove(&job.name);
                self.metrics.inc_report(ReportAction::Deleted);
                info!(
                    job = %job.name,
                    idle_secs = idle.as_secs(),
                    "report removed after upload inactivity"
                );
            }
            Err(err) => record_channel_error(&self.metrics, &job.name, &err),
        }
    }

    /// Edit the job's message in place, or send a new one when none is held yet.
    async fn upsert(&mut self, name: &str, text: &str, now: Instant) {
        let entry = self
            .entries
            .entry(name.to_string())
            .or_insert_with(|| TrackingEntry::new(now));
        match entry.handle {
            Some(handle) => match self.channel.edit_message(handle, text).await {
                Ok(()) => self.metrics.inc_report(ReportAction::Edited),
                Err(err) => record_channel_error(&self.metrics, name, &err),
            },
            None => match self.channel.send_message(text).await {
                Ok(handle) => {
                    entry.handle = Some(handle);
                    self.metrics.inc_report(ReportAction::Sent);
                    debug!(job = name, %handle, "report sent");
                }
                Err(err) => record_channel_error(&self.metrics, name, &err),
            },
        }
    }

    fn entry(&mut self, name: &str, now: Instant) -> &mut TrackingEntry {
        self.entries
            .entry(name.to_string())
            .or_insert_with(|| TrackingEntry::new(now))
    }

    /// Forget jobs the source no longer lists. Their last report stays in the chat.
    fn prune(&mut self, jobs: &[JobSnapshot]) {
        let live: HashSet<&str> = jobs.iter().map(|job| job.name.as_str()).collect();
        self.entries.retain(|name, _| live.contains(name.as_str()));
        self.completed.retain(|name| live.contains(name.as_str()));
    }

    async fn host_metrics(&self) -> HostMetrics {
        let (sample, free_space) =
            tokio::join!(self.probe.sample(), self.source.free_disk_space());
        let sample = sample.unwrap_or_else(|err| {
            warn!(error = %err, operation = err.operation, "host probe failed");
            HostSample::default()
        });
        let free_space = free_space.unwrap_or_else(|err| {
            warn!(error = %err, "free space query failed");
            None
        });
        HostMetrics::new(sample, free_space)
    }
}

fn needs_report(job: &JobSnapshot) -> bool {
    job.state.is_download_reportable() || job.upspeed > 0
}

fn record_channel_error(metrics: &Metrics, job: &str, err: &ChannelError) {
    metrics.inc_channel_error(err.operation());
    warn!(job, operation = err.operation(), error = %err, "notification channel call failed");
}

#[cfg(test)]
mod tests {
    use super::*;
    use seedwatch_test_support::fixtures::{downloading, seeding};
    use seedwatch_test_support::mocks::{
        ChannelCall, FixedHostProbe, RecordingChannel, ScriptedJobSource,
    };
    use std::sync::Mutex;

    const IDLE: Duration = Duration::from_secs(15);

    #[derive(Default)]
    struct RecordingDispatcher {
        requests: Mutex<Vec<CompletionRequest>>,
    }

    impl RecordingDispatcher {
        fn names(&self) -> Vec<String> {
            self.requests
                .lock()
                .map(|requests| requests.iter().map(|request| request.name.clone()).collect())
                .unwrap_or_default()
        }
    }

    impl CompletionDispatcher for RecordingDispatcher {
        fn dispatch(&self, request: CompletionRequest) {
            if let Ok(mut requests) = self.requests.lock() {
                requests.push(request);
            }
        }
    }

    struct Harness {
        source: Arc<ScriptedJobSource>,
        channel: Arc<RecordingChannel>,
        dispatcher: Arc<RecordingDispatcher>,
        metrics: Metrics,
        monitor: ActivityMonitor,
    }

    impl Harness {
        fn new() -> anyhow::Result<Self> {
            Self::with_probe(FixedHostProbe::new(HostSample {
                cpu_percent: 10.0,
                ram_percent: 20.0,
                uptime: Duration::from_secs(60),
            }))
        }

        fn with_probe(probe: FixedHostProbe) -> anyhow::Result<Self> {
            let source = Arc::new(ScriptedJobSource::new());
            source.set_free_space(Some(1_073_741_824));
            let channel = Arc::new(RecordingChannel::new());
            let dispatcher = Arc::new(RecordingDispatcher::default());
            let metrics = Metrics::new()?;
            let settings = MonitorSettings {
                poll_interval: Duration::from_secs(7),
                idle_timeout: IDLE,
                downloads_root: PathBuf::from("/downloads"),
                require_start_command: false,
            };
            let monitor = ActivityMonitor::new(
                source.clone(),
                channel.clone(),
                Arc::new(probe),
                dispatcher.clone(),
                metrics.clone(),
                &settings,
            );
            Ok(Self {
                source,
                channel,
                dispatcher,
                metrics,
                monitor,
            })
        }
    }

    #[tokio::test]
    async fn first_report_sends_and_later_reports_edit_the_same_message() -> anyhow::Result<()> {
        let mut harness = Harness::new()?;
        let start = Instant::now();
        harness.source.push_jobs(vec![downloading("Movie", 0.1)]);
        harness.source.push_jobs(vec![downloading("Movie", 0.5)]);

        harness.monitor.poll_at(start).await;
        harness.monitor.poll_at(start + Duration::from_secs(7)).await;

        let calls = harness.channel.calls();
        assert_eq!(calls.len(), 2);
        let ChannelCall::Send { handle, text } = &calls[0] else {
            anyhow::bail!("expected a send, got {:?}", calls[0]);
        };
        assert!(text.contains("[▰▱▱▱▱▱▱▱▱▱] 10.00%"));
        assert!(matches!(
            &calls[1],
            ChannelCall::Edit { handle: edited, text } if edited == handle && text.contains("50.00%")
        ));

        let snapshot = harness.metrics.snapshot();
        assert_eq!(snapshot.reports_sent, 1);
        assert_eq!(snapshot.reports_edited, 1);
        assert_eq!(snapshot.tracked_jobs, 1);
        Ok(())
    }

    #[tokio::test]
    async fn idle_seeding_report_is_removed_exactly_once() -> anyhow::Result<()> {
        let mut harness = Harness::new()?;
        let start = Instant::now();
        harness.source.push_jobs(vec![seeding("Show", 2_048)]);
        harness.source.push_jobs(vec![seeding("Show", 0)]);

        harness.monitor.poll_at(start).await;
        harness.monitor.poll_at(start + Duration::from_secs(20)).await;
        for extra in 1..=5 {
            harness
                .monitor
                .poll_at(start + Duration::from_secs(20 + extra * 20))
                .await;
        }

        let calls = harness.channel.calls();
        let deletes = calls
            .iter()
            .filter(|call| matches!(call, ChannelCall::Delete { .. }))
            .count();
        assert_eq!(deletes, 1);
        assert_eq!(harness.channel.sent_texts().len(), 1);
        assert!(matches!(
            calls.last(),
            Some(ChannelCall::Delete { handle }) if *handle == MessageHandle(1)
        ));
        assert_eq!(harness.metrics.snapshot().reports_deleted, 1);
        Ok(())
    }

    #[tokio::test]
    async fn idle_window_restarts_while_under_the_timeout() -> anyhow::Result<()> {
        let mut harness = Harness::new()?;
        let start = Instant::now();
        harness.source.push_jobs(vec![seeding("Show", 2_048)]);
        harness.source.push_jobs(vec![seeding("Show", 0)]);

        harness.monitor.poll_at(start).await;
        for step in 1..=4 {
            harness
                .monitor
                .poll_at(start + Duration::from_secs(step * 10))
                .await;
        }

        assert!(
            !harness
                .channel
                .calls()
                .iter()
                .any(|call| matches!(call, ChannelCall::Delete { .. }))
        );
        assert_eq!(harness.monitor.tracked_jobs(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn failed_delete_keeps_the_entry_for_a_retry() -> anyhow::Result<()> {
        let mut harness = Harness::new()?;
        let start = Instant::now();
        harness.source.push_jobs(vec![seeding("Show", 2_048)]);
        harness.source.push_jobs(vec![seeding("Show", 0)]);
        harness.monitor.poll_at(start).await;

        harness.channel.fail_on("delete_message");
        harness.monitor.poll_at(start + Duration::from_secs(20)).await;
        assert_eq!(harness.monitor.tracked_jobs(), 1);
        assert_eq!(harness.metrics.snapshot().reports_deleted, 0);

        harness.channel.recover("delete_message");
        harness.monitor.poll_at(start + Duration::from_secs(27)).await;
        assert_eq!(harness.metrics.snapshot().reports_deleted, 1);
        Ok(())
    }

    #[tokio::test]
    async fn completion_is_dispatched_once_per_job() -> anyhow::Result<()> {
        let mut harness = Harness::new()?;
        let start = Instant::now();
        harness.source.push_jobs(vec![seeding("Album", 0)]);

        for step in 0..3 {
            harness
                .monitor
                .poll_at(start + Duration::from_secs(step * 7))
                .await;
        }

        assert_eq!(harness.dispatcher.names(), vec!["Album".to_string()]);
        let requests = harness
            .dispatcher
            .requests
            .lock()
            .map_err(|_| anyhow::anyhow!("poisoned"))?
            .clone();
        assert_eq!(requests[0].source_path, PathBuf::from("/downloads/Album"));
        assert_eq!(harness.metrics.snapshot().completions_triggered, 1);
        Ok(())
    }

    #[tokio::test]
    async fn vanished_jobs_are_forgotten_and_can_complete_again() -> anyhow::Result<()> {
        let mut harness = Harness::new()?;
        let start = Instant::now();
        harness
            .source
            .push_jobs(vec![seeding("Album", 0), downloading("Movie", 0.3)]);
        harness.source.push_jobs(vec![downloading("Movie", 0.4)]);
        harness
            .source
            .push_jobs(vec![seeding("Album", 0), downloading("Movie", 0.5)]);

        harness.monitor.poll_at(start).await;
        assert_eq!(harness.monitor.tracked_jobs(), 2);
        harness.monitor.poll_at(start + Duration::from_secs(7)).await;
        assert_eq!(harness.monitor.tracked_jobs(), 1);
        harness.monitor.poll_at(start + Duration::from_secs(14)).await;

        assert_eq!(
            harness.dispatcher.names(),
            vec!["Album".to_string(), "Album".to_string()]
        );
        Ok(())
    }

    #[tokio::test]
    async fn source_failure_skips_the_pass_without_touching_state() -> anyhow::Result<()> {
        let mut harness = Harness::new()?;
        let start = Instant::now();
        harness.source.push_jobs(vec![downloading("Movie", 0.1)]);
        harness.source.push_failure();

        assert_eq!(harness.monitor.poll_at(start).await, PollOutcome::Completed);
        assert_eq!(
            harness.monitor.poll_at(start + Duration::from_secs(7)).await,
            PollOutcome::SourceUnavailable
        );

        assert_eq!(harness.channel.calls().len(), 1);
        assert_eq!(harness.monitor.tracked_jobs(), 1);
        let snapshot = harness.metrics.snapshot();
        assert_eq!(snapshot.polls_completed, 1);
        assert_eq!(snapshot.polls_skipped, 1);
        Ok(())
    }

    #[tokio::test]
    async fn failed_send_is_retried_on_the_next_pass() -> anyhow::Result<()> {
        let mut harness = Harness::new()?;
        let start = Instant::now();
        harness.source.push_jobs(vec![downloading("Movie", 0.1)]);

        harness.channel.fail_on("send_message");
        harness.monitor.poll_at(start).await;
        assert!(harness.channel.calls().is_empty());

        harness.channel.recover("send_message");
        harness.monitor.poll_at(start + Duration::from_secs(7)).await;
        assert_eq!(harness.channel.sent_texts().len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn metric_failures_degrade_to_placeholders() -> anyhow::Result<()> {
        let mut harness = Harness::with_probe(FixedHostProbe::failing())?;
        harness.source.fail_free_space(true);
        harness.source.push_jobs(vec![downloading("Movie", 0.1)]);

        harness.monitor.poll_at(Instant::now()).await;

        let texts = harness.channel.sent_texts();
        assert_eq!(texts.len(), 1);
        assert!(texts[0].contains("CPU: 0.0% | FREE: unavailable"));
        Ok(())
    }
}
