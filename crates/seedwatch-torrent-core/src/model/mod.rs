//! Core job domain types shared across the workspace.

use std::fmt::{self, Display, Formatter};
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Bytes per binary gigabyte (2^30).
pub const GIB: f64 = 1_073_741_824.0;
/// Bytes per binary megabyte (2^20).
pub const MIB: f64 = 1_048_576.0;

/// Lifecycle state reported by the job source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum JobState {
    /// Actively downloading payload data.
    Downloading,
    /// Waiting in the download queue.
    Queued,
    /// Download stopped or paused before completion; holds the received label (`stoppedDL` or
    /// the older `pausedDL`).
    StalledPaused(String),
    /// Fully present locally and waiting for peers to upload to.
    StalledSeeding,
    /// Any other state; the wire label is preserved for display.
    Other(String),
}

impl JobState {
    /// Parse a qBittorrent state label.
    #[must_use]
    pub fn from_label(label: &str) -> Self {
        match label {
            "downloading" => Self::Downloading,
            "queuedDL" => Self::Queued,
            "stoppedDL" | "pausedDL" => Self::StalledPaused(label.to_string()),
            "stalledUP" => Self::StalledSeeding,
            other => Self::Other(other.to_string()),
        }
    }

    /// Literal label rendered in download reports.
    #[must_use]
    pub fn label(&self) -> &str {
        match self {
            Self::Downloading => "downloading",
            Self::Queued => "queuedDL",
            Self::StalledSeeding => "stalledUP",
            Self::StalledPaused(label) | Self::Other(label) => label,
        }
    }

    /// Whether the state is rendered with the download layout.
    #[must_use]
    pub const fn is_download_reportable(&self) -> bool {
        matches!(
            self,
            Self::Downloading | Self::Queued | Self::StalledPaused(_)
        )
    }
}

impl From<String> for JobState {
    fn from(value: String) -> Self {
        Self::from_label(&value)
    }
}

impl From<JobState> for String {
    fn from(state: JobState) -> Self {
        state.label().to_string()
    }
}

impl Display for JobState {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.label())
    }
}

/// Point-in-time read of one job, produced fresh on every poll.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobSnapshot {
    /// Display name; doubles as the tracking key.
    pub name: String,
    /// Lifecycle state.
    pub state: JobState,
    /// Completion fraction in `[0, 1]`.
    pub progress: f64,
    /// Bytes downloaded so far.
    pub downloaded: u64,
    /// Bytes uploaded so far.
    pub uploaded: u64,
    /// Total payload size in bytes.
    pub total_size: u64,
    /// Download speed in bytes per second.
    pub dlspeed: u64,
    /// Upload speed in bytes per second.
    pub upspeed: u64,
    /// Estimated seconds until completion, when the source knows it.
    pub eta_secs: Option<i64>,
    /// Seconds the job has been active.
    pub time_active_secs: u64,
    /// Comma separated tag list.
    pub tags: String,
    /// Share ratio.
    pub ratio: f64,
}

impl JobSnapshot {
    /// Whether the job finished downloading and sits idle in the seeding state.
    #[allow(clippy::float_cmp)]
    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.state == JobState::StalledSeeding && self.progress == 1.0
    }

    /// Whether the job is sitting in the seeding state without upload traffic.
    #[must_use]
    pub fn is_idle_seeding(&self) -> bool {
        self.upspeed == 0 && self.state == JobState::StalledSeeding
    }
}

/// Opaque identifier of a message held by the notification channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageHandle(pub i64);

impl Display for MessageHandle {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Host readings captured by a [`crate::HostProbe`].
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct HostSample {
    /// Aggregate CPU utilisation percentage.
    pub cpu_percent: f32,
    /// Used memory percentage.
    pub ram_percent: f32,
    /// Time since boot.
    pub uptime: Duration,
}

/// Host readings plus the free space reported by the job source.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct HostMetrics {
    /// CPU, memory and uptime readings.
    pub host: HostSample,
    /// Free space in bytes on the download volume; `None` when unavailable.
    pub free_space_bytes: Option<u64>,
}

impl HostMetrics {
    /// Combine a host sample with the free-space reading.
    #[must_use]
    pub const fn new(host: HostSample, free_space_bytes: Option<u64>) -> Self {
        Self {
            host,
            free_space_bytes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeding(progress: f64, upspeed: u64) -> JobSnapshot {
        JobSnapshot {
            name: "demo".into(),
            state: JobState::StalledSeeding,
            progress,
            downloaded: 10,
            uploaded: 0,
            total_size: 10,
            dlspeed: 0,
            upspeed,
            eta_secs: None,
            time_active_secs: 0,
            tags: String::new(),
            ratio: 0.0,
        }
    }

    #[test]
    fn state_labels_round_trip_known_values() {
        for label in [
            "downloading",
            "queuedDL",
            "stoppedDL",
            "pausedDL",
            "stalledUP",
            "uploading",
        ] {
            assert_eq!(JobState::from_label(label).label(), label);
        }
        assert!(matches!(
            JobState::from_label("pausedDL"),
            JobState::StalledPaused(label) if label == "pausedDL"
        ));
    }

    #[test]
    fn download_reportable_states() {
        assert!(JobState::Downloading.is_download_reportable());
        assert!(JobState::Queued.is_download_reportable());
        assert!(JobState::from_label("pausedDL").is_download_reportable());
        assert!(JobState::from_label("stoppedDL").is_download_reportable());
        assert!(!JobState::StalledSeeding.is_download_reportable());
        assert!(!JobState::Other("uploading".into()).is_download_reportable());
    }

    #[test]
    fn completion_requires_exact_progress_and_seeding_state() {
        assert!(seeding(1.0, 0).is_completed());
        assert!(!seeding(0.999, 0).is_completed());
        let mut downloading = seeding(1.0, 0);
        downloading.state = JobState::Downloading;
        assert!(!downloading.is_completed());
    }

    #[test]
    fn idle_seeding_requires_zero_upload() {
        assert!(seeding(1.0, 0).is_idle_seeding());
        assert!(!seeding(1.0, 12).is_idle_seeding());
    }

    #[test]
    fn state_deserializes_from_wire_label() -> anyhow::Result<()> {
        let state: JobState = serde_json::from_str("\"stalledUP\"")?;
        assert_eq!(state, JobState::StalledSeeding);
        assert_eq!(serde_json::to_string(&JobState::Queued)?, "\"queuedDL\"");
        Ok(())
    }
}
