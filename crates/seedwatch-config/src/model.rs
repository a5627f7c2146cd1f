//! Typed configuration models.
//!
//! # Design
//! - Pure data carriers; parsing lives in `loader.rs` and `validate.rs`.
//! - Credentials are wrapped in [`Secret`] so `Debug` output is safe to log.

use std::fmt::{self, Debug, Formatter};
use std::path::PathBuf;
use std::time::Duration;

use url::Url;

/// String wrapper that redacts its value in `Debug` output.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    /// Wrap a secret value.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Borrow the raw secret for use on the wire.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl Debug for Secret {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str("Secret(***)")
    }
}

/// Telegram bot credentials and destinations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelegramConfig {
    /// Bot token issued by `BotFather`.
    pub bot_token: Secret,
    /// Chat receiving status reports.
    pub status_chat_id: String,
    /// Chat receiving archive parts and the completion confirmation.
    pub file_chat_id: String,
    /// Bot API base URL.
    pub api_url: Url,
}

/// qBittorrent Web UI location and credentials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QbittorrentConfig {
    /// Web UI base URL.
    pub host: Url,
    /// Web UI user.
    pub username: String,
    /// Web UI password.
    pub password: Secret,
}

/// Activity monitor knobs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorSettings {
    /// Delay between two poll passes.
    pub poll_interval: Duration,
    /// Grace period for idle seeding jobs.
    pub idle_timeout: Duration,
    /// Directory holding each job's output under its name.
    pub downloads_root: PathBuf,
    /// Whether polling waits for a `/start` chat command.
    pub require_start_command: bool,
}

/// Completion pipeline knobs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineSettings {
    /// Maximum size of each archive part in bytes.
    pub part_size_bytes: u64,
    /// Parent directory for temporary workspaces and parts.
    pub scratch_dir: PathBuf,
}

/// Log output format selected through the environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormatName {
    /// Structured JSON lines.
    Json,
    /// Human readable output.
    Pretty,
}

/// Complete configuration bundle handed to the application at start time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// Notification channel settings.
    pub telegram: TelegramConfig,
    /// Job source settings.
    pub qbittorrent: QbittorrentConfig,
    /// Monitor settings.
    pub monitor: MonitorSettings,
    /// Pipeline settings.
    pub pipeline: PipelineSettings,
    /// Explicit log format; `None` lets telemetry infer one from the build profile.
    pub log_format: Option<LogFormatName>,
    /// Fallback log level when `RUST_LOG` is unset.
    pub log_level: String,
    /// Request timeout shared by the HTTP adapters; `None` disables it.
    pub http_timeout: Option<Duration>,
}
