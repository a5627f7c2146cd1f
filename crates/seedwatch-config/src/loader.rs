//! Environment lookup for the configuration bundle.
//!
//! # Design
//! - `load_with` is pure over a lookup closure so tests never mutate the process environment.
//! - Variable names match the ones the deployment already exports.

use std::path::PathBuf;
use std::time::Duration;

use tracing::debug;

use crate::defaults::{
    DEFAULT_IDLE_TIMEOUT_SECS, DEFAULT_LOG_LEVEL, DEFAULT_PART_SIZE_BYTES,
    DEFAULT_POLL_INTERVAL_SECS, DEFAULT_TELEGRAM_API_URL,
};
use crate::error::ConfigResult;
use crate::model::{
    AppConfig, MonitorSettings, PipelineSettings, QbittorrentConfig, Secret, TelegramConfig,
};
use crate::validate::{
    optional, parse_base_url, parse_flag, parse_log_format, parse_positive_u64, parse_secs,
    parse_u64, required,
};

/// Bot token variable.
pub const ENV_BOT_TOKEN: &str = "TELEGRAM_BOT_TOKEN";
/// Status chat variable.
pub const ENV_CHAT_ID: &str = "TELEGRAM_CHAT_ID";
/// File chat variable.
pub const ENV_FILE_CHAT_ID: &str = "TELEGRAM_FILE_CHAT_ID";
/// Bot API base URL variable.
pub const ENV_TELEGRAM_API_URL: &str = "TELEGRAM_API_URL";
/// Downloads root variable.
pub const ENV_DOWNLOADS_PATH: &str = "DOWNLOADS_PATH";
/// qBittorrent host variable.
pub const ENV_QB_HOST: &str = "QB_HOST";
/// qBittorrent user variable.
pub const ENV_QB_USERNAME: &str = "QB_USERNAME";
/// qBittorrent password variable.
pub const ENV_QB_PASSWORD: &str = "QB_PASSWORD";
/// Poll interval variable.
pub const ENV_POLL_INTERVAL: &str = "SEEDWATCH_POLL_INTERVAL_SECS";
/// Idle timeout variable.
pub const ENV_IDLE_TIMEOUT: &str = "SEEDWATCH_IDLE_TIMEOUT_SECS";
/// Part size variable.
pub const ENV_PART_SIZE: &str = "SEEDWATCH_PART_SIZE_BYTES";
/// Scratch directory variable.
pub const ENV_SCRATCH_DIR: &str = "SEEDWATCH_SCRATCH_DIR";
/// `/start` gate variable.
pub const ENV_REQUIRE_START: &str = "SEEDWATCH_REQUIRE_START";
/// HTTP timeout variable.
pub const ENV_HTTP_TIMEOUT: &str = "SEEDWATCH_HTTP_TIMEOUT_SECS";
/// Log format variable.
pub const ENV_LOG_FORMAT: &str = "SEEDWATCH_LOG_FORMAT";
/// Log level variable.
pub const ENV_LOG_LEVEL: &str = "SEEDWATCH_LOG_LEVEL";

impl AppConfig {
    /// Load the configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns an error when a required variable is missing or any value fails validation.
    pub fn from_env() -> ConfigResult<Self> {
        Self::load_with(|name| std::env::var(name).ok())
    }

    /// Load the configuration through an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns an error when a required variable is missing or any value fails validation.
    pub fn load_with<F>(lookup: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &'static str| optional(lookup(name));

        let status_chat_id = required(ENV_CHAT_ID, lookup(ENV_CHAT_ID))?;
        let file_chat_id = var(ENV_FILE_CHAT_ID).unwrap_or_else(|| status_chat_id.clone());
        let api_url = parse_base_url(
            ENV_TELEGRAM_API_URL,
            var(ENV_TELEGRAM_API_URL)
                .as_deref()
                .unwrap_or(DEFAULT_TELEGRAM_API_URL),
        )?;
        let telegram = TelegramConfig {
            bot_token: Secret::new(required(ENV_BOT_TOKEN, lookup(ENV_BOT_TOKEN))?),
            status_chat_id,
            file_chat_id,
            api_url,
        };

        let host = required(ENV_QB_HOST, lookup(ENV_QB_HOST))?;
        let qbittorrent = QbittorrentConfig {
            host: parse_base_url(ENV_QB_HOST, &host)?,
            username: required(ENV_QB_USERNAME, lookup(ENV_QB_USERNAME))?,
            password: Secret::new(required(ENV_QB_PASSWORD, lookup(ENV_QB_PASSWORD))?),
        };

        let poll_interval = var(ENV_POLL_INTERVAL).map_or(
            Ok(Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS)),
            |raw| parse_positive_u64(ENV_POLL_INTERVAL, &raw).map(Duration::from_secs),
        )?;
        let idle_timeout = var(ENV_IDLE_TIMEOUT).map_or(
            Ok(Duration::from_secs(DEFAULT_IDLE_TIMEOUT_SECS)),
            |raw| parse_secs(ENV_IDLE_TIMEOUT, &raw),
        )?;
        let require_start_command = var(ENV_REQUIRE_START)
            .map_or(Ok(true), |raw| parse_flag(ENV_REQUIRE_START, &raw))?;
        let monitor = MonitorSettings {
            poll_interval,
            idle_timeout,
            downloads_root: PathBuf::from(required(
                ENV_DOWNLOADS_PATH,
                lookup(ENV_DOWNLOADS_PATH),
            )?),
            require_start_command,
        };

        let pipeline = PipelineSettings {
            part_size_bytes: var(ENV_PART_SIZE).map_or(Ok(DEFAULT_PART_SIZE_BYTES), |raw| {
                parse_positive_u64(ENV_PART_SIZE, &raw)
            })?,
            scratch_dir: var(ENV_SCRATCH_DIR).map_or_else(std::env::temp_dir, PathBuf::from),
        };

        let log_format = var(ENV_LOG_FORMAT)
            .map(|raw| parse_log_format(ENV_LOG_FORMAT, &raw))
            .transpose()?;
        let http_timeout = match var(ENV_HTTP_TIMEOUT) {
            Some(raw) => match parse_u64(ENV_HTTP_TIMEOUT, &raw)? {
                0 => None,
                secs => Some(Duration::from_secs(secs)),
            },
            None => None,
        };

        let config = Self {
            telegram,
            qbittorrent,
            monitor,
            pipeline,
            log_format,
            log_level: var(ENV_LOG_LEVEL).unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string()),
            http_timeout,
        };
        debug!(config = ?config, "configuration loaded");
        Ok(config)
    }
}
