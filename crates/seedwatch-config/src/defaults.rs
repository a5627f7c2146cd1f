//! Fallback values applied when optional variables are unset.

/// Seconds between two monitor passes.
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 7;
/// Seconds a seeding job may stay without upload traffic before its report is removed.
pub const DEFAULT_IDLE_TIMEOUT_SECS: u64 = 15;
/// Size of each archive part (2 GiB).
pub const DEFAULT_PART_SIZE_BYTES: u64 = 2 * 1024 * 1024 * 1024;
/// Public Telegram Bot API endpoint.
pub const DEFAULT_TELEGRAM_API_URL: &str = "https://api.telegram.org";
/// Log level used when `RUST_LOG` is absent.
pub(crate) const DEFAULT_LOG_LEVEL: &str = "info";
