#![forbid(unsafe_code)]
#![deny(
    unused_must_use,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls
)]
#![warn(
    missing_docs,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery
)]
#![allow(clippy::module_name_repetitions)]

//! Environment-backed configuration bundle consumed at start time.
//!
//! Layout: `model.rs` (typed settings), `loader.rs` (environment lookup), `validate.rs`
//! (parsing helpers), `defaults.rs` (fallback values), `error.rs` (error taxonomy).

mod defaults;
pub mod error;
pub mod loader;
pub mod model;
mod validate;

pub use defaults::{
    DEFAULT_IDLE_TIMEOUT_SECS, DEFAULT_PART_SIZE_BYTES, DEFAULT_POLL_INTERVAL_SECS,
    DEFAULT_TELEGRAM_API_URL,
};
pub use error::{ConfigError, ConfigResult};
pub use model::{
    AppConfig, LogFormatName, MonitorSettings, PipelineSettings, QbittorrentConfig, Secret,
    TelegramConfig,
};
