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

//! Seedwatch application wiring.
//!
//! Layout: `bootstrap.rs` (service wiring and poll loop), `monitor.rs` (per-job reconciliation),
//! `report.rs` (status message layouts), `host.rs` (CPU/RAM/uptime probe), `error.rs`.

/// Application bootstrap and the poll loop.
pub mod bootstrap;
/// Application error types.
pub mod error;
/// Host metrics probe backed by the operating system.
pub mod host;
/// Activity monitor reconciling job snapshots with posted reports.
pub mod monitor;
/// Status report rendering.
pub mod report;

pub use bootstrap::run_app;
pub use error::{AppError, AppResult};
pub use host::SystemHostProbe;
pub use monitor::{ActivityMonitor, CompletionDispatcher, PipelineDispatcher};
