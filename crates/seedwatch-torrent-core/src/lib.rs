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

//! Engine-agnostic job snapshots and the collaborator traits the monitor drives.
//!
//! Layout: `model/` (snapshots, states, host metrics), `service/` (source, channel and probe
//! traits), `error.rs` (adapter error taxonomy).

pub mod error;
pub mod model;
pub mod service;

pub use error::{
    ChannelError, ChannelResult, ProbeError, ProbeResult, SourceError, SourceResult,
};
pub use model::{GIB, HostMetrics, HostSample, JobSnapshot, JobState, MIB, MessageHandle};
pub use service::{HostProbe, JobSource, NotificationChannel};
