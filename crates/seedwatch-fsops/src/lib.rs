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

//! Completion pipeline for finished jobs.
//! Layout: model/ (requests, job paths, captions), archive.rs (payload copy, chunked tar.gz
//! writer), service.rs (step orchestration, per-run directories and cleanup), error.rs (error taxonomy).

pub mod archive;
pub mod error;
pub mod model;
pub mod service;

pub use archive::{ChunkedWriter, copy_regular_files, write_split_archive};
pub use error::{FsOpsError, FsOpsResult};
pub use model::{CompletionJob, CompletionRequest, checked_safe_name, safe_name};
pub use service::CompletionPipeline;
