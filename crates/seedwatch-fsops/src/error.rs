//! # Design
//!
//! - Provide structured, constant-message errors for the completion pipeline.
//! - Capture operation context (paths, fields) so failures can be logged without formatting.
//! - Preserve source errors without interpolating context into error messages.

use std::io;
use std::path::PathBuf;

use seedwatch_torrent_core::ChannelError;
use thiserror::Error;

/// Result type for completion pipeline operations.
pub type FsOpsResult<T> = Result<T, FsOpsError>;

/// Errors produced while packaging and delivering a finished job.
#[derive(Debug, Error)]
pub enum FsOpsError {
    /// IO failures while interacting with the filesystem.
    #[error("fsops io failure")]
    Io {
        /// Operation that triggered the IO failure.
        operation: &'static str,
        /// Path involved in the IO failure.
        path: PathBuf,
        /// Underlying IO error.
        source: io::Error,
    },
    /// Walkdir traversal failures.
    #[error("fsops walkdir failure")]
    Walkdir {
        /// Operation that triggered the walkdir failure.
        operation: &'static str,
        /// Path involved in the walkdir failure.
        path: PathBuf,
        /// Underlying walkdir error.
        source: walkdir::Error,
    },
    /// The notification channel refused an upload or the confirmation.
    #[error("fsops delivery failure")]
    Channel {
        /// Underlying channel error.
        #[from]
        source: ChannelError,
    },
    /// Input validation failures.
    #[error("fsops invalid input")]
    InvalidInput {
        /// Field that failed validation.
        field: &'static str,
        /// Static reason for the failure.
        reason: &'static str,
        /// Offending value when available.
        value: Option<String>,
    },
    /// A blocking filesystem task panicked or was cancelled.
    #[error("fsops blocking task failed")]
    Join {
        /// Operation the task was running.
        operation: &'static str,
        /// Underlying join error.
        source: tokio::task::JoinError,
    },
}

impl FsOpsError {
    pub(crate) fn io(operation: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            operation,
            path: path.into(),
            source,
        }
    }

    pub(crate) fn walkdir(
        operation: &'static str,
        path: impl Into<PathBuf>,
        source: walkdir::Error,
    ) -> Self {
        Self::Walkdir {
            operation,
            path: path.into(),
            source,
        }
    }
}
