//! Error types for the job source and notification channel adapters.

use std::error::Error;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Failures raised while querying the job source.
#[derive(Debug, Error)]
pub enum SourceError {
    /// The source rejected the configured credentials.
    #[error("job source authentication failed")]
    Authentication {
        /// Static reason for the rejection.
        reason: &'static str,
    },
    /// The request never produced a response.
    #[error("job source unreachable")]
    Transport {
        /// Operation identifier.
        operation: &'static str,
        /// Underlying transport failure.
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
    /// The source answered with an unexpected HTTP status.
    #[error("job source returned an error status")]
    Status {
        /// Operation identifier.
        operation: &'static str,
        /// HTTP status code.
        status: u16,
    },
    /// The response body could not be decoded.
    #[error("job source response could not be decoded")]
    Decode {
        /// Operation identifier.
        operation: &'static str,
        /// Underlying decoding failure.
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
}

/// Convenience alias for job source results.
pub type SourceResult<T> = Result<T, SourceError>;

/// Failures raised by the notification channel.
#[derive(Debug, Error)]
pub enum ChannelError {
    /// The request never produced a response.
    #[error("notification channel unreachable")]
    Transport {
        /// Operation identifier.
        operation: &'static str,
        /// Underlying transport failure.
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
    /// The channel answered but refused the operation.
    #[error("notification channel rejected the request")]
    Rejected {
        /// Operation identifier.
        operation: &'static str,
        /// Error code reported by the channel, when present.
        code: Option<i64>,
        /// Human readable description reported by the channel.
        description: String,
    },
    /// A local attachment could not be read.
    #[error("notification attachment unreadable")]
    Attachment {
        /// Path of the attachment.
        path: PathBuf,
        /// Underlying IO failure.
        #[source]
        source: io::Error,
    },
}

impl ChannelError {
    /// Operation the error is attributed to, for structured logging.
    #[must_use]
    pub const fn operation(&self) -> &'static str {
        match self {
            Self::Transport { operation, .. } | Self::Rejected { operation, .. } => operation,
            Self::Attachment { .. } => "send_document",
        }
    }
}

/// Convenience alias for notification channel results.
pub type ChannelResult<T> = Result<T, ChannelError>;

/// Failure raised while sampling host metrics.
#[derive(Debug, Error)]
#[error("host probe failed")]
pub struct ProbeError {
    /// Operation identifier.
    pub operation: &'static str,
    /// Underlying IO failure.
    #[source]
    pub source: io::Error,
}

/// Convenience alias for host probe results.
pub type ProbeResult<T> = Result<T, ProbeError>;
