//! # Design
//!
//! - Centralize application-level errors for bootstrap.
//! - Keep error messages constant while carrying context fields for debugging.
//! - Preserve source errors without re-logging at call sites.

use thiserror::Error;

/// Result alias for application operations.
pub type AppResult<T> = Result<T, AppError>;

/// Application-level error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Configuration could not be loaded.
    #[error("configuration operation failed")]
    Config {
        /// Operation identifier.
        operation: &'static str,
        /// Source configuration error.
        source: seedwatch_config::ConfigError,
    },
    /// Telemetry operations failed.
    #[error("telemetry operation failed")]
    Telemetry {
        /// Operation identifier.
        operation: &'static str,
        /// Source telemetry error.
        source: seedwatch_telemetry::TelemetryError,
    },
    /// The job source could not be reached or refused the login.
    #[error("job source operation failed")]
    Source {
        /// Operation identifier.
        operation: &'static str,
        /// Source adapter error.
        source: seedwatch_torrent_core::SourceError,
    },
    /// The notification channel failed during startup.
    #[error("notification channel operation failed")]
    Channel {
        /// Operation identifier.
        operation: &'static str,
        /// Source channel error.
        source: seedwatch_torrent_core::ChannelError,
    },
    /// Waiting for the shutdown signal failed.
    #[error("shutdown signal failed")]
    Signal {
        /// Source IO error.
        source: std::io::Error,
    },
}

impl AppError {
    pub(crate) const fn config(
        operation: &'static str,
        source: seedwatch_config::ConfigError,
    ) -> Self {
        Self::Config { operation, source }
    }

    pub(crate) const fn telemetry(
        operation: &'static str,
        source: seedwatch_telemetry::TelemetryError,
    ) -> Self {
        Self::Telemetry { operation, source }
    }

    pub(crate) const fn job_source(
        operation: &'static str,
        source: seedwatch_torrent_core::SourceError,
    ) -> Self {
        Self::Source { operation, source }
    }

    pub(crate) const fn channel(
        operation: &'static str,
        source: seedwatch_torrent_core::ChannelError,
    ) -> Self {
        Self::Channel { operation, source }
    }
}
