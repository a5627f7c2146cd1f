//! Collaborator traits implemented by the job source, notification and host adapters.

use std::path::Path;

use async_trait::async_trait;

use crate::error::{ChannelResult, ProbeResult, SourceResult};
use crate::model::{HostSample, JobSnapshot, MessageHandle};

/// Read-only view over the externally managed jobs.
#[async_trait]
pub trait JobSource: Send + Sync {
    /// List every job currently known to the source.
    async fn list_jobs(&self) -> SourceResult<Vec<JobSnapshot>>;

    /// Free space on the download volume in bytes; `None` when the source cannot tell.
    async fn free_disk_space(&self) -> SourceResult<Option<u64>>;
}

/// Text and attachment delivery to a single chat destination.
#[async_trait]
pub trait NotificationChannel: Send + Sync {
    /// Send a new text message and return its handle.
    async fn send_message(&self, text: &str) -> ChannelResult<MessageHandle>;

    /// Replace the text of an existing message.
    async fn edit_message(&self, handle: MessageHandle, text: &str) -> ChannelResult<()>;

    /// Delete an existing message.
    async fn delete_message(&self, handle: MessageHandle) -> ChannelResult<()>;

    /// Upload a file from disk with a caption.
    async fn send_document(&self, path: &Path, caption: &str) -> ChannelResult<()>;
}

/// Source of host CPU, memory and uptime readings.
#[async_trait]
pub trait HostProbe: Send + Sync {
    /// Take a fresh sample.
    async fn sample(&self) -> ProbeResult<HostSample>;
}
