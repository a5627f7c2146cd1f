//! In-memory fakes for the collaborator traits.

use std::collections::{HashSet, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use seedwatch_torrent_core::{
    ChannelError, ChannelResult, HostProbe, HostSample, JobSnapshot, JobSource,
    MessageHandle, NotificationChannel, ProbeError, ProbeResult, SourceError, SourceResult,
};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Operation recorded by [`RecordingChannel`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelCall {
    /// `send_message` returned `handle`.
    Send {
        /// Handle issued for the message.
        handle: MessageHandle,
        /// Message text.
        text: String,
    },
    /// `edit_message` against `handle`.
    Edit {
        /// Edited handle.
        handle: MessageHandle,
        /// Replacement text.
        text: String,
    },
    /// `delete_message` against `handle`.
    Delete {
        /// Deleted handle.
        handle: MessageHandle,
    },
    /// `send_document` with the file contents read at call time.
    Document {
        /// Uploaded path.
        path: PathBuf,
        /// Attachment caption.
        caption: String,
        /// File contents.
        bytes: Vec<u8>,
    },
}

/// Notification channel that records every successful call and can be told to fail.
#[derive(Debug, Default)]
pub struct RecordingChannel {
    calls: Mutex<Vec<ChannelCall>>,
    failing: Mutex<HashSet<&'static str>>,
    next_handle: AtomicI64,
}

impl RecordingChannel {
    /// Create an empty recorder; handles start at 1.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every call to `operation` fail until [`RecordingChannel::recover`] is called.
    ///
    /// Operation names match the trait methods (`send_message`, `edit_message`,
    /// `delete_message`, `send_document`).
    pub fn fail_on(&self, operation: &'static str) {
        lock(&self.failing).insert(operation);
    }

    /// Stop failing `operation`.
    pub fn recover(&self, operation: &'static str) {
        lock(&self.failing).remove(operation);
    }

    /// Snapshot of the recorded calls.
    #[must_use]
    pub fn calls(&self) -> Vec<ChannelCall> {
        lock(&self.calls).clone()
    }

    /// Recorded document uploads as `(caption, bytes)`.
    #[must_use]
    pub fn documents(&self) -> Vec<(String, Vec<u8>)> {
        lock(&self.calls)
            .iter()
            .filter_map(|call| match call {
                ChannelCall::Document { caption, bytes, .. } => {
                    Some((caption.clone(), bytes.clone()))
                }
                _ => None,
            })
            .collect()
    }

    /// Texts of every sent message, in order.
    #[must_use]
    pub fn sent_texts(&self) -> Vec<String> {
        lock(&self.calls)
            .iter()
            .filter_map(|call| match call {
                ChannelCall::Send { text, .. } => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    fn check(&self, operation: &'static str) -> ChannelResult<()> {
        if lock(&self.failing).contains(operation) {
            return Err(ChannelError::Rejected {
                operation,
                code: Some(400),
                description: "injected failure".to_string(),
            });
        }
        Ok(())
    }

    fn record(&self, call: ChannelCall) {
        lock(&self.calls).push(call);
    }
}

#[async_trait]
impl NotificationChannel for RecordingChannel {
    async fn send_message(&self, text: &str) -> ChannelResult<MessageHandle> {
        self.check("send_message")?;
        let handle = MessageHandle(self.next_handle.fetch_add(1, Ordering::SeqCst) + 1);
        self.record(ChannelCall::Send {
            handle,
            text: text.to_string(),
        });
        Ok(handle)
    }

    async fn edit_message(&self, handle: MessageHandle, text: &str) -> ChannelResult<()> {
        self.check("edit_message")?;
        self.record(ChannelCall::Edit {
            handle,
            text: text.to_string(),
        });
        Ok(())
    }

    async fn delete_message(&self, handle: MessageHandle) -> ChannelResult<()> {
        self.check("delete_message")?;
        self.record(ChannelCall::Delete { handle });
        Ok(())
    }

    async fn send_document(&self, path: &Path, caption: &str) -> ChannelResult<()> {
        self.check("send_document")?;
        let bytes = std::fs::read(path).map_err(|source| ChannelError::Attachment {
            path: path.to_path_buf(),
            source,
        })?;
        self.record(ChannelCall::Document {
            path: path.to_path_buf(),
            caption: caption.to_string(),
            bytes,
        });
        Ok(())
    }
}

/// Job source that replays queued responses, then keeps returning the last job list.
#[derive(Debug, Default)]
pub struct ScriptedJobSource {
    script: Mutex<VecDeque<Option<Vec<JobSnapshot>>>>,
    current: Mutex<Vec<JobSnapshot>>,
    free_space: Mutex<Option<u64>>,
    free_space_fails: Mutex<bool>,
    list_calls: AtomicUsize,
}

impl ScriptedJobSource {
    /// Create a source with no jobs.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful response.
    pub fn push_jobs(&self, jobs: Vec<JobSnapshot>) {
        lock(&self.script).push_back(Some(jobs));
    }

    /// Queue a failed response.
    pub fn push_failure(&self) {
        lock(&self.script).push_back(None);
    }

    /// Set the free-space reading.
    pub fn set_free_space(&self, bytes: Option<u64>) {
        *lock(&self.free_space) = bytes;
    }

    /// Make the free-space query fail.
    pub fn fail_free_space(&self, fail: bool) {
        *lock(&self.free_space_fails) = fail;
    }

    /// Number of `list_jobs` calls so far.
    #[must_use]
    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl JobSource for ScriptedJobSource {
    async fn list_jobs(&self) -> SourceResult<Vec<JobSnapshot>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        match lock(&self.script).pop_front() {
            Some(Some(jobs)) => {
                lock(&self.current).clone_from(&jobs);
                Ok(jobs)
            }
            Some(None) => Err(SourceError::Status {
                operation: "list_jobs",
                status: 503,
            }),
            None => Ok(lock(&self.current).clone()),
        }
    }

    async fn free_disk_space(&self) -> SourceResult<Option<u64>> {
        if *lock(&self.free_space_fails) {
            return Err(SourceError::Status {
                operation: "free_disk_space",
                status: 503,
            });
        }
        Ok(*lock(&self.free_space))
    }
}

/// Host probe returning a fixed sample, or failing when built with [`FixedHostProbe::failing`].
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedHostProbe {
    sample: Option<HostSample>,
}

impl FixedHostProbe {
    /// Probe that always returns `sample`.
    #[must_use]
    pub const fn new(sample: HostSample) -> Self {
        Self {
            sample: Some(sample),
        }
    }

    /// Probe that always fails.
    #[must_use]
    pub const fn failing() -> Self {
        Self { sample: None }
    }
}

#[async_trait]
impl HostProbe for FixedHostProbe {
    async fn sample(&self) -> ProbeResult<HostSample> {
        self.sample.ok_or_else(|| ProbeError {
            operation: "sample",
            source: std::io::Error::other("probe disabled"),
        })
    }
}
