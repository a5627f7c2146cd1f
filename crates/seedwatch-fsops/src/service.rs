//! Completion pipeline orchestration.
//!
//! # Design
//! - Steps run strictly in order; the first failure aborts the remaining delivery steps.
//! - Every run owns a private directory below the scratch directory holding its workspace and
//!   parts, so runs for colliding names never touch each other's files.
//! - Cleanup removes that directory after every attempt, whatever the outcome, and never fails
//!   itself.
//! - Blocking filesystem work runs on the blocking pool so polls keep their cadence.

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;

use seedwatch_telemetry::Metrics;
use seedwatch_torrent_core::NotificationChannel;
use tempfile::TempDir;
use tracing::{debug, error, info, warn};

use crate::archive::{copy_regular_files, write_split_archive};
use crate::error::{FsOpsError, FsOpsResult};
use crate::model::{CompletionJob, CompletionRequest, checked_safe_name};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum StepKind {
    PrepareWorkspace,
    CopyPayload,
    ArchiveAndSplit,
    Upload,
    Confirm,
    Cleanup,
}

impl StepKind {
    const fn as_str(self) -> &'static str {
        match self {
            Self::PrepareWorkspace => "prepare_workspace",
            Self::CopyPayload => "copy_payload",
            Self::ArchiveAndSplit => "archive_and_split",
            Self::Upload => "upload",
            Self::Confirm => "confirm",
            Self::Cleanup => "cleanup",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum StepStatus {
    Started,
    Completed,
    Failed,
}

impl StepStatus {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Started => "started",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

/// Packages a finished job's output, delivers the parts and cleans up after itself.
#[derive(Clone)]
pub struct CompletionPipeline {
    channel: Arc<dyn NotificationChannel>,
    scratch_dir: PathBuf,
    part_size: u64,
    metrics: Metrics,
}

impl CompletionPipeline {
    /// Construct a pipeline uploading through `channel`, working below `scratch_dir`.
    #[must_use]
    pub fn new(
        channel: Arc<dyn NotificationChannel>,
        scratch_dir: impl Into<PathBuf>,
        part_size: u64,
        metrics: Metrics,
    ) -> Self {
        Self {
            channel,
            scratch_dir: scratch_dir.into(),
            part_size,
            metrics,
        }
    }

    /// Run the pipeline for `request`, logging instead of returning any failure.
    pub async fn process(&self, request: CompletionRequest) {
        let name = request.name.clone();
        match self.run(request).await {
            Ok(parts) => info!(job = %name, parts, "completion pipeline finished"),
            Err(err) => error!(job = %name, error = %err, "completion pipeline failed"),
        }
    }

    /// Run every step for `request` and return the number of delivered parts.
    ///
    /// The run directory and all parts are removed before this returns, on success and on
    /// failure.
    ///
    /// # Errors
    ///
    /// Returns [`FsOpsError::InvalidInput`] before touching the disk when the job name cannot be
    /// used as a directory name, otherwise the first step failure. Parts delivered before a
    /// failure are not retracted.
    pub async fn run(&self, request: CompletionRequest) -> FsOpsResult<usize> {
        let safe = checked_safe_name(&request.name)?;
        let run_dir = self
            .execute_step(&request.name, StepKind::PrepareWorkspace, self.prepare(&safe))
            .await?;
        let mut job = CompletionJob::plan(&request, &safe, run_dir.path());
        info!(
            job = %job.name,
            source = %job.source_path.display(),
            workspace = %job.workspace.display(),
            "completion pipeline started"
        );

        let outcome = self.deliver(&mut job).await;
        self.execute_step(&job.name, StepKind::Cleanup, async {
            cleanup(&job.name, run_dir).await;
            Ok(())
        })
        .await?;
        outcome
    }

    /// Create `<scratch>/<safe>.XXXXXX/` with the empty workspace `<safe>/` inside it.
    async fn prepare(&self, safe: &str) -> FsOpsResult<TempDir> {
        let scratch = self.scratch_dir.clone();
        let safe = safe.to_string();
        blocking("prepare_workspace", move || {
            std::fs::create_dir_all(&scratch)
                .map_err(|err| FsOpsError::io("prepare_workspace.create_scratch", &scratch, err))?;
            let run_dir = tempfile::Builder::new()
                .prefix(&format!("{safe}."))
                .tempdir_in(&scratch)
                .map_err(|err| FsOpsError::io("prepare_workspace.create_run_dir", &scratch, err))?;
            let workspace = run_dir.path().join(&safe);
            std::fs::create_dir(&workspace)
                .map_err(|err| FsOpsError::io("prepare_workspace.create_dir", &workspace, err))?;
            Ok(run_dir)
        })
        .await
    }

    async fn deliver(&self, job: &mut CompletionJob) -> FsOpsResult<usize> {
        let source = job.source_path.clone();
        let workspace = job.workspace.clone();
        let copied = self
            .execute_step(&job.name, StepKind::CopyPayload, async {
                blocking("copy_payload", move || {
                    copy_regular_files(&source, &workspace)
                })
                .await
            })
            .await?;
        debug!(job = %job.name, copied, "payload copied");

        let workspace = job.workspace.clone();
        let top_dir = job.safe_name.clone();
        let archive_base = job.archive_base.clone();
        let part_size = self.part_size;
        job.parts = self
            .execute_step(&job.name, StepKind::ArchiveAndSplit, async {
                blocking("archive_and_split", move || {
                    write_split_archive(&workspace, &top_dir, &archive_base, part_size)
                })
                .await
            })
            .await?;

        let delivered = self
            .execute_step(&job.name, StepKind::Upload, async {
                for (index, part) in job.parts.iter().enumerate() {
                    let caption = job.caption(index + 1);
                    debug!(job = %job.name, part = %part.display(), "uploading part");
                    self.channel.send_document(part, &caption).await?;
                }
                Ok::<_, FsOpsError>(job.parts.len())
            })
            .await?;

        let confirmation = job.confirmation();
        self.execute_step(&job.name, StepKind::Confirm, async {
            self.channel.send_message(&confirmation).await?;
            Ok::<_, FsOpsError>(())
        })
        .await?;

        Ok(delivered)
    }

    async fn execute_step<T, F>(&self, job: &str, step: StepKind, op: F) -> FsOpsResult<T>
    where
        F: Future<Output = FsOpsResult<T>>,
    {
        self.record_step(job, step, StepStatus::Started);
        match op.await {
            Ok(value) => {
                self.record_step(job, step, StepStatus::Completed);
                Ok(value)
            }
            Err(err) => {
                self.record_step(job, step, StepStatus::Failed);
                warn!(job = %job, step = step.as_str(), error = %err, "pipeline step failed");
                Err(err)
            }
        }
    }

    fn record_step(&self, job: &str, step: StepKind, status: StepStatus) {
        debug!(job = %job, step = step.as_str(), status = status.as_str(), "pipeline step");
        self.metrics.inc_pipeline_step(step.as_str(), status.as_str());
    }
}

/// Remove the run directory with the workspace and every part in it, logging failures.
async fn cleanup(job: &str, run_dir: TempDir) {
    let path = run_dir.path().to_path_buf();
    let removed = blocking("cleanup", move || {
        run_dir
            .close()
            .map_err(|err| FsOpsError::io("cleanup.remove_run_dir", path, err))
    })
    .await;
    if let Err(err) = removed {
        warn!(job = %job, error = %err, "failed to remove run directory");
    }
}

async fn blocking<T, F>(operation: &'static str, task: F) -> FsOpsResult<T>
where
    T: Send + 'static,
    F: FnOnce() -> FsOpsResult<T> + Send + 'static,
{
    tokio::task::spawn_blocking(task)
        .await
        .map_err(|source| FsOpsError::Join { operation, source })?
}
