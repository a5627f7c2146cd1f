//! Completion requests and the derived on-disk layout of a pipeline run.

use std::path::{Component, Path, PathBuf, is_separator};

use crate::error::{FsOpsError, FsOpsResult};

/// Inputs captured by the monitor when a job is detected as completed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionRequest {
    /// Job name as reported by the source.
    pub name: String,
    /// Directory holding the job's output files.
    pub source_path: PathBuf,
}

impl CompletionRequest {
    /// Build a request for `name`, whose output lives at `downloads_root/name`.
    #[must_use]
    pub fn new(name: impl Into<String>, downloads_root: &Path) -> Self {
        let name = name.into();
        let source_path = downloads_root.join(&name);
        Self { name, source_path }
    }
}

/// Paths owned by a single pipeline run, all below that run's private directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionJob {
    /// Job name used in captions and the confirmation.
    pub name: String,
    /// Directory the payload is read from.
    pub source_path: PathBuf,
    /// Top-level directory name inside the archive, also the workspace directory name.
    pub safe_name: String,
    /// Directory the payload is copied into (`<run_dir>/<safe>`).
    pub workspace: PathBuf,
    /// Archive path every part name is derived from (`<run_dir>/<safe>.tar.gz`).
    pub archive_base: PathBuf,
    /// Parts produced so far, in upload order.
    pub parts: Vec<PathBuf>,
}

impl CompletionJob {
    /// Derive the workspace and archive locations for `request` inside `run_dir`.
    ///
    /// `safe` is the already validated result of [`checked_safe_name`].
    #[must_use]
    pub fn plan(request: &CompletionRequest, safe: &str, run_dir: &Path) -> Self {
        Self {
            name: request.name.clone(),
            source_path: request.source_path.clone(),
            workspace: run_dir.join(safe),
            archive_base: run_dir.join(format!("{safe}.tar.gz")),
            safe_name: safe.to_string(),
            parts: Vec::new(),
        }
    }

    /// Caption attached to the 1-indexed part `number`.
    #[must_use]
    pub fn caption(&self, number: usize) -> String {
        format!("{} - Parte {number}", self.name)
    }

    /// Message sent once every part has been delivered.
    #[must_use]
    pub fn confirmation(&self) -> String {
        format!(
            "O torrent '{}' foi compactado e enviado com sucesso.",
            self.name
        )
    }
}

/// Filesystem-safe form of a job name: spaces become underscores, nothing else changes.
#[must_use]
pub fn safe_name(name: &str) -> String {
    name.replace(' ', "_")
}

/// [`safe_name`] of `name`, accepted only when it is exactly one ordinary path component.
///
/// Names that are empty, `.`, `..`, absolute or contain a separator would place the workspace
/// outside the scratch directory and are rejected.
///
/// # Errors
///
/// Returns [`FsOpsError::InvalidInput`] for names that cannot be used as a directory name.
pub fn checked_safe_name(name: &str) -> FsOpsResult<String> {
    let safe = safe_name(name);
    let mut components = Path::new(&safe).components();
    let single = matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    );
    if single && !safe.contains(is_separator) {
        Ok(safe)
    } else {
        Err(FsOpsError::InvalidInput {
            field: "name",
            reason: "not a single path component",
            value: Some(name.to_string()),
        })
    }
}

/// Path of the 1-indexed part `index` of `archive_base`, zero padded so lexical order is numeric.
#[must_use]
pub fn part_path(archive_base: &Path, index: usize) -> PathBuf {
    let mut name = archive_base.as_os_str().to_owned();
    name.push(format!(".part{index:04}"));
    PathBuf::from(name)
}
