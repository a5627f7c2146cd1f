//! Test fixtures and filesystem helpers.

use std::fs;
use std::path::Path;

use seedwatch_torrent_core::{JobSnapshot, JobState};
use tempfile::TempDir;

/// Create a scratch directory that is removed when dropped.
///
/// # Errors
///
/// Returns an error if the directory cannot be created.
pub fn temp_dir() -> anyhow::Result<TempDir> {
    Ok(tempfile::Builder::new().prefix("seedwatch-").tempdir()?)
}

/// Write `(relative name, contents)` pairs below `root`, creating parent directories.
///
/// # Errors
///
/// Returns an error if a directory or file cannot be written.
pub fn write_files(root: &Path, files: &[(&str, &[u8])]) -> anyhow::Result<()> {
    for (name, contents) in files {
        let path = root.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, contents)?;
    }
    Ok(())
}

/// Deterministic, poorly compressible payload of `len` bytes.
#[must_use]
pub fn noise(len: usize, seed: u64) -> Vec<u8> {
    let mut state = seed | 1;
    (0..len)
        .map(|_| {
            // xorshift64
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            state.to_le_bytes()[0]
        })
        .collect()
}

/// Snapshot of a job that is actively downloading.
#[must_use]
pub fn downloading(name: &str, progress: f64) -> JobSnapshot {
    JobSnapshot {
        name: name.to_string(),
        state: JobState::Downloading,
        progress,
        downloaded: 0,
        uploaded: 0,
        total_size: 10 * 1024 * 1024 * 1024,
        dlspeed: 1024 * 1024,
        upspeed: 0,
        eta_secs: Some(120),
        time_active_secs: 300,
        tags: String::new(),
        ratio: 0.0,
    }
}

/// Snapshot of a fully downloaded job sitting in the seeding state.
#[must_use]
pub fn seeding(name: &str, upspeed: u64) -> JobSnapshot {
    JobSnapshot {
        name: name.to_string(),
        state: JobState::StalledSeeding,
        progress: 1.0,
        downloaded: 1024,
        uploaded: 512,
        total_size: 1024,
        dlspeed: 0,
        upspeed,
        eta_secs: None,
        time_active_secs: 600,
        tags: "tv".to_string(),
        ratio: 0.5,
    }
}
