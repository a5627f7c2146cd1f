//! Payload copy and the streaming archive writer.
//!
//! # Design
//! - The gzip stream is written straight into [`ChunkedWriter`], so no intermediate file ever
//!   holds the whole archive.
//! - Tar headers are deterministic and entries are appended in sorted order, which makes the
//!   produced bytes depend only on file names and contents.

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use flate2::Compression;
use flate2::write::GzEncoder;
use tar::{Builder, HeaderMode};
use walkdir::WalkDir;

use crate::error::{FsOpsError, FsOpsResult};
use crate::model::part_path;

/// Writer that spreads its input over numbered part files of at most `part_size` bytes.
///
/// A part is only created once there is a byte to put in it.
#[derive(Debug)]
pub struct ChunkedWriter {
    archive_base: PathBuf,
    part_size: u64,
    current: Option<BufWriter<File>>,
    written_in_part: u64,
    parts: Vec<PathBuf>,
}

impl ChunkedWriter {
    /// Start a writer whose parts are named `<archive_base>.partNNNN`.
    ///
    /// # Errors
    ///
    /// Returns an error when `part_size` is zero.
    pub fn new(archive_base: impl Into<PathBuf>, part_size: u64) -> FsOpsResult<Self> {
        if part_size == 0 {
            return Err(FsOpsError::InvalidInput {
                field: "part_size",
                reason: "zero",
                value: Some("0".to_string()),
            });
        }
        Ok(Self {
            archive_base: archive_base.into(),
            part_size,
            current: None,
            written_in_part: 0,
            parts: Vec::new(),
        })
    }

    /// Flush the open part and return every part path in order.
    ///
    /// # Errors
    ///
    /// Returns an error if the last part cannot be flushed.
    pub fn finish(mut self) -> io::Result<Vec<PathBuf>> {
        if let Some(mut part) = self.current.take() {
            part.flush()?;
        }
        Ok(self.parts)
    }

    fn roll_if_full(&mut self) -> io::Result<()> {
        if self.current.is_some() && self.written_in_part < self.part_size {
            return Ok(());
        }
        if let Some(mut full) = self.current.take() {
            full.flush()?;
        }
        let path = part_path(&self.archive_base, self.parts.len() + 1);
        let file = File::create(&path)?;
        self.parts.push(path);
        self.current = Some(BufWriter::new(file));
        self.written_in_part = 0;
        Ok(())
    }
}

impl Write for ChunkedWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        self.roll_if_full()?;
        let room = self.part_size - self.written_in_part;
        let take = usize::try_from(room).map_or(buf.len(), |room| room.min(buf.len()));
        let part = self
            .current
            .as_mut()
            .ok_or_else(|| io::Error::other("chunked writer has no open part"))?;
        part.write_all(&buf[..take])?;
        self.written_in_part += take as u64;
        Ok(take)
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.current.as_mut() {
            Some(part) => part.flush(),
            None => Ok(()),
        }
    }
}

/// Copy every regular file directly inside `source` into `workspace`; subdirectories are skipped.
///
/// Returns the number of files copied.
///
/// # Errors
///
/// Returns an error if `source` cannot be listed or a file cannot be copied.
pub fn copy_regular_files(source: &Path, workspace: &Path) -> FsOpsResult<usize> {
    let mut copied = 0;
    for entry in WalkDir::new(source)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|err| FsOpsError::walkdir("copy_payload.walk", source, err))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let destination = workspace.join(entry.file_name());
        fs::copy(entry.path(), &destination)
            .map_err(|err| FsOpsError::io("copy_payload.copy", entry.path(), err))?;
        copied += 1;
    }
    Ok(copied)
}

/// Archive the files of `workspace` under the top-level directory `top_dir` as a gzip
/// compressed tarball streamed into parts of at most `part_size` bytes.
///
/// Returns the produced part paths in order.
///
/// # Errors
///
/// Returns an error if the workspace cannot be read or a part cannot be written. Parts
/// written before the failure are left on disk for the caller to clean up.
pub fn write_split_archive(
    workspace: &Path,
    top_dir: &str,
    archive_base: &Path,
    part_size: u64,
) -> FsOpsResult<Vec<PathBuf>> {
    let writer = ChunkedWriter::new(archive_base, part_size)?;
    let encoder = GzEncoder::new(writer, Compression::default());
    let mut builder = Builder::new(encoder);
    builder.mode(HeaderMode::Deterministic);

    builder
        .append_dir(top_dir, workspace)
        .map_err(|err| FsOpsError::io("archive.append_dir", workspace, err))?;
    for entry in WalkDir::new(workspace)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|err| FsOpsError::walkdir("archive.walk", workspace, err))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let name = Path::new(top_dir).join(entry.file_name());
        builder
            .append_path_with_name(entry.path(), &name)
            .map_err(|err| FsOpsError::io("archive.append_file", entry.path(), err))?;
    }

    let encoder = builder
        .into_inner()
        .map_err(|err| FsOpsError::io("archive.finish_tar", archive_base, err))?;
    let writer = encoder
        .finish()
        .map_err(|err| FsOpsError::io("archive.finish_gzip", archive_base, err))?;
    writer
        .finish()
        .map_err(|err| FsOpsError::io("archive.flush_part", archive_base, err))
}
