//! Archiver: move a published source file into the archive tree.
//!
//! ```text
//! images_to_upload/Trips/beach.jpg
//!         │  public_relative_path = Trips/beach_UPLOADED_AT_03-06-2024_18-42.jpg
//!         ▼
//! uploaded_images/Trips/beach_UPLOADED_AT_03-06-2024_18-42.jpg
//! ```
//!
//! The archive mirrors the content root's categories and is populated lazily.
//! A rename is tried first; across filesystems it falls back to copy then
//! delete. Only ever called after a confirmed publish.

use crate::naming::split_relative_path;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error("Cannot archive under {0:?}: expected `category/file`")]
    InvalidPath(String),
    #[error("Source file to archive is missing: {0}")]
    SourceMissing(PathBuf),
    #[error("Failed to archive {from} to {to}: {source}")]
    Io {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// A source file at its final archive location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchivedFile {
    pub path: PathBuf,
}

#[derive(Debug, Clone)]
pub struct Archiver {
    root: PathBuf,
}

impl Archiver {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Where `public_relative_path` lands in the archive.
    pub fn destination(&self, public_relative_path: &str) -> Result<PathBuf, ArchiveError> {
        let (category, file_name) = split_relative_path(public_relative_path)
            .filter(|(c, f)| !is_special(c) && !is_special(f))
            .ok_or_else(|| ArchiveError::InvalidPath(public_relative_path.to_string()))?;
        Ok(self.root.join(category).join(file_name))
    }

    pub fn archive(
        &self,
        original: &Path,
        public_relative_path: &str,
    ) -> Result<ArchivedFile, ArchiveError> {
        let dest = self.destination(public_relative_path)?;
        if !original.is_file() {
            return Err(ArchiveError::SourceMissing(original.to_path_buf()));
        }
        let io_err = |source| ArchiveError::Io {
            from: original.to_path_buf(),
            to: dest.clone(),
            source,
        };

        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        move_file(original, &dest).map_err(io_err)?;

        info!(from = %original.display(), to = %dest.display(), "Archived source file");
        Ok(ArchivedFile { path: dest })
    }
}

fn is_special(segment: &str) -> bool {
    segment == "." || segment == ".." || segment.contains('\\')
}

fn move_file(from: &Path, to: &Path) -> io::Result<()> {
    match fs::rename(from, to) {
        Ok(()) => Ok(()),
        Err(e) => {
            debug!(error = %e, "Rename failed, falling back to copy and delete");
            fs::copy(from, to)?;
            fs::remove_file(from)
        }
    }
}
