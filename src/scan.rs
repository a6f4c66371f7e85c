//! Candidate discovery under the content root.
//!
//! ## Directory Structure
//!
//! ```text
//! images_to_upload/            # Content root
//! ├── Trips/                   # Category (folder name becomes caption prefix)
//! │   ├── beach.jpg
//! │   └── 2023/
//! │       └── harbour.png      # Deeper files belong to their top-level category
//! ├── Street Life/
//! │   └── corner.JPEG          # Extensions match case-insensitively
//! └── stray.jpg                # No category: skipped
//! ```
//!
//! Images are `.png`, `.jpg` and `.jpeg` files anywhere below a category
//! folder. A file sitting directly in the root has no category to caption or
//! archive it under, so it is never a candidate. Neither is an image whose
//! category or file name contains a backslash, which could not be archived.

use std::path::{Component, Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Content root not found: {0}")]
    RootMissing(PathBuf),
    #[error("Failed to walk content root: {0}")]
    Walk(#[from] walkdir::Error),
}

pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg"];

/// An image eligible for staging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    /// Path as found under the content root (root-prefixed, not canonicalized).
    pub path: PathBuf,
    /// Top-level folder name below the root.
    pub category: String,
    /// Base file name.
    pub file_name: String,
}

pub fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| IMAGE_EXTENSIONS.iter().any(|ext| e.eq_ignore_ascii_case(ext)))
}

/// Top-level folder of `path` relative to `root`, if the file is inside one.
fn category_of(path: &Path, root: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let mut components = rel.components();
    let first = match components.next()? {
        Component::Normal(name) => name,
        _ => return None,
    };
    // A lone component is the file itself.
    components.next()?;
    first.to_str().map(String::from)
}

/// Recursively collect every image below a category folder, sorted by path.
pub fn find_candidates(root: &Path) -> Result<Vec<Candidate>, ScanError> {
    if !root.is_dir() {
        return Err(ScanError::RootMissing(root.to_path_buf()));
    }

    let mut candidates = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry?;
        let path = entry.path();
        if !entry.file_type().is_file() || !is_image(path) {
            continue;
        }
        if path.to_str().is_none() {
            warn!(path = %path.display(), "Skipping image with non UTF-8 path");
            continue;
        }
        let Some(category) = category_of(path, root) else {
            warn!(path = %path.display(), "Skipping image outside any category folder");
            continue;
        };
        let file_name = entry.file_name().to_string_lossy().into_owned();
        // Archive paths are split on `/` and `\`, so neither may sit inside a name.
        if category.contains('\\') || file_name.contains('\\') {
            warn!(path = %path.display(), "Skipping image with a backslash in its name");
            continue;
        }
        candidates.push(Candidate {
            path: path.to_path_buf(),
            category,
            file_name,
        });
    }

    debug!(count = candidates.len(), root = %root.display(), "Scanned content root");
    Ok(candidates)
}
