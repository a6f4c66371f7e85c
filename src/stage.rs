//! Selection & staging: the `prepare` phase.
//!
//! Picks one image at random from the content root and readies it for
//! publishing:
//!
//! 1. Enumerate candidates ([`scan::find_candidates`](crate::scan::find_candidates))
//! 2. Choose one uniformly at random
//! 3. Resolve its capture time and build the caption
//! 4. Bake the EXIF orientation into the pixels (rewrites the file in place)
//! 5. Build the public relative path, stamped with the staging time
//! 6. Persist the [`TransferRecord`], replacing any previous one
//!
//! The capture time is read before step 4 because re-encoding drops the
//! EXIF block.

use crate::imaging::orientation::{OrientationError, normalize_orientation};
use crate::metadata::{caption, capture_time};
use crate::naming::public_relative_path;
use crate::record::{RecordError, RecordStore, TransferRecord};
use crate::scan::{ScanError, find_candidates};
use chrono::NaiveDateTime;
use rand::Rng;
use rand::seq::SliceRandom;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum StageError {
    #[error("No images found under {0}")]
    NoCandidates(PathBuf),
    #[error(transparent)]
    Scan(#[from] ScanError),
    #[error(transparent)]
    Orientation(#[from] OrientationError),
    #[error(transparent)]
    Record(#[from] RecordError),
}

/// Stage one image from `content_root` and save its transfer record.
///
/// `now` is the staging wall-clock time used for the public file name.
pub fn stage<S, R>(
    content_root: &Path,
    store: &S,
    rng: &mut R,
    now: NaiveDateTime,
) -> Result<TransferRecord, StageError>
where
    S: RecordStore + ?Sized,
    R: Rng + ?Sized,
{
    let candidates = match find_candidates(content_root) {
        Err(ScanError::RootMissing(root)) => return Err(StageError::NoCandidates(root)),
        other => other?,
    };
    let chosen = candidates
        .choose(rng)
        .ok_or_else(|| StageError::NoCandidates(content_root.to_path_buf()))?;
    info!(
        path = %chosen.path.display(),
        category = %chosen.category,
        pool = candidates.len(),
        "Selected image"
    );

    let taken = capture_time(&chosen.path);
    let caption = caption(&chosen.category, taken);

    if normalize_orientation(&chosen.path)? {
        info!(path = %chosen.path.display(), "Baked EXIF orientation into pixels");
    }

    let record = TransferRecord {
        original_path: chosen.path.clone(),
        public_relative_path: public_relative_path(&chosen.category, &chosen.file_name, now),
        caption,
    };
    store.save(&record)?;
    info!(relative = %record.public_relative_path, "Transfer record saved");
    Ok(record)
}
