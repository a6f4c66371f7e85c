//! Capture time and caption for a staged image.
//!
//! ## Capture time resolution
//!
//! The first usable value wins:
//!
//! - **EXIF DateTimeOriginal**: when the shutter fired
//! - **EXIF DateTime**: last modification recorded by the camera or editor
//! - **File creation time**: where the platform records one
//! - **File modification time**
//! - **Now**: only if the file can't even be stat'ed
//!
//! EXIF values use the `YYYY:MM:DD HH:MM:SS` layout and carry no time zone;
//! file times are converted to local time so both sources compare as wall
//! clock. Resolution never fails: a broken tag simply falls through.
//!
//! ## Caption
//!
//! `"{category} // {Weekday}, {Month} {DD}, {YYYY}"`, e.g.
//! `"Trips // Monday, June 03, 2024"`.

use crate::imaging::exif_parser::{ExifDates, read_exif_dates};
use chrono::{DateTime, Local, NaiveDateTime};
use std::path::Path;
use std::time::SystemTime;
use tracing::{debug, warn};

const EXIF_DATE_FORMAT: &str = "%Y:%m:%d %H:%M:%S";
const CAPTION_DATE_FORMAT: &str = "%A, %B %d, %Y";

/// Where a capture time came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeSource {
    ExifOriginal,
    ExifModified,
    FileCreated,
    FileModified,
    Now,
}

fn parse_exif_time(value: Option<&str>) -> Option<NaiveDateTime> {
    let value = value?;
    match NaiveDateTime::parse_from_str(value.trim(), EXIF_DATE_FORMAT) {
        Ok(t) => Some(t),
        Err(_) => {
            warn!(value, "Unparsable EXIF timestamp, ignoring");
            None
        }
    }
}

fn local(time: SystemTime) -> NaiveDateTime {
    DateTime::<Local>::from(time).naive_local()
}

/// Pick the best timestamp from EXIF dates, falling back to the file itself.
pub fn resolve_capture_time(dates: &ExifDates, path: &Path) -> (NaiveDateTime, TimeSource) {
    if let Some(t) = parse_exif_time(dates.original.as_deref()) {
        return (t, TimeSource::ExifOriginal);
    }
    if let Some(t) = parse_exif_time(dates.modified.as_deref()) {
        return (t, TimeSource::ExifModified);
    }
    if dates.is_empty() {
        debug!(path = %path.display(), "No EXIF date field, using file time");
    }

    match std::fs::metadata(path) {
        Ok(meta) => {
            if let Ok(created) = meta.created() {
                return (local(created), TimeSource::FileCreated);
            }
            if let Ok(modified) = meta.modified() {
                return (local(modified), TimeSource::FileModified);
            }
            (Local::now().naive_local(), TimeSource::Now)
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Cannot stat file, using current time");
            (Local::now().naive_local(), TimeSource::Now)
        }
    }
}

/// When the image was taken, as best we can tell. Never fails.
pub fn capture_time(path: &Path) -> NaiveDateTime {
    resolve_capture_time(&read_exif_dates(path), path).0
}

/// Format the caption for a category and capture time.
pub fn caption(category: &str, taken: NaiveDateTime) -> String {
    format!("{category} // {}", taken.format(CAPTION_DATE_FORMAT))
}
