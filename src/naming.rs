//! Public names for staged images.
//!
//! A staged image is served from `{category}/{stem}_UPLOADED_AT_{stamp}{ext}`
//! under the public base URL, and archived under the same relative path:
//!
//! - `Trips/beach.jpg` → `Trips/beach_UPLOADED_AT_03-06-2024_18-42.jpg`
//! - `Road Trips/sea view.JPG` → `Road_Trips/sea_view_UPLOADED_AT_03-06-2024_18-42.JPG`
//!
//! The stamp is the staging wall-clock time (minute resolution), so posting
//! the same source file twice yields two distinct public names. Whitespace is
//! replaced with underscores; everything else is kept and percent-encoded only
//! when the full URL is built.

use chrono::NaiveDateTime;

/// Literal inserted between the original stem and the staging timestamp.
pub const UPLOAD_MARKER: &str = "_UPLOADED_AT_";

/// `day-month-year_hour-minute`
pub const STAMP_FORMAT: &str = "%d-%m-%Y_%H-%M";

/// Replace every whitespace character with an underscore.
pub fn url_safe(segment: &str) -> String {
    segment
        .chars()
        .map(|c| if c.is_whitespace() { '_' } else { c })
        .collect()
}

/// Split a file name into stem and extension (extension keeps its dot).
///
/// A leading dot does not start an extension: `.hidden` has no extension.
fn split_extension(file_name: &str) -> (&str, &str) {
    match file_name.rfind('.') {
        Some(pos) if pos > 0 => file_name.split_at(pos),
        _ => (file_name, ""),
    }
}

/// Build the collision-resistant public file name.
pub fn public_file_name(file_name: &str, staged_at: NaiveDateTime) -> String {
    let (stem, ext) = split_extension(file_name);
    let stamp = staged_at.format(STAMP_FORMAT);
    url_safe(&format!("{stem}{UPLOAD_MARKER}{stamp}{ext}"))
}

/// Build `{category}/{public file name}`.
pub fn public_relative_path(category: &str, file_name: &str, staged_at: NaiveDateTime) -> String {
    format!(
        "{}/{}",
        url_safe(category),
        public_file_name(file_name, staged_at)
    )
}

/// Split a public relative path into its category folder and file name.
///
/// Returns `None` unless both parts are non-empty.
pub fn split_relative_path(relative: &str) -> Option<(&str, &str)> {
    let (category, file_name) = relative.split_once('/')?;
    if category.is_empty() || file_name.is_empty() || file_name.contains('/') {
        return None;
    }
    Some((category, file_name))
}

/// Join the public base URL and a relative path, percent-encoding each segment.
pub fn public_url(base_url: &str, relative: &str) -> String {
    let encoded: Vec<String> = relative
        .split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect();
    format!("{}/{}", base_url.trim_end_matches('/'), encoded.join("/"))
}
