//! Image file work, built on the `image` crate.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **EXIF block** | `ImageDecoder::exif_metadata` (JPEG APP1, PNG eXIf) |
//! | **Capture dates** | custom TIFF IFD walker |
//! | **Orientation** | `ImageDecoder::orientation` + `DynamicImage::apply_orientation` |
//!
//! The module is split into:
//! - **EXIF parser**: Pure byte-level date extraction (unit testable)
//! - **Orientation**: Decode, rotate and rewrite in place

pub mod exif_parser;
pub mod orientation;

pub use exif_parser::{ExifDates, read_exif_dates};
pub use orientation::{OrientationError, normalize_orientation, read_orientation};
