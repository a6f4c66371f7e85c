//! Orientation bake-in.
//!
//! Cameras often store pixels in sensor order and record the intended rotation
//! in the EXIF Orientation tag. Some consumers ignore that tag, so before an
//! image goes public its pixels are rotated/flipped into display order and the
//! file is rewritten. The `image` encoders write no EXIF, so the rewritten file
//! carries no orientation tag.

use image::metadata::Orientation;
use image::{DynamicImage, ImageDecoder, ImageReader};
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum OrientationError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to decode {path}: {source}")]
    Decode {
        path: String,
        source: image::ImageError,
    },
    #[error("Failed to write {path}: {source}")]
    Encode {
        path: String,
        source: image::ImageError,
    },
}

/// Read the orientation an image declares. `NoTransforms` when absent.
pub fn read_orientation(path: &Path) -> Result<Orientation, OrientationError> {
    let mut decoder = open_decoder(path)?;
    decoder.orientation().map_err(|source| OrientationError::Decode {
        path: path.display().to_string(),
        source,
    })
}

fn open_decoder(path: &Path) -> Result<impl ImageDecoder, OrientationError> {
    let decode_err = |source| OrientationError::Decode {
        path: path.display().to_string(),
        source,
    };
    ImageReader::open(path)?
        .with_guessed_format()?
        .into_decoder()
        .map_err(decode_err)
}

/// Rotate the pixels of `path` into display order and rewrite it in place.
///
/// Returns `true` when the file was rewritten. An image that is already
/// upright is left byte-for-byte untouched, so a second call is a no-op.
pub fn normalize_orientation(path: &Path) -> Result<bool, OrientationError> {
    let mut decoder = open_decoder(path)?;
    let orientation = decoder
        .orientation()
        .map_err(|source| OrientationError::Decode {
            path: path.display().to_string(),
            source,
        })?;

    if orientation == Orientation::NoTransforms {
        return Ok(false);
    }

    let mut img = DynamicImage::from_decoder(decoder).map_err(|source| {
        OrientationError::Decode {
            path: path.display().to_string(),
            source,
        }
    })?;
    img.apply_orientation(orientation);

    // JPEG cannot hold alpha; keep whatever the decoder produced otherwise.
    let img = if is_jpeg(path) && img.color().has_alpha() {
        DynamicImage::ImageRgb8(img.to_rgb8())
    } else {
        img
    };

    img.save(path).map_err(|source| OrientationError::Encode {
        path: path.display().to_string(),
        source,
    })?;
    Ok(true)
}

fn is_jpeg(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("jpg") || e.eq_ignore_ascii_case("jpeg"))
}
