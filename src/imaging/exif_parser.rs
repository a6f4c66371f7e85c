//! Minimal EXIF reader for capture timestamps.
//!
//! Extracts two ASCII fields from a TIFF-structured EXIF block:
//! - DateTimeOriginal (Exif IFD tag 0x9003): when the shutter fired
//! - DateTime (IFD0 tag 0x0132): last modification by camera or editor
//!
//! The raw block comes from the `image` crate's decoders (JPEG APP1, PNG eXIf),
//! so this module only walks IFDs. Any structural problem yields empty dates.

use image::{ImageDecoder, ImageReader};
use std::path::Path;

/// Timestamp strings as stored, e.g. `"2024:06:01 18:42:05"`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExifDates {
    pub original: Option<String>,
    pub modified: Option<String>,
}

impl ExifDates {
    pub fn is_empty(&self) -> bool {
        self.original.is_none() && self.modified.is_none()
    }
}

const EXIF_HEADER: &[u8] = b"Exif\0\0";
const TAG_DATE_TIME: u16 = 0x0132;
const TAG_EXIF_IFD: u16 = 0x8769;
const TAG_DATE_TIME_ORIGINAL: u16 = 0x9003;
const TYPE_ASCII: u16 = 2;

/// Read the raw EXIF block embedded in an image, if the format carries one.
pub fn read_exif_block(path: &Path) -> Option<Vec<u8>> {
    let mut decoder = ImageReader::open(path)
        .ok()?
        .with_guessed_format()
        .ok()?
        .into_decoder()
        .ok()?;
    decoder.exif_metadata().ok().flatten()
}

/// Read capture timestamps from an image file.
/// Returns default (empty) dates when there is no EXIF or it can't be parsed.
pub fn read_exif_dates(path: &Path) -> ExifDates {
    match read_exif_block(path) {
        Some(block) => parse_exif(&block),
        None => ExifDates::default(),
    }
}

// ---------------------------------------------------------------------------
// TIFF structure
// ---------------------------------------------------------------------------

struct Tiff<'a> {
    data: &'a [u8],
    big_endian: bool,
}

impl<'a> Tiff<'a> {
    fn u16_at(&self, offset: usize) -> Option<u16> {
        let b = self.data.get(offset..offset + 2)?;
        Some(if self.big_endian {
            u16::from_be_bytes([b[0], b[1]])
        } else {
            u16::from_le_bytes([b[0], b[1]])
        })
    }

    fn u32_at(&self, offset: usize) -> Option<u32> {
        let b = self.data.get(offset..offset + 4)?;
        Some(if self.big_endian {
            u32::from_be_bytes([b[0], b[1], b[2], b[3]])
        } else {
            u32::from_le_bytes([b[0], b[1], b[2], b[3]])
        })
    }

    /// Iterate `(tag, type, count, entry_offset)` for each 12-byte IFD entry.
    fn entries(&self, ifd_offset: usize) -> Vec<(u16, u16, usize, usize)> {
        let Some(count) = self.u16_at(ifd_offset) else {
            return Vec::new();
        };
        let start = ifd_offset + 2;
        (0..count as usize)
            .map(|i| start + i * 12)
            .map_while(|entry| {
                Some((
                    self.u16_at(entry)?,
                    self.u16_at(entry + 2)?,
                    self.u32_at(entry + 4)? as usize,
                    entry,
                ))
            })
            .collect()
    }

    /// Read an ASCII value. Values of four bytes or fewer live inline.
    fn ascii(&self, typ: u16, count: usize, entry: usize) -> Option<String> {
        if typ != TYPE_ASCII || count == 0 {
            return None;
        }
        let value_start = if count <= 4 {
            entry + 8
        } else {
            self.u32_at(entry + 8)? as usize
        };
        let raw = self.data.get(value_start..value_start.checked_add(count)?)?;
        let text = String::from_utf8_lossy(raw);
        let text = text.trim_matches(char::from(0)).trim();
        (!text.is_empty()).then(|| text.to_string())
    }
}

/// Parse an EXIF block (with or without the `Exif\0\0` prefix).
pub fn parse_exif(block: &[u8]) -> ExifDates {
    let data = block.strip_prefix(EXIF_HEADER).unwrap_or(block);
    if data.len() < 8 {
        return ExifDates::default();
    }

    let big_endian = match &data[0..2] {
        b"MM" => true,
        b"II" => false,
        _ => return ExifDates::default(),
    };
    let tiff = Tiff { data, big_endian };

    if tiff.u16_at(2) != Some(42) {
        return ExifDates::default();
    }
    let Some(ifd0) = tiff.u32_at(4) else {
        return ExifDates::default();
    };

    let mut dates = ExifDates::default();
    let mut exif_ifd = None;

    for (tag, typ, count, entry) in tiff.entries(ifd0 as usize) {
        match tag {
            TAG_DATE_TIME => dates.modified = tiff.ascii(typ, count, entry),
            TAG_EXIF_IFD => exif_ifd = tiff.u32_at(entry + 8),
            _ => {}
        }
    }

    if let Some(offset) = exif_ifd {
        // Pointer back into IFD0 would loop; a zero offset means absent.
        if offset != 0 && offset != ifd0 {
            for (tag, typ, count, entry) in tiff.entries(offset as usize) {
                if tag == TAG_DATE_TIME_ORIGINAL {
                    dates.original = tiff.ascii(typ, count, entry);
                }
            }
        }
    }

    dates
}
