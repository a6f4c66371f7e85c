//! The transfer record handed from `prepare` to `publish`.
//!
//! # Format
//!
//! A single line, three pipe-delimited fields:
//!
//! ```text
//! images_to_upload/Trips/beach.jpg|Trips/beach_UPLOADED_AT_03-06-2024_18-42.jpg|Trips // Monday, June 03, 2024
//! └──────── original_path ───────┘ └─────────── public_relative_path ─────────┘ └──────── caption ────────────┘
//! ```
//!
//! Parsing splits at most twice, so the caption is free text and may itself
//! contain `|`. The first two fields may not. No field may contain a line
//! break. Anything that doesn't parse into three non-empty fields is fatal:
//! there is no recovery short of staging again.
//!
//! # Storage
//!
//! [`RecordStore`] holds at most one record. [`FileRecordStore`] writes to a
//! sibling temp file and renames it over the target, so a reader sees either
//! the previous record or the new one, never a torn write.
//! [`MemoryRecordStore`] backs tests.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use thiserror::Error;
use tracing::debug;

const DELIMITER: char = '|';

#[derive(Error, Debug)]
pub enum RecordError {
    #[error("No transfer record at {0} (run prepare first)")]
    Missing(PathBuf),
    #[error("Malformed transfer record: {0:?}")]
    Malformed(String),
    #[error("Transfer record field `{field}` cannot contain {reason}: {value:?}")]
    InvalidField {
        field: &'static str,
        reason: &'static str,
        value: String,
    },
    #[error("Transfer record I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Everything `publish` needs to know about the staged image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferRecord {
    pub original_path: PathBuf,
    pub public_relative_path: String,
    pub caption: String,
}

fn check_field(field: &'static str, value: &str, allow_delimiter: bool) -> Result<(), RecordError> {
    let reason = if value.contains(['\n', '\r']) {
        Some("a line break")
    } else if !allow_delimiter && value.contains(DELIMITER) {
        Some("'|'")
    } else {
        None
    };
    match reason {
        Some(reason) => Err(RecordError::InvalidField {
            field,
            reason,
            value: value.to_string(),
        }),
        None => Ok(()),
    }
}

impl TransferRecord {
    /// Encode as a single line (no trailing newline).
    pub fn to_line(&self) -> Result<String, RecordError> {
        let original = self.original_path.to_str().ok_or_else(|| RecordError::InvalidField {
            field: "original_path",
            reason: "non UTF-8 bytes",
            value: self.original_path.display().to_string(),
        })?;
        check_field("original_path", original, false)?;
        check_field("public_relative_path", &self.public_relative_path, false)?;
        check_field("caption", &self.caption, true)?;
        Ok(format!(
            "{original}{DELIMITER}{}{DELIMITER}{}",
            self.public_relative_path, self.caption
        ))
    }

    /// Decode a record. Surrounding whitespace (e.g. a trailing newline added
    /// by an editor) is ignored.
    pub fn parse(content: &str) -> Result<Self, RecordError> {
        let line = content.trim();
        let malformed = || RecordError::Malformed(content.to_string());
        if line.contains(['\n', '\r']) {
            return Err(malformed());
        }
        let mut parts = line.splitn(3, DELIMITER);
        let (Some(original), Some(relative), Some(caption)) =
            (parts.next(), parts.next(), parts.next())
        else {
            return Err(malformed());
        };
        if original.is_empty() || relative.is_empty() || caption.is_empty() {
            return Err(malformed());
        }
        Ok(Self {
            original_path: PathBuf::from(original),
            public_relative_path: relative.to_string(),
            caption: caption.to_string(),
        })
    }
}

/// Single-slot storage for the transfer record.
pub trait RecordStore {
    /// Replace any existing record.
    fn save(&self, record: &TransferRecord) -> Result<(), RecordError>;
    fn load(&self) -> Result<TransferRecord, RecordError>;
    /// Remove the record. Clearing an empty store is not an error.
    fn clear(&self) -> Result<(), RecordError>;
}

impl<R: RecordStore + ?Sized> RecordStore for &R {
    fn save(&self, record: &TransferRecord) -> Result<(), RecordError> {
        (**self).save(record)
    }
    fn load(&self) -> Result<TransferRecord, RecordError> {
        (**self).load()
    }
    fn clear(&self) -> Result<(), RecordError> {
        (**self).clear()
    }
}

/// Record kept in a text file.
#[derive(Debug, Clone)]
pub struct FileRecordStore {
    path: PathBuf,
}

impl FileRecordStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn io_error(&self, source: io::Error) -> RecordError {
        RecordError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl RecordStore for FileRecordStore {
    fn save(&self, record: &TransferRecord) -> Result<(), RecordError> {
        let line = record.to_line()?;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
        }
        let tmp = self.temp_path();
        fs::write(&tmp, format!("{line}\n")).map_err(|e| self.io_error(e))?;
        fs::rename(&tmp, &self.path).map_err(|e| self.io_error(e))?;
        debug!(path = %self.path.display(), "Transfer record written");
        Ok(())
    }

    fn load(&self) -> Result<TransferRecord, RecordError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(RecordError::Missing(self.path.clone()));
            }
            Err(e) => return Err(self.io_error(e)),
        };
        TransferRecord::parse(&content)
    }

    fn clear(&self) -> Result<(), RecordError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(self.io_error(e)),
        }
    }
}

/// In-memory store. Records still go through the line codec so invalid
/// fields fail the same way they would on disk.
#[derive(Debug, Default)]
pub struct MemoryRecordStore {
    line: Mutex<Option<String>>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw stored line, if any.
    pub fn raw(&self) -> Option<String> {
        self.slot().clone()
    }

    fn slot(&self) -> std::sync::MutexGuard<'_, Option<String>> {
        self.line.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl RecordStore for MemoryRecordStore {
    fn save(&self, record: &TransferRecord) -> Result<(), RecordError> {
        let line = record.to_line()?;
        *self.slot() = Some(line);
        Ok(())
    }

    fn load(&self) -> Result<TransferRecord, RecordError> {
        match self.slot().as_deref() {
            Some(line) => TransferRecord::parse(line),
            None => Err(RecordError::Missing(PathBuf::from("<memory>"))),
        }
    }

    fn clear(&self) -> Result<(), RecordError> {
        *self.slot() = None;
        Ok(())
    }
}
