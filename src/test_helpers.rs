//! Shared test utilities for the photo-relay test suite.
//!
//! Provides synthetic image writers and hand-written fakes for the three
//! seams the pipeline blocks on: the media API, the public URL probe, and
//! the sleeper. Fakes record every call so tests can assert on ordering and
//! counts without any network access or real delays.

use crate::api::{ApiError, ApiResponse, MediaApi};
use crate::gate::{Probe, ProbeError};
use crate::wait::Sleeper;
use image::{ImageEncoder, RgbImage};
use serde_json::{Value, json};
use std::collections::VecDeque;
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

// =========================================================================
// Synthetic images
// =========================================================================

fn encode_jpeg(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x * 7 % 256) as u8, (y * 13 % 256) as u8, 128])
    });
    let mut out = Vec::new();
    image::codecs::jpeg::JpegEncoder::new(&mut out)
        .write_image(img.as_raw(), width, height, image::ExtendedColorType::Rgb8)
        .unwrap();
    out
}

fn write_with_parents(path: &Path, bytes: &[u8]) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, bytes).unwrap();
}

/// Write a small valid JPEG with no metadata.
pub fn write_test_jpeg(path: &Path, width: u32, height: u32) {
    write_with_parents(path, &encode_jpeg(width, height));
}

/// Splice an APP1 EXIF segment right after the JPEG SOI marker.
pub fn splice_exif(jpeg: &[u8], tiff: &[u8]) -> Vec<u8> {
    assert_eq!(&jpeg[..2], &[0xFF, 0xD8], "not a JPEG");
    let mut payload = b"Exif\0\0".to_vec();
    payload.extend_from_slice(tiff);
    let seg_len = (payload.len() + 2) as u16;

    let mut out = Vec::with_capacity(jpeg.len() + payload.len() + 4);
    out.extend_from_slice(&jpeg[..2]);
    out.extend_from_slice(&[0xFF, 0xE1]);
    out.extend_from_slice(&seg_len.to_be_bytes());
    out.extend_from_slice(&payload);
    out.extend_from_slice(&jpeg[2..]);
    out
}

/// Write a JPEG whose EXIF Orientation tag says "rotate 90° clockwise" (6).
pub fn write_rotated_jpeg(path: &Path, width: u32, height: u32) {
    let mut tiff = Vec::new();
    tiff.extend_from_slice(b"MM");
    tiff.extend_from_slice(&42u16.to_be_bytes());
    tiff.extend_from_slice(&8u32.to_be_bytes());
    tiff.extend_from_slice(&1u16.to_be_bytes());
    tiff.extend_from_slice(&0x0112u16.to_be_bytes()); // Orientation
    tiff.extend_from_slice(&3u16.to_be_bytes()); // SHORT
    tiff.extend_from_slice(&1u32.to_be_bytes());
    tiff.extend_from_slice(&6u16.to_be_bytes());
    tiff.extend_from_slice(&[0, 0]);
    tiff.extend_from_slice(&0u32.to_be_bytes());

    write_with_parents(path, &splice_exif(&encode_jpeg(width, height), &tiff));
}

/// Write a JPEG carrying EXIF capture dates.
pub fn write_dated_jpeg(path: &Path, modified: Option<&str>, original: Option<&str>) {
    let tiff = crate::imaging::exif_parser::tests::tiff_with_dates(modified, original);
    write_with_parents(path, &splice_exif(&encode_jpeg(16, 16), &tiff));
}

// =========================================================================
// Media API fake
// =========================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum ApiCall {
    Create { image_url: String, caption: String },
    Status(String),
    Publish(String),
}

/// Which call a [`ScriptedApi`] answers with a transport error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailOn {
    Create,
    Status,
    Publish,
}

/// Media API that replays canned responses and records every call.
///
/// Status responses are consumed in order; once exhausted every further
/// poll reports `IN_PROGRESS`.
pub struct ScriptedApi {
    create: Value,
    statuses: Mutex<VecDeque<Value>>,
    publish: Value,
    fail_on: Option<FailOn>,
    calls: Mutex<Vec<ApiCall>>,
}

impl ScriptedApi {
    pub fn new(create: Value, statuses: Vec<Value>, publish: Value) -> Self {
        Self {
            create,
            statuses: Mutex::new(statuses.into()),
            publish,
            fail_on: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// The happy path, except `call` fails with a non-JSON gateway page.
    pub fn failing_on(call: FailOn) -> Self {
        Self {
            fail_on: Some(call),
            ..Self::succeeding()
        }
    }

    fn answer(&self, call: FailOn, body: Value) -> Result<ApiResponse, ApiError> {
        if self.fail_on == Some(call) {
            return Err(ApiError::NotJson {
                endpoint: format!("{call:?}"),
                status: 502,
                body: "<html>Bad Gateway</html>".into(),
            });
        }
        Ok(ApiResponse(body))
    }

    /// Container `c-1` that finishes after the given status codes; publish returns `m-1`.
    pub fn with_status_codes(codes: &[&str]) -> Self {
        Self::new(
            json!({"id": "c-1"}),
            codes.iter().map(|c| json!({"status_code": c, "id": "c-1"})).collect(),
            json!({"id": "m-1"}),
        )
    }

    /// The happy path: one poll reports FINISHED.
    pub fn succeeding() -> Self {
        Self::with_status_codes(&["FINISHED"])
    }

    pub fn calls(&self) -> Vec<ApiCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn status_polls(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, ApiCall::Status(_)))
            .count()
    }
}

impl MediaApi for ScriptedApi {
    fn create_container(&self, image_url: &str, caption: &str) -> Result<ApiResponse, ApiError> {
        self.calls.lock().unwrap().push(ApiCall::Create {
            image_url: image_url.to_string(),
            caption: caption.to_string(),
        });
        self.answer(FailOn::Create, self.create.clone())
    }

    fn container_status(&self, container_id: &str) -> Result<ApiResponse, ApiError> {
        self.calls
            .lock()
            .unwrap()
            .push(ApiCall::Status(container_id.to_string()));
        let next = self
            .statuses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| json!({"status_code": "IN_PROGRESS"}));
        self.answer(FailOn::Status, next)
    }

    fn publish(&self, container_id: &str) -> Result<ApiResponse, ApiError> {
        self.calls
            .lock()
            .unwrap()
            .push(ApiCall::Publish(container_id.to_string()));
        self.answer(FailOn::Publish, self.publish.clone())
    }
}

// =========================================================================
// Probe and sleeper fakes
// =========================================================================

/// Probe that goes live on the Nth request (1-based), or never.
pub struct ScriptedProbe {
    live_from: Option<u32>,
    probes: Mutex<Vec<String>>,
}

impl ScriptedProbe {
    pub fn live_from(n: u32) -> Self {
        Self {
            live_from: Some(n),
            probes: Mutex::new(Vec::new()),
        }
    }

    pub fn never_live() -> Self {
        Self {
            live_from: None,
            probes: Mutex::new(Vec::new()),
        }
    }

    pub fn probe_count(&self) -> usize {
        self.probes.lock().unwrap().len()
    }

    pub fn probed_urls(&self) -> Vec<String> {
        self.probes.lock().unwrap().clone()
    }
}

impl Probe for ScriptedProbe {
    fn head(&self, url: &str) -> Result<u16, ProbeError> {
        let mut probes = self.probes.lock().unwrap();
        probes.push(url.to_string());
        let n = probes.len() as u32;
        match self.live_from {
            Some(live) if n >= live => Ok(200),
            // Alternate failure shapes: missing object, then a transport error.
            _ if n % 2 == 0 => Err(ProbeError("connection reset".into())),
            _ => Ok(404),
        }
    }
}

/// Sleeper that records requested delays and returns immediately.
#[derive(Default)]
pub struct RecordingSleeper {
    sleeps: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().unwrap().clone()
    }

    pub fn total(&self) -> Duration {
        self.sleeps().iter().sum()
    }
}

impl Sleeper for RecordingSleeper {
    fn sleep(&self, duration: Duration) {
        self.sleeps.lock().unwrap().push(duration);
    }
}
