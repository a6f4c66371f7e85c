//! # Photo Relay
//!
//! Posts one photo at a time from a local folder tree to an Instagram business
//! account. Folders are categories, the caption is the category plus the date
//! the photo was taken, and a posted photo moves to an archive tree.
//!
//! # Architecture: Two Invocations
//!
//! The platform pulls the image from a public URL, so the file has to be
//! hosted somewhere before the API is called. The relay therefore runs twice,
//! with a static-site deploy in between:
//!
//! ```text
//! 1. prepare   images_to_upload/  →  upload_meta.txt      (choose, caption, rotate, name)
//!    ── deploy images_to_upload/ to the public host (not part of this crate) ──
//! 2. publish   upload_meta.txt    →  uploaded_images/     (wait, post, archive)
//! ```
//!
//! The only state carried between the two is the one-line transfer record.
//! Running `prepare` again replaces it; `publish` clears it after archiving.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`scan`] | Finds candidate images and their category folder |
//! | [`stage`] | The `prepare` phase: choose, caption, normalize, name, record |
//! | [`metadata`] | Capture time (EXIF → file times) and caption format |
//! | [`naming`] | Public file names, relative paths and URLs |
//! | [`imaging`] | EXIF date parsing and orientation bake-in |
//! | [`record`] | Transfer record format and its stores |
//! | [`gate`] | Waits for the public URL to serve the image |
//! | [`api`] | Graph API client behind the [`api::MediaApi`] trait |
//! | [`publish`] | Container lifecycle state machine |
//! | [`archive`] | Moves posted files into the archive tree |
//! | [`pipeline`] | Wires the phases together |
//! | [`config`] | `photo-relay.toml` + environment loading and validation |
//! | [`wait`] | Sleep seam for every bounded delay |
//! | [`logging`] | `tracing` subscriber setup |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Archive Only After Confirmation
//!
//! The remote post is irreversible; the local move is not. The source file
//! leaves the content root only once the publish call has returned a media
//! id. Every earlier failure leaves it where it was, so the next run can pick
//! it again. A failed archive after a real post is reported, and the record is
//! kept so the file can be moved by hand.
//!
//! ## Fixed Polling
//!
//! Both the availability gate and the status poll use a fixed number of
//! attempts with a fixed delay, configurable under `[timing]`. One image per
//! run on a schedule does not need backoff.
//!
//! ## Seams for Fakes
//!
//! The HTTP probe, the media API, the sleeper and the record store are traits.
//! Tests drive the whole publish phase with scripted fakes and no network.

pub mod api;
pub mod archive;
pub mod config;
pub mod gate;
pub mod imaging;
pub mod logging;
pub mod metadata;
pub mod naming;
pub mod output;
pub mod pipeline;
pub mod publish;
pub mod record;
pub mod scan;
pub mod stage;
pub mod wait;

#[cfg(test)]
pub(crate) mod test_helpers;
