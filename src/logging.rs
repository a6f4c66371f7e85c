//! Diagnostic logging.
//!
//! Library code logs through `tracing`; this module installs the subscriber.
//! Logs go to stderr in the compact format, leaving stdout to the
//! [`output`](crate::output) lines.
//!
//! The filter comes from `RUST_LOG` when set, otherwise from the `log.filter`
//! config key (default `photo_relay=info`):
//!
//! ```text
//! RUST_LOG=photo_relay=debug photo-relay publish   # every probe and poll
//! RUST_LOG=photo_relay=debug,reqwest=debug ...     # plus HTTP client internals
//! ```

use std::io;
use thiserror::Error;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Error, Debug)]
pub enum LoggingError {
    #[error("Invalid log filter {filter:?}: {message}")]
    Filter { filter: String, message: String },
    #[error("Failed to initialize logging: {0}")]
    Init(String),
}

/// Pick the filter: `RUST_LOG` if present and valid, else `fallback`.
pub fn build_filter(fallback: &str) -> Result<EnvFilter, LoggingError> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    EnvFilter::try_new(fallback).map_err(|e| LoggingError::Filter {
        filter: fallback.to_string(),
        message: e.to_string(),
    })
}

/// Install the global subscriber. Fails if one is already set.
pub fn init_logging(fallback_filter: &str) -> Result<(), LoggingError> {
    let filter = build_filter(fallback_filter)?;
    let fmt_layer = tracing_subscriber::fmt::layer()
        .compact()
        .with_target(false)
        .with_writer(io::stderr);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init()
        .map_err(|e| LoggingError::Init(e.to_string()))
}
