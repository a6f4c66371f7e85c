//! CLI output formatting for both run modes.
//!
//! # Output Format
//!
//! ## Prepare
//!
//! ```text
//! Staged Trips // Monday, June 03, 2024
//!     Source: images_to_upload/Trips/beach.jpg
//!     Public: Trips/beach_UPLOADED_AT_03-06-2024_18-42.jpg
//! ```
//!
//! ## Publish
//!
//! Progress lines stream as the state machine runs, followed by a summary:
//!
//! ```text
//! Media container created: 17890012345
//! [Check 1] Media status: IN_PROGRESS
//! [Check 2] Media status: FINISHED
//! Media ready: 17890012345
//! Publish successful: {"id":"17912345678"}
//!
//! Published Trips // Monday, June 03, 2024
//!     URL: https://example.org/photos/Trips/beach_UPLOADED_AT_03-06-2024_18-42.jpg
//!     Media: 17912345678
//!     Archived: uploaded_images/Trips/beach_UPLOADED_AT_03-06-2024_18-42.jpg
//! ```
//!
//! # Architecture
//!
//! Each result has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure: no I/O, no side effects.

use crate::pipeline::PublishOutcome;
use crate::publish::PublishEvent;
use crate::record::TransferRecord;

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

// ============================================================================
// Prepare
// ============================================================================

pub fn format_stage_output(record: &TransferRecord) -> Vec<String> {
    vec![
        format!("Staged {}", record.caption),
        format!("{}Source: {}", indent(1), record.original_path.display()),
        format!("{}Public: {}", indent(1), record.public_relative_path),
    ]
}

pub fn print_stage_output(record: &TransferRecord) {
    for line in format_stage_output(record) {
        println!("{}", line);
    }
}

// ============================================================================
// Publish
// ============================================================================

/// Format one state machine progress event.
pub fn format_publish_event(event: &PublishEvent) -> Vec<String> {
    match event {
        PublishEvent::ContainerCreated { container_id } => {
            vec![format!("Media container created: {}", container_id)]
        }
        PublishEvent::StatusChecked { attempt, status } => vec![format!(
            "[Check {}] Media status: {}",
            attempt,
            status.as_deref().unwrap_or("unknown")
        )],
        PublishEvent::Ready { container_id } => vec![format!("Media ready: {}", container_id)],
        PublishEvent::Published { response, .. } => {
            vec![format!("Publish successful: {}", response)]
        }
    }
}

pub fn format_publish_output(outcome: &PublishOutcome) -> Vec<String> {
    vec![
        format!("Published {}", outcome.record.caption),
        format!("{}URL: {}", indent(1), outcome.image_url),
        format!("{}Media: {}", indent(1), outcome.published.media_id),
        format!("{}Archived: {}", indent(1), outcome.archived.path.display()),
    ]
}

pub fn print_publish_output(outcome: &PublishOutcome) {
    println!();
    for line in format_publish_output(outcome) {
        println!("{}", line);
    }
}
