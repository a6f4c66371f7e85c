//! Publish state machine: drive one image through the remote media lifecycle.
//!
//! ```text
//!            create ok            FINISHED               publish ok
//! CREATING ───────────▶ PROCESSING ────────▶ READY ─────────────▶ PUBLISHED
//!    │                      │  ▲ other                 │
//!    │ no id                │  └─────┘ (≤ N polls)     │ no id
//!    ▼                      ├─ ERROR ──▶ PROCESS_FAILED ▼
//! CREATE_FAILED             └─ N polls ─▶ PROCESS_TIMEOUT  PUBLISH_FAILED
//! ```
//!
//! The platform processes media asynchronously and offers no push
//! notification, so the machine polls the container's `status_code` a fixed
//! number of times with a fixed delay. A short settle delay separates
//! creation from the first poll.
//!
//! Every failure exit is fatal for the run. Nothing is persisted mid-flight:
//! a crash means re-running from `CREATING`, leaving an orphaned container
//! on the platform side.
//!
//! The caller archives the source file only on `Ok(Published)`.

use crate::api::{ApiError, ApiResponse, MediaApi};
use crate::config::PollPolicy;
use crate::wait::Sleeper;
use std::fmt;
use std::sync::mpsc::Sender;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

const STATUS_FINISHED: &str = "FINISHED";
const STATUS_ERROR: &str = "ERROR";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishState {
    Creating,
    Processing,
    Ready,
    Published,
}

impl fmt::Display for PublishState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Creating => "CREATING",
            Self::Processing => "PROCESSING",
            Self::Ready => "READY",
            Self::Published => "PUBLISHED",
        })
    }
}

#[derive(Error, Debug)]
pub enum PublishError {
    #[error("Failed to create media container: {payload}")]
    CreateFailed { payload: String },
    #[error("Media processing failed for container {container_id}: {payload}")]
    ProcessFailed {
        container_id: String,
        payload: String,
    },
    #[error("Media not ready after {attempts} status checks (container {container_id}): {payload}")]
    ProcessTimeout {
        container_id: String,
        attempts: u32,
        payload: String,
    },
    #[error("Failed to publish container {container_id}: {payload}")]
    PublishFailed {
        container_id: String,
        payload: String,
    },
    #[error("API call failed while {state}: {source}")]
    Transport {
        state: PublishState,
        #[source]
        source: ApiError,
    },
}

impl PublishError {
    /// The state the machine was in when it failed.
    pub fn state(&self) -> PublishState {
        match self {
            Self::CreateFailed { .. } => PublishState::Creating,
            Self::ProcessFailed { .. } | Self::ProcessTimeout { .. } => PublishState::Processing,
            Self::PublishFailed { .. } => PublishState::Ready,
            Self::Transport { state, .. } => *state,
        }
    }
}

/// Progress reported while the machine runs.
#[derive(Debug, Clone, PartialEq)]
pub enum PublishEvent {
    ContainerCreated {
        container_id: String,
    },
    StatusChecked {
        attempt: u32,
        status: Option<String>,
    },
    Ready {
        container_id: String,
    },
    Published {
        media_id: String,
        response: String,
    },
}

/// Terminal success: the platform confirmed the post.
#[derive(Debug, Clone, PartialEq)]
pub struct Published {
    pub container_id: String,
    pub media_id: String,
    pub response: ApiResponse,
}

pub struct Publisher<A, S> {
    api: A,
    sleeper: S,
    settle_delay: Duration,
    status: PollPolicy,
}

fn emit(events: Option<&Sender<PublishEvent>>, event: PublishEvent) {
    if let Some(tx) = events {
        // A dropped receiver only loses progress output.
        tx.send(event).ok();
    }
}

impl<A: MediaApi, S: Sleeper> Publisher<A, S> {
    pub fn new(api: A, sleeper: S, settle_delay: Duration, status: PollPolicy) -> Self {
        Self {
            api,
            sleeper,
            settle_delay,
            status,
        }
    }

    /// Run the full lifecycle for one image.
    pub fn run(
        &self,
        image_url: &str,
        caption: &str,
        events: Option<&Sender<PublishEvent>>,
    ) -> Result<Published, PublishError> {
        let container_id = self.create(image_url, caption)?;
        emit(
            events,
            PublishEvent::ContainerCreated {
                container_id: container_id.clone(),
            },
        );

        self.sleeper.sleep(self.settle_delay);
        self.await_finished(&container_id, events)?;
        emit(
            events,
            PublishEvent::Ready {
                container_id: container_id.clone(),
            },
        );

        let published = self.confirm(container_id)?;
        emit(
            events,
            PublishEvent::Published {
                media_id: published.media_id.clone(),
                response: published.response.to_string(),
            },
        );
        Ok(published)
    }

    /// CREATING: the response must carry a non-empty container id.
    fn create(&self, image_url: &str, caption: &str) -> Result<String, PublishError> {
        debug!(state = %PublishState::Creating, image_url, "Creating media container");
        let response = self
            .api
            .create_container(image_url, caption)
            .map_err(|source| PublishError::Transport {
                state: PublishState::Creating,
                source,
            })?;

        let container_id = response.id().ok_or_else(|| PublishError::CreateFailed {
            payload: response.to_string(),
        })?;
        info!(container_id = %container_id, "Media container created");
        Ok(container_id)
    }

    /// PROCESSING: poll until FINISHED, failing fast on ERROR.
    fn await_finished(
        &self,
        container_id: &str,
        events: Option<&Sender<PublishEvent>>,
    ) -> Result<(), PublishError> {
        let mut last = ApiResponse(serde_json::Value::Null);

        for attempt in 1..=self.status.attempts {
            let response = self.api.container_status(container_id).map_err(|source| {
                PublishError::Transport {
                    state: PublishState::Processing,
                    source,
                }
            })?;
            let status = response.status_code().map(String::from);
            info!(attempt, status = status.as_deref().unwrap_or("<none>"), "Media status");
            emit(
                events,
                PublishEvent::StatusChecked {
                    attempt,
                    status: status.clone(),
                },
            );

            match status.as_deref() {
                Some(STATUS_FINISHED) => {
                    info!(container_id, "Media processing finished, ready to publish");
                    return Ok(());
                }
                Some(STATUS_ERROR) => {
                    return Err(PublishError::ProcessFailed {
                        container_id: container_id.to_string(),
                        payload: response.to_string(),
                    });
                }
                _ => {}
            }

            last = response;
            if attempt < self.status.attempts {
                self.sleeper.sleep(self.status.delay);
            }
        }

        warn!(container_id, attempts = self.status.attempts, "Media never finished processing");
        Err(PublishError::ProcessTimeout {
            container_id: container_id.to_string(),
            attempts: self.status.attempts,
            payload: last.to_string(),
        })
    }

    /// READY → PUBLISHED: the response must carry an id.
    fn confirm(&self, container_id: String) -> Result<Published, PublishError> {
        let response =
            self.api
                .publish(&container_id)
                .map_err(|source| PublishError::Transport {
                    state: PublishState::Ready,
                    source,
                })?;

        match response.id() {
            Some(media_id) => {
                info!(media_id = %media_id, %response, "Publish successful");
                Ok(Published {
                    container_id,
                    media_id,
                    response,
                })
            }
            None => Err(PublishError::PublishFailed {
                container_id,
                payload: response.to_string(),
            }),
        }
    }
}
