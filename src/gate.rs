//! Availability gate: wait until the staged image is publicly reachable.
//!
//! Staging and publishing usually run in different deployment contexts, with
//! a static-site deploy (or CDN propagation) in between. The media platform
//! fetches the image by URL, so creating a container before that URL serves
//! the file would fail. The gate absorbs the propagation delay with a fixed
//! number of HEAD probes spaced by a fixed delay.
//!
//! ```text
//! probe 1 ──404──▶ sleep ─▶ probe 2 ──err──▶ sleep ─▶ … ─▶ probe N ──2xx──▶ live
//!                                                        probe 6 ──✗──▶ NotLive
//! ```
//!
//! Transport errors (DNS not yet resolving, connection resets) count the same
//! as a non-success status: not live yet.

use crate::config::PollPolicy;
use crate::wait::Sleeper;
use reqwest::blocking::Client;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum GateError {
    #[error("File not live at {url} after {attempts} probes")]
    NotLive { url: String, attempts: u32 },
}

/// Transport-level probe failure, kept as text.
#[derive(Error, Debug)]
#[error("{0}")]
pub struct ProbeError(pub String);

pub trait Probe {
    /// Issue a HEAD request and return the HTTP status code.
    fn head(&self, url: &str) -> Result<u16, ProbeError>;
}

impl<P: Probe + ?Sized> Probe for &P {
    fn head(&self, url: &str) -> Result<u16, ProbeError> {
        (**self).head(url)
    }
}

/// HEAD probe over HTTP.
pub struct HttpProbe {
    client: Client,
}

impl HttpProbe {
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
        })
    }
}

impl Probe for HttpProbe {
    fn head(&self, url: &str) -> Result<u16, ProbeError> {
        self.client
            .head(url)
            .send()
            .map(|r| r.status().as_u16())
            .map_err(|e| ProbeError(e.to_string()))
    }
}

fn is_success(status: u16) -> bool {
    (200..300).contains(&status)
}

pub struct AvailabilityGate<P, S> {
    probe: P,
    sleeper: S,
    policy: PollPolicy,
}

impl<P: Probe, S: Sleeper> AvailabilityGate<P, S> {
    pub fn new(probe: P, sleeper: S, policy: PollPolicy) -> Self {
        Self {
            probe,
            sleeper,
            policy,
        }
    }

    /// Block until `url` answers with a success status.
    ///
    /// Returns the number of probes it took. Sleeps only between probes:
    /// a URL that is live on the first probe returns with no delay, and the
    /// final failed probe is not followed by a sleep.
    pub fn await_public(&self, url: &str) -> Result<u32, GateError> {
        for attempt in 1..=self.policy.attempts {
            match self.probe.head(url) {
                Ok(status) if is_success(status) => {
                    info!(url, attempt, "Public URL is live");
                    return Ok(attempt);
                }
                Ok(status) => debug!(url, attempt, status, "Public URL not live yet"),
                Err(e) => debug!(url, attempt, error = %e, "Public URL probe failed"),
            }
            if attempt < self.policy.attempts {
                info!(url, "Waiting for public URL to be live...");
                self.sleeper.sleep(self.policy.delay);
            }
        }
        Err(GateError::NotLive {
            url: url.to_string(),
            attempts: self.policy.attempts,
        })
    }
}
