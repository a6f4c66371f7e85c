//! Relay configuration.
//!
//! Settings are layered, highest priority first:
//!
//! ```text
//! CLI flags            --content-root, --archive-root, --record
//! environment          IG_ACCESS_TOKEN, IG_BUSINESS_ID, PUBLIC_IMAGE_BASE_URL, PHOTO_RELAY_*
//! photo-relay.toml     optional, path overridable with --config
//! stock defaults       documented on each field below
//! ```
//!
//! ## Config File
//!
//! ```toml
//! [paths]
//! content_root = "images_to_upload"
//! archive_root = "uploaded_images"
//! record = "upload_meta.txt"
//!
//! [public]
//! base_url = "https://example.github.io/photos"
//!
//! [api]
//! graph_base_url = "https://graph.facebook.com/v21.0"
//!
//! [timing]
//! gate_attempts = 6
//! gate_delay_secs = 5
//! settle_delay_secs = 3
//! status_attempts = 10
//! status_delay_secs = 5
//! ```
//!
//! Secrets (`access_token`, `account_id`) and the public base URL are optional
//! at load time. The `prepare` phase never needs them; the `publish` phase
//! asks for them through [`RelayConfig::publish_settings`], which fails with
//! [`ConfigError::Missing`] when one is absent.

use confique::Config;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Default config file name, looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "photo-relay.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config load error: {0}")]
    Load(#[from] confique::Error),
    #[error("Missing required setting `{key}` (set it in the config file or via {env})")]
    Missing {
        key: &'static str,
        env: &'static str,
    },
    #[error("Config validation error: {0}")]
    Validation(String),
}

#[derive(Config, Debug, Clone)]
pub struct RelayConfig {
    #[config(nested)]
    pub paths: PathsConfig,
    #[config(nested)]
    pub public: PublicConfig,
    #[config(nested)]
    pub api: ApiConfig,
    #[config(nested)]
    pub timing: TimingConfig,
    #[config(nested)]
    pub log: LogConfig,
}

/// Local directories and the transfer record location.
#[derive(Config, Debug, Clone)]
pub struct PathsConfig {
    /// Directory tree of images waiting to be posted, one subfolder per category.
    #[config(default = "images_to_upload", env = "PHOTO_RELAY_CONTENT_ROOT")]
    pub content_root: PathBuf,
    /// Where posted images are moved, mirroring the category folders.
    #[config(default = "uploaded_images", env = "PHOTO_RELAY_ARCHIVE_ROOT")]
    pub archive_root: PathBuf,
    /// Transfer record written by `prepare` and read by `publish`.
    #[config(default = "upload_meta.txt", env = "PHOTO_RELAY_RECORD")]
    pub record: PathBuf,
}

#[derive(Config, Debug, Clone)]
pub struct PublicConfig {
    /// Base URL under which the staged relative path is served publicly.
    #[config(env = "PUBLIC_IMAGE_BASE_URL")]
    pub base_url: Option<String>,
}

/// Remote media API endpoint and credentials.
#[derive(Config, Debug, Clone)]
pub struct ApiConfig {
    /// Versioned Graph API root.
    #[config(default = "https://graph.facebook.com/v21.0", env = "PHOTO_RELAY_GRAPH_URL")]
    pub graph_base_url: String,
    /// Long-lived access token for the publishing account.
    #[config(env = "IG_ACCESS_TOKEN")]
    pub access_token: Option<String>,
    /// Business account id that owns the media containers.
    #[config(env = "IG_BUSINESS_ID")]
    pub account_id: Option<String>,
    /// Per-request timeout in seconds.
    #[config(default = 30)]
    pub timeout_secs: u64,
}

/// Fixed attempt counts and delays. No backoff.
#[derive(Config, Debug, Clone)]
pub struct TimingConfig {
    /// Probes of the public URL before giving up.
    #[config(default = 6)]
    pub gate_attempts: u32,
    /// Seconds between public URL probes.
    #[config(default = 5)]
    pub gate_delay_secs: u64,
    /// Seconds to wait after container creation before the first status poll.
    #[config(default = 3)]
    pub settle_delay_secs: u64,
    /// Container status polls before giving up.
    #[config(default = 10)]
    pub status_attempts: u32,
    /// Seconds between container status polls.
    #[config(default = 5)]
    pub status_delay_secs: u64,
}

#[derive(Config, Debug, Clone)]
pub struct LogConfig {
    /// `tracing` filter directive, used when RUST_LOG is unset.
    #[config(default = "photo_relay=info")]
    pub filter: String,
}

/// A fixed-count, fixed-delay polling schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub attempts: u32,
    pub delay: Duration,
}

impl PollPolicy {
    pub fn new(attempts: u32, delay: Duration) -> Self {
        Self { attempts, delay }
    }
}

/// Everything the publish phase needs, resolved and checked.
#[derive(Debug, Clone)]
pub struct PublishSettings {
    pub public_base_url: String,
    pub credentials: Credentials,
    pub gate: PollPolicy,
    pub settle_delay: Duration,
    pub status: PollPolicy,
}

#[derive(Clone)]
pub struct Credentials {
    pub graph_base_url: String,
    pub access_token: String,
    pub account_id: String,
    pub timeout: Duration,
}

// Keep the token out of logs and panic messages.
impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("graph_base_url", &self.graph_base_url)
            .field("access_token", &"<redacted>")
            .field("account_id", &self.account_id)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl RelayConfig {
    /// Load from environment and an optional TOML file, then validate.
    ///
    /// A missing file is not an error; a malformed one is.
    pub fn load(file: &Path) -> Result<Self, ConfigError> {
        let config = Self::builder().env().file(file).load()?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a TOML file only, ignoring the process environment.
    pub fn load_file(file: &Path) -> Result<Self, ConfigError> {
        let config = Self::builder().file(file).load()?;
        config.validate()?;
        Ok(config)
    }

    /// Validate values are usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.timing.gate_attempts == 0 {
            return Err(ConfigError::Validation(
                "timing.gate_attempts must be at least 1".into(),
            ));
        }
        if self.timing.status_attempts == 0 {
            return Err(ConfigError::Validation(
                "timing.status_attempts must be at least 1".into(),
            ));
        }
        if self.api.graph_base_url.trim().is_empty() {
            return Err(ConfigError::Validation(
                "api.graph_base_url must not be empty".into(),
            ));
        }
        Ok(())
    }

    /// Apply command-line path overrides on top of the loaded values.
    pub fn with_overrides(
        mut self,
        content_root: Option<PathBuf>,
        archive_root: Option<PathBuf>,
        record: Option<PathBuf>,
    ) -> Self {
        if let Some(p) = content_root {
            self.paths.content_root = p;
        }
        if let Some(p) = archive_root {
            self.paths.archive_root = p;
        }
        if let Some(p) = record {
            self.paths.record = p;
        }
        self
    }

    /// Resolve the settings for the publish phase.
    pub fn publish_settings(&self) -> Result<PublishSettings, ConfigError> {
        let public_base_url = required(
            self.public.base_url.as_deref(),
            "public.base_url",
            "PUBLIC_IMAGE_BASE_URL",
        )?;
        let access_token = required(
            self.api.access_token.as_deref(),
            "api.access_token",
            "IG_ACCESS_TOKEN",
        )?;
        let account_id = required(
            self.api.account_id.as_deref(),
            "api.account_id",
            "IG_BUSINESS_ID",
        )?;

        let t = &self.timing;
        Ok(PublishSettings {
            public_base_url,
            credentials: Credentials {
                graph_base_url: self.api.graph_base_url.trim_end_matches('/').to_string(),
                access_token,
                account_id,
                timeout: Duration::from_secs(self.api.timeout_secs),
            },
            gate: PollPolicy::new(t.gate_attempts, Duration::from_secs(t.gate_delay_secs)),
            settle_delay: Duration::from_secs(t.settle_delay_secs),
            status: PollPolicy::new(t.status_attempts, Duration::from_secs(t.status_delay_secs)),
        })
    }
}

fn required(
    value: Option<&str>,
    key: &'static str,
    env: &'static str,
) -> Result<String, ConfigError> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(String::from)
        .ok_or(ConfigError::Missing { key, env })
}

/// A fully commented config template with every key and its default.
///
/// Used by the `gen-config` run mode.
pub fn config_template() -> String {
    confique::toml::template::<RelayConfig>(confique::toml::FormatOptions::default())
}
