//! Remote media API: the three calls of the create → poll → publish lifecycle.
//!
//! [`MediaApi`] is the seam the publish state machine drives. The production
//! implementation, [`GraphApiClient`], targets the Instagram Graph API:
//!
//! | Call | Request |
//! |---|---|
//! | create container | `POST {base}/{account}/media?image_url=…&caption=…&access_token=…` |
//! | container status | `GET {base}/{container}?fields=status_code&access_token=…` |
//! | publish | `POST {base}/{account}/media_publish?creation_id=…&access_token=…` |
//!
//! Responses are returned as raw JSON regardless of HTTP status. The platform
//! reports failures as `{"error": {...}}` bodies, and the state machine judges
//! every response by its shape (is there an `id`? what is `status_code`?), so
//! the client never decides success itself.

use crate::config::Credentials;
use reqwest::blocking::Client;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Response from {endpoint} is not JSON (HTTP {status}): {body}")]
    NotJson {
        endpoint: String,
        status: u16,
        body: String,
    },
}

/// A decoded response body.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse(pub Value);

impl ApiResponse {
    /// The `id` field, if present and non-empty. Numeric ids are rendered as text.
    pub fn id(&self) -> Option<String> {
        match self.0.get("id")? {
            Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    /// The `status_code` field of a container status response.
    pub fn status_code(&self) -> Option<&str> {
        self.0.get("status_code").and_then(Value::as_str)
    }
}

impl std::fmt::Display for ApiResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Value> for ApiResponse {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

pub trait MediaApi {
    /// Ask the platform to fetch `image_url` into a new media container.
    fn create_container(&self, image_url: &str, caption: &str) -> Result<ApiResponse, ApiError>;

    /// Fetch the processing status of a container.
    fn container_status(&self, container_id: &str) -> Result<ApiResponse, ApiError>;

    /// Publish a finished container to the account's feed.
    fn publish(&self, container_id: &str) -> Result<ApiResponse, ApiError>;
}

impl<A: MediaApi + ?Sized> MediaApi for &A {
    fn create_container(&self, image_url: &str, caption: &str) -> Result<ApiResponse, ApiError> {
        (**self).create_container(image_url, caption)
    }

    fn container_status(&self, container_id: &str) -> Result<ApiResponse, ApiError> {
        (**self).container_status(container_id)
    }

    fn publish(&self, container_id: &str) -> Result<ApiResponse, ApiError> {
        (**self).publish(container_id)
    }
}

/// Blocking Graph API client.
pub struct GraphApiClient {
    client: Client,
    credentials: Credentials,
}

impl GraphApiClient {
    pub fn new(credentials: Credentials) -> Result<Self, ApiError> {
        let client = Client::builder().timeout(credentials.timeout).build()?;
        Ok(Self {
            client,
            credentials,
        })
    }

    fn media_endpoint(&self) -> String {
        format!(
            "{}/{}/media",
            self.credentials.graph_base_url, self.credentials.account_id
        )
    }

    fn publish_endpoint(&self) -> String {
        format!(
            "{}/{}/media_publish",
            self.credentials.graph_base_url, self.credentials.account_id
        )
    }

    fn status_endpoint(&self, container_id: &str) -> String {
        format!(
            "{}/{}",
            self.credentials.graph_base_url,
            urlencoding::encode(container_id)
        )
    }

    fn decode(endpoint: &str, response: reqwest::blocking::Response) -> Result<ApiResponse, ApiError> {
        let status = response.status().as_u16();
        let body = response.text()?;
        debug!(endpoint, status, "API response received");
        serde_json::from_str::<Value>(&body)
            .map(ApiResponse)
            .map_err(|_| ApiError::NotJson {
                endpoint: endpoint.to_string(),
                status,
                body,
            })
    }
}

impl MediaApi for GraphApiClient {
    fn create_container(&self, image_url: &str, caption: &str) -> Result<ApiResponse, ApiError> {
        let endpoint = self.media_endpoint();
        let response = self
            .client
            .post(&endpoint)
            .query(&[
                ("image_url", image_url),
                ("caption", caption),
                ("access_token", self.credentials.access_token.as_str()),
            ])
            .send()?;
        Self::decode(&endpoint, response)
    }

    fn container_status(&self, container_id: &str) -> Result<ApiResponse, ApiError> {
        let endpoint = self.status_endpoint(container_id);
        let response = self
            .client
            .get(&endpoint)
            .query(&[
                ("fields", "status_code"),
                ("access_token", self.credentials.access_token.as_str()),
            ])
            .send()?;
        Self::decode(&endpoint, response)
    }

    fn publish(&self, container_id: &str) -> Result<ApiResponse, ApiError> {
        let endpoint = self.publish_endpoint();
        let response = self
            .client
            .post(&endpoint)
            .query(&[
                ("creation_id", container_id),
                ("access_token", self.credentials.access_token.as_str()),
            ])
            .send()?;
        Self::decode(&endpoint, response)
    }
}
