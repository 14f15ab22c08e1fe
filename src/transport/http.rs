//! HTTP transport over `reqwest`.

use async_trait::async_trait;
use reqwest::{header, Client as ReqwestClient};
use serde_json::Value;
use std::time::Duration;

use super::{FetchError, Transport};
use crate::config::ResolverConfig;
use crate::types::{HalDocument, ResourceLocator};

/// Media type requested from servers.
pub const HAL_MEDIA_TYPE: &str = "application/hal+json";

const MAX_ERROR_BODY: usize = 512;

/// Configuration for [`HttpTransport`].
#[derive(Debug, Clone)]
pub struct HttpTransportConfig {
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
    /// Optional `Authorization` header value.
    pub authorization: Option<String>,
}

impl Default for HttpTransportConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            authorization: None,
        }
    }
}

impl From<&ResolverConfig> for HttpTransportConfig {
    fn from(config: &ResolverConfig) -> Self {
        Self {
            timeout_secs: config.http_timeout_secs,
            authorization: None,
        }
    }
}

/// Fetches HAL documents with `GET` requests.
///
/// Timeouts and connection failures surface as [`FetchError::Transport`];
/// nothing is retried.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    http_client: ReqwestClient,
    authorization: Option<String>,
}

impl HttpTransport {
    /// Create a transport with default configuration.
    pub fn new() -> Result<Self, FetchError> {
        Self::with_config(HttpTransportConfig::default())
    }

    /// Create a transport with custom configuration.
    pub fn with_config(config: HttpTransportConfig) -> Result<Self, FetchError> {
        let http_client = ReqwestClient::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .pool_max_idle_per_host(10)
            .build()
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        Ok(Self {
            http_client,
            authorization: config.authorization,
        })
    }

    async fn get_json(&self, locator: &ResourceLocator) -> Result<Value, FetchError> {
        let mut request = self
            .http_client
            .get(locator.as_url().clone())
            .header(header::ACCEPT, HAL_MEDIA_TYPE);
        if let Some(auth) = &self.authorization {
            request = request.header(header::AUTHORIZATION, auth);
        }

        tracing::debug!(locator = %locator, "GET");
        let response = request
            .send()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(FetchError::NotFound);
        }
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error response".to_string());
            return Err(FetchError::Status {
                status: status.as_u16(),
                body: truncate_body(body),
            });
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| FetchError::Decode(e.to_string()))
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn fetch(&self, locator: &ResourceLocator) -> Result<HalDocument, FetchError> {
        let body = self.get_json(locator).await?;
        Ok(HalDocument::from_json(body, Some(locator))?)
    }

    async fn fetch_collection(&self, locator: &ResourceLocator) -> Result<Vec<HalDocument>, FetchError> {
        let body = self.get_json(locator).await?;
        Ok(HalDocument::collection_from_json(body, Some(locator))?)
    }
}

fn truncate_body(mut body: String) -> String {
    if body.len() > MAX_ERROR_BODY {
        let mut end = MAX_ERROR_BODY;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        body.truncate(end);
    }
    body
}
