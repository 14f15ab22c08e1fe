//! Transports: fetch and decode HAL representations.

pub mod memory;

#[cfg(feature = "http")]
pub mod http;

use async_trait::async_trait;

use crate::types::{DocumentError, HalDocument, ResourceLocator};

/// Failure to obtain a representation.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FetchError {
    /// Nothing exists at the locator.
    #[error("Resource not found")]
    NotFound,
    /// Server answered with a non-success status.
    #[error("Unexpected status {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, possibly truncated.
        body: String,
    },
    /// Network or protocol failure.
    #[error("Transport error: {0}")]
    Transport(String),
    /// Body could not be decoded.
    #[error("Decode error: {0}")]
    Decode(String),
}

impl From<DocumentError> for FetchError {
    fn from(e: DocumentError) -> Self {
        Self::Decode(e.to_string())
    }
}

/// Fetches HAL representations.
///
/// Implementations perform no retries; a failure aborts the resolution that
/// requested it.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Fetch one resource.
    async fn fetch(&self, locator: &ResourceLocator) -> Result<HalDocument, FetchError>;

    /// Fetch a root-level array of resources.
    async fn fetch_collection(&self, locator: &ResourceLocator) -> Result<Vec<HalDocument>, FetchError>;
}

pub use memory::InMemoryTransport;

#[cfg(feature = "http")]
pub use http::{HttpTransport, HttpTransportConfig};
