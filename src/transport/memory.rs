//! In-memory transport for tests and offline fixtures.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};

use super::{FetchError, Transport};
use crate::types::{HalDocument, ResourceLocator};

/// Serves HAL bodies from memory and records every fetch.
#[derive(Debug, Default)]
pub struct InMemoryTransport {
    resources: HashMap<ResourceLocator, Value>,
    collections: HashMap<ResourceLocator, Value>,
    failures: HashMap<ResourceLocator, FetchError>,
    fetches: Mutex<BTreeMap<ResourceLocator, usize>>,
}

impl InMemoryTransport {
    /// Create an empty transport.
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `body` (a HAL JSON object) at `locator`.
    pub fn add_resource(&mut self, locator: ResourceLocator, body: Value) {
        self.resources.insert(locator, body);
    }

    /// Serve `body` (an array or `_embedded` collection) at `locator`.
    pub fn add_collection(&mut self, locator: ResourceLocator, body: Value) {
        self.collections.insert(locator, body);
    }

    /// Make fetches of `locator` fail with `error`.
    pub fn fail(&mut self, locator: ResourceLocator, error: FetchError) {
        self.failures.insert(locator, error);
    }

    /// Times `locator` was fetched.
    pub fn fetch_count(&self, locator: &ResourceLocator) -> usize {
        self.fetches.lock().get(locator).copied().unwrap_or(0)
    }

    /// Total fetches across all locators.
    pub fn total_fetches(&self) -> usize {
        self.fetches.lock().values().sum()
    }

    fn record(&self, locator: &ResourceLocator) -> Result<(), FetchError> {
        *self.fetches.lock().entry(locator.clone()).or_insert(0) += 1;
        match self.failures.get(locator) {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl Transport for InMemoryTransport {
    async fn fetch(&self, locator: &ResourceLocator) -> Result<HalDocument, FetchError> {
        self.record(locator)?;
        let body = self.resources.get(locator).cloned().ok_or(FetchError::NotFound)?;
        Ok(HalDocument::from_json(body, Some(locator))?)
    }

    async fn fetch_collection(&self, locator: &ResourceLocator) -> Result<Vec<HalDocument>, FetchError> {
        self.record(locator)?;
        let body = self.collections.get(locator).cloned().ok_or(FetchError::NotFound)?;
        Ok(HalDocument::collection_from_json(body, Some(locator))?)
    }
}
