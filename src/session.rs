//! Session facade: resolution plus fetch and cache statistics.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::sync::Arc;

use crate::config::{ConfigError, ResolverConfig};
use crate::engine::{GraphResolver, ResolveError};
use crate::schema::SchemaRegistry;
use crate::transport::Transport;
use crate::types::{ResourceLocator, Shared};

/// Fetch and cache counters at one point in time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Statistics {
    /// Transport fetches performed.
    pub fetch_count: u64,
    /// Cache hits by cache name.
    pub hits: BTreeMap<String, u64>,
    /// Cache misses by cache name.
    pub misses: BTreeMap<String, u64>,
    /// Current entry count by cache name.
    pub cached: BTreeMap<String, usize>,
}

impl Statistics {
    /// Hits across all caches.
    pub fn total_hits(&self) -> u64 {
        self.hits.values().sum()
    }

    /// Misses across all caches.
    pub fn total_misses(&self) -> u64 {
        self.misses.values().sum()
    }

    /// Render as a plain-text table.
    pub fn to_table(&self) -> String {
        let mut names: Vec<&String> = self
            .hits
            .keys()
            .chain(self.misses.keys())
            .chain(self.cached.keys())
            .collect();
        names.sort();
        names.dedup();

        let mut out = String::new();
        let _ = writeln!(out, "fetches: {}", self.fetch_count);
        let _ = writeln!(out, "{:<24} {:>8} {:>8} {:>8}", "cache", "hits", "misses", "cached");
        for name in names {
            let _ = writeln!(
                out,
                "{:<24} {:>8} {:>8} {:>8}",
                name,
                self.hits.get(name).copied().unwrap_or(0),
                self.misses.get(name).copied().unwrap_or(0),
                self.cached.get(name).copied().unwrap_or(0),
            );
        }
        out
    }
}

/// Resolver plus statistics and cache maintenance.
pub struct Session<T: Transport> {
    resolver: GraphResolver<T>,
}

impl<T: Transport + 'static> Session<T> {
    /// Wrap an existing resolver.
    pub fn new(resolver: GraphResolver<T>) -> Self {
        Self { resolver }
    }

    /// Build a session from parts, validating the configuration.
    pub fn from_config(
        transport: Arc<T>,
        schemas: Arc<SchemaRegistry>,
        config: ResolverConfig,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::new(GraphResolver::new(transport, schemas, config)))
    }

    /// Resolve the resource at `locator`.
    pub async fn resolve<R>(&self, locator: &ResourceLocator) -> Result<Shared<R>, ResolveError>
    where
        R: Send + Sync + 'static,
    {
        self.resolver.resolve::<R>(locator).await
    }

    /// Parse `locator` and resolve it.
    pub async fn resolve_str<R>(&self, locator: &str) -> Result<Shared<R>, ResolveError>
    where
        R: Send + Sync + 'static,
    {
        let locator = ResourceLocator::parse(locator)?;
        self.resolver.resolve::<R>(&locator).await
    }

    /// Resolve a root-level collection endpoint.
    pub async fn resolve_collection<R>(
        &self,
        locator: &ResourceLocator,
    ) -> Result<Vec<Shared<R>>, ResolveError>
    where
        R: Send + Sync + 'static,
    {
        self.resolver.resolve_collection::<R>(locator).await
    }

    /// Current statistics.
    pub fn statistics(&self) -> Statistics {
        let caches = self.resolver.caches();
        let stats = caches.statistics();
        let cached = caches
            .cache_names()
            .into_iter()
            .map(|name| {
                let count = caches.count_for(&name);
                (name, count)
            })
            .collect();
        Statistics {
            fetch_count: self.resolver.fetch_count(),
            hits: stats.hits,
            misses: stats.misses,
            cached,
        }
    }

    /// Log the current statistics and return them as a table.
    pub fn report(&self) -> String {
        let stats = self.statistics();
        tracing::info!(
            fetch_count = stats.fetch_count,
            hits = stats.total_hits(),
            misses = stats.total_misses(),
            "Resolution statistics"
        );
        stats.to_table()
    }

    /// Reset fetch, hit and miss counters. Cached entries are kept.
    pub fn reset_statistics(&self) {
        self.resolver.reset_fetch_count();
        self.resolver.caches().reset_statistics();
    }

    /// Clear one cache.
    pub fn clear_cache(&self, name: &str, reset_stats: bool) {
        self.resolver.caches().clear(name, reset_stats);
    }

    /// Clear every cache.
    pub fn clear_all_caches(&self, reset_stats: bool) {
        self.resolver.caches().clear_all(reset_stats);
    }

    /// Entries in the named cache.
    pub fn cached_count(&self, name: &str) -> usize {
        self.resolver.caches().count_for(name)
    }

    /// The underlying resolver.
    pub fn resolver(&self) -> &GraphResolver<T> {
        &self.resolver
    }
}
