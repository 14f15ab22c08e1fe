//! Process-wide registry of named resource caches.
//!
//! Every resource type maps to one [`BoundedCache`]:
//!
//! | Declaration | Cache |
//! |-------------|-------|
//! | `cache(name, n)` | `name`, capacity `n` |
//! | `cache_named(name)` | `name`, default capacity |
//! | `cache_sized(n)` / `cacheable()` | [`COMMON_CACHE`] |
//! | none | [`INTERMEDIATE_CACHE`], unbounded, cleared after every resolve |
//!
//! Caches are created lazily. When two types declare the same name with
//! different capacities, the first one seen sizes the cache.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use super::bounded::BoundedCache;
use crate::schema::{Node, ResourceType};
use crate::types::ResourceLocator;

/// Cache shared by types that declare caching without a name.
pub const COMMON_CACHE: &str = "common";

/// Traversal-scoped cache for types with no caching declaration.
pub const INTERMEDIATE_CACHE: &str = "intermediate";

/// Hit and miss counters per cache name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStatistics {
    /// Hits by cache name.
    pub hits: BTreeMap<String, u64>,
    /// Misses by cache name.
    pub misses: BTreeMap<String, u64>,
}

impl CacheStatistics {
    /// Total hits across caches.
    pub fn total_hits(&self) -> u64 {
        self.hits.values().sum()
    }

    /// Total misses across caches.
    pub fn total_misses(&self) -> u64 {
        self.misses.values().sum()
    }
}

/// Name and capacity of a resolved cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheInfo {
    /// Cache name.
    pub name: String,
    /// Effective capacity (first declaration wins).
    pub capacity: usize,
}

#[derive(Debug, Default)]
struct RegistryState {
    caches: HashMap<String, BoundedCache>,
    stats: CacheStatistics,
}

impl RegistryState {
    fn cache_mut(&mut self, name: &str, capacity: usize) -> &mut BoundedCache {
        self.caches.entry(name.to_string()).or_insert_with(|| {
            if name == INTERMEDIATE_CACHE {
                BoundedCache::unbounded(name)
            } else {
                tracing::debug!(cache = %name, capacity, "Creating cache");
                BoundedCache::new(name, capacity)
            }
        })
    }
}

/// Owns all named caches and their statistics.
///
/// Thread-safe: concurrent resolutions share one registry.
#[derive(Debug)]
pub struct CacheRegistry {
    default_capacity: usize,
    caching_disabled: bool,
    state: Mutex<RegistryState>,
}

impl CacheRegistry {
    /// Create a registry.
    ///
    /// With `caching_disabled`, lookups and stores on every cache except the
    /// intermediate one are no-ops.
    pub fn new(default_capacity: usize, caching_disabled: bool) -> Self {
        Self {
            default_capacity,
            caching_disabled,
            state: Mutex::new(RegistryState::default()),
        }
    }

    /// Default capacity for caches declared without one.
    pub fn default_capacity(&self) -> usize {
        self.default_capacity
    }

    /// Whether durable caching is disabled.
    pub fn caching_disabled(&self) -> bool {
        self.caching_disabled
    }

    fn declared(&self, ty: &ResourceType) -> (String, usize) {
        match ty.cache() {
            Some(decl) => (
                decl.name.clone().unwrap_or_else(|| COMMON_CACHE.to_string()),
                decl.capacity.unwrap_or(self.default_capacity),
            ),
            None => (INTERMEDIATE_CACHE.to_string(), usize::MAX),
        }
    }

    fn active(&self, name: &str) -> bool {
        !self.caching_disabled || name == INTERMEDIATE_CACHE
    }

    /// Resolve (and lazily create) the cache for `ty`.
    pub fn cache_for(&self, ty: &ResourceType) -> CacheInfo {
        let (name, capacity) = self.declared(ty);
        let mut state = self.state.lock();
        let cache = state.cache_mut(&name, capacity);
        CacheInfo {
            name,
            capacity: cache.capacity(),
        }
    }

    /// Look up `locator` in the cache for `ty`, counting a hit or miss.
    pub fn get(&self, locator: &ResourceLocator, ty: &ResourceType) -> Option<Node> {
        let (name, capacity) = self.declared(ty);
        if !self.active(&name) {
            return None;
        }

        let mut state = self.state.lock();
        let found = state.cache_mut(&name, capacity).get(locator);
        let counter = if found.is_some() {
            &mut state.stats.hits
        } else {
            &mut state.stats.misses
        };
        *counter.entry(name.clone()).or_insert(0) += 1;

        tracing::trace!(cache = %name, locator = %locator, hit = found.is_some(), "Cache probe");
        found
    }

    /// Store `node` under `locator` in the cache for `ty`.
    pub fn put(&self, locator: ResourceLocator, node: Node, ty: &ResourceType) {
        let (name, capacity) = self.declared(ty);
        if !self.active(&name) {
            return;
        }
        self.state.lock().cache_mut(&name, capacity).put(locator, node);
    }

    /// Evict `locator` from the cache for `ty` if it still holds `node`.
    ///
    /// Used to drop resources left incomplete by an aborted resolve. Does not
    /// count as a hit or miss.
    pub fn evict(&self, locator: &ResourceLocator, node: &Node, ty: &ResourceType) -> bool {
        let (name, _) = self.declared(ty);
        if !self.active(&name) {
            return false;
        }
        let mut state = self.state.lock();
        let removed = state
            .caches
            .get_mut(&name)
            .map(|cache| cache.remove_instance(locator, node))
            .unwrap_or(false);
        if removed {
            tracing::debug!(cache = %name, locator = %locator, "Evicted incomplete resource");
        }
        removed
    }

    /// Clear one cache, optionally resetting its counters.
    pub fn clear(&self, name: &str, reset_stats: bool) {
        let mut state = self.state.lock();
        if let Some(cache) = state.caches.get_mut(name) {
            cache.clear();
        }
        if reset_stats {
            state.stats.hits.remove(name);
            state.stats.misses.remove(name);
        }
    }

    /// Clear every cache, optionally resetting all counters.
    pub fn clear_all(&self, reset_stats: bool) {
        let mut state = self.state.lock();
        for cache in state.caches.values_mut() {
            cache.clear();
        }
        if reset_stats {
            state.stats = CacheStatistics::default();
        }
    }

    /// Reset counters without touching cached entries.
    pub fn reset_statistics(&self) {
        self.state.lock().stats = CacheStatistics::default();
    }

    /// Clear the traversal-scoped cache.
    pub fn clear_intermediate(&self) {
        if let Some(cache) = self.state.lock().caches.get_mut(INTERMEDIATE_CACHE) {
            cache.clear();
        }
    }

    /// Number of entries in the named cache (0 if it does not exist).
    pub fn count_for(&self, name: &str) -> usize {
        self.state
            .lock()
            .caches
            .get(name)
            .map(BoundedCache::size)
            .unwrap_or(0)
    }

    /// Names of caches created so far, sorted.
    pub fn cache_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.state.lock().caches.keys().cloned().collect();
        names.sort();
        names
    }

    /// Snapshot of hit/miss counters.
    pub fn statistics(&self) -> CacheStatistics {
        self.state.lock().stats.clone()
    }
}
