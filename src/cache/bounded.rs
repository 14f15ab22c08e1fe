//! Capacity-limited, access-ordered resource cache.

use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::Arc;

use crate::schema::Node;
use crate::types::ResourceLocator;

/// Named LRU cache of resolved resources.
///
/// Both [`get`](Self::get) and [`put`](Self::put) refresh recency. Inserting
/// past capacity evicts exactly one entry, the least recently touched.
pub struct BoundedCache {
    name: String,
    entries: LruCache<ResourceLocator, Node>,
}

impl BoundedCache {
    /// Create a cache holding at most `capacity` entries (minimum 1).
    pub fn new(name: impl Into<String>, capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            name: name.into(),
            entries: LruCache::new(capacity),
        }
    }

    /// Create a cache without a capacity limit.
    pub fn unbounded(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: LruCache::unbounded(),
        }
    }

    /// Cache name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Maximum number of entries.
    pub fn capacity(&self) -> usize {
        self.entries.cap().get()
    }

    /// Look up a resource, marking it most recently used.
    pub fn get(&mut self, locator: &ResourceLocator) -> Option<Node> {
        self.entries.get(locator).cloned()
    }

    /// Store a resource, marking it most recently used.
    ///
    /// Returns the evicted entry, if the insert pushed one out.
    pub fn put(&mut self, locator: ResourceLocator, node: Node) -> Option<(ResourceLocator, Node)> {
        let evicted = self.entries.push(locator, node);
        // `push` also hands back the old value when the key was already present.
        match evicted {
            Some((key, value)) if !self.entries.contains(&key) => {
                tracing::trace!(cache = %self.name, locator = %key, "Evicted");
                Some((key, value))
            }
            _ => None,
        }
    }

    /// Remove `locator` if it still maps to `node`.
    ///
    /// Returns whether the entry was removed. Recency of other entries is
    /// untouched.
    pub fn remove_instance(&mut self, locator: &ResourceLocator, node: &Node) -> bool {
        match self.entries.peek(locator) {
            Some(cached) if Arc::ptr_eq(cached, node) => {
                self.entries.pop(locator);
                true
            }
            _ => false,
        }
    }

    /// Number of cached entries.
    pub fn size(&self) -> usize {
        self.entries.len()
    }

    /// Remove every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl std::fmt::Debug for BoundedCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoundedCache")
            .field("name", &self.name)
            .field("size", &self.entries.len())
            .field("capacity", &self.entries.cap())
            .finish()
    }
}
