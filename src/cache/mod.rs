//! Resource caches.

pub mod bounded;
pub mod registry;

pub use bounded::BoundedCache;
pub use registry::{CacheInfo, CacheRegistry, CacheStatistics, COMMON_CACHE, INTERMEDIATE_CACHE};
