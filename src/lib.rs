//! # hal-graph
//!
//! Identity-preserving resolution of HAL resource graphs.
//!
//! The resolver answers one question:
//!
//! > Given a resource locator and a target type, what is the fully linked
//! > object graph reachable from it?
//!
//! ## Core Contract
//!
//! 1. One logical resource is represented by exactly one in-memory instance
//!    while it stays cached
//! 2. Within one resolve, no locator is fetched more than once
//! 3. Back-references to resources still under construction are deferred and
//!    written once those resources complete, so cyclic graphs terminate
//!
//! ## Architecture
//!
//! ```text
//! resolve(locator) → CacheRegistry ─hit──────────────────────────→ Shared<T>
//!                        │ miss
//!                        ↓
//!                    Transport → HalDocument → RelationResolver → recurse / defer
//!                                                      ↓
//!                                    CacheRegistry ← reconcile deferred writes
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod types;
pub mod schema;
pub mod cache;
pub mod transport;
pub mod context;
pub mod engine;
pub mod session;
pub mod config;
pub mod logging;

// Re-exports
pub use types::{
    ResourceLocator, LocatorError, RelationLink, HalDocument, DocumentError, SELF_RELATION,
    Shared, RelatedCollection, ContainerKind,
};
pub use schema::{
    ResourceSchema, ResourceType, SchemaRegistry, CacheDeclaration,
    RelationResolver, BindingResolver, ResolverMode, RelationSlot, BindingError,
};
pub use cache::{BoundedCache, CacheRegistry, CacheStatistics, COMMON_CACHE, INTERMEDIATE_CACHE};
pub use transport::{Transport, FetchError, InMemoryTransport};
#[cfg(feature = "http")]
pub use transport::{HttpTransport, HttpTransportConfig};
pub use context::TraversalContext;
pub use engine::{GraphResolver, ResolveError};
pub use session::{Session, Statistics};
pub use config::{ResolverConfig, ConfigError, DEFAULT_CACHE_CAPACITY};
pub use logging::{init_tracing, LogFormat};
