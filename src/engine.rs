//! Graph resolution engine.
//!
//! Resolves a resource and, recursively, everything reachable through its
//! mapped links into one identity-preserving object graph.
//!
//! ## Algorithm
//!
//! 1. Probe the cache registry (and resources completed earlier in this
//!    traversal). A hit short-circuits the whole subtree.
//! 2. On a miss, mark the locator in-flight, fetch and decode it.
//! 3. Map every non-`self` link to a slot. Unmapped links are skipped;
//!    array slots fail the resolve before the owner is touched.
//! 4. For each link whose target is in-flight, queue a deferred write.
//!    Otherwise resolve the target recursively and write it immediately.
//!    Collection links accumulate into one container per (owner, relation).
//! 5. Store the linked resource in its cache and mark it complete.
//! 6. At the top level, apply every deferred write, then discard the
//!    traversal context and clear the intermediate cache.
//!
//! If the resolve fails, resources that still wait on a deferred write are
//! evicted again: a cached resource is always fully linked.

use std::collections::HashSet;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::cache::CacheRegistry;
use crate::config::ResolverConfig;
use crate::context::{PendingWrite, TraversalContext};
use crate::schema::{
    BindingError, BindingResolver, BindingShape, ElementType, Node, RelationResolver,
    RelationSlot, ResourceType, SchemaRegistry,
};
use crate::transport::{FetchError, Transport};
use crate::types::{HalDocument, LocatorError, RelationLink, ResourceLocator, Shared};

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Error type for resolution.
///
/// Every variant aborts the whole top-level resolve. Resources completed
/// before the failure stay cached unless a deferred write to them was still
/// pending.
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    /// A resource could not be fetched or decoded.
    #[error("Failed to fetch {locator}: {source}")]
    Fetch {
        /// Failing locator.
        locator: ResourceLocator,
        /// Transport failure.
        #[source]
        source: FetchError,
    },
    /// A link maps onto an array-typed field.
    #[error("Relation '{relation}' on {owner} is array-typed; array relations are not supported")]
    UnsupportedRelation {
        /// Owning resource type.
        owner: String,
        /// Relation name.
        relation: String,
    },
    /// A resolved resource could not be written into its slot.
    #[error("Cannot bind relation '{relation}' on {owner}: {source}")]
    Binding {
        /// Owning resource type.
        owner: String,
        /// Relation name.
        relation: String,
        /// Binding failure.
        #[source]
        source: BindingError,
    },
    /// A requested or related type has no registered schema.
    #[error("Resource type {0} is not registered")]
    UnregisteredType(&'static str),
    /// A resolved resource has a different type than requested.
    #[error("Resource at {locator} is not a {expected}")]
    UnexpectedType {
        /// Locator of the resource.
        locator: ResourceLocator,
        /// Requested Rust type.
        expected: &'static str,
    },
    /// A collection element carries no `self` link.
    #[error("Element {index} of collection {locator} has no self link")]
    MissingSelfLink {
        /// Collection locator.
        locator: ResourceLocator,
        /// Element position.
        index: usize,
    },
    /// A locator could not be parsed.
    #[error(transparent)]
    InvalidLocator(#[from] LocatorError),
}

impl ResolveError {
    fn binding(owner: &ResourceType, slot: &RelationSlot, source: BindingError) -> Self {
        Self::Binding {
            owner: owner.name().to_string(),
            relation: slot.relation.clone(),
            source,
        }
    }
}

/// Resolves HAL resource graphs through a [`Transport`].
///
/// The cache registry is shared by every resolve on this resolver (and by
/// other resolvers given the same registry). Traversal state is per call.
pub struct GraphResolver<T: Transport> {
    transport: Arc<T>,
    schemas: Arc<SchemaRegistry>,
    resolver: Arc<dyn RelationResolver>,
    caches: Arc<CacheRegistry>,
    config: ResolverConfig,
    fetch_count: AtomicU64,
}

impl<T: Transport + 'static> GraphResolver<T> {
    /// Create a resolver.
    ///
    /// Relations are matched by a [`BindingResolver`] in the mode implied by
    /// `config`.
    pub fn new(transport: Arc<T>, schemas: Arc<SchemaRegistry>, config: ResolverConfig) -> Self {
        let caches = Arc::new(CacheRegistry::new(
            config.default_cache_capacity,
            config.caching_disabled,
        ));
        Self {
            transport,
            schemas,
            resolver: Arc::new(BindingResolver::new(config.resolver_mode())),
            caches,
            config,
            fetch_count: AtomicU64::new(0),
        }
    }

    /// Replace the relation resolver.
    pub fn with_resolver(mut self, resolver: Arc<dyn RelationResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    /// Use an existing cache registry.
    pub fn with_cache_registry(mut self, caches: Arc<CacheRegistry>) -> Self {
        self.caches = caches;
        self
    }

    /// Resolve the resource at `locator` as an `R`, following its links.
    pub async fn resolve<R>(&self, locator: &ResourceLocator) -> Result<Shared<R>, ResolveError>
    where
        R: Send + Sync + 'static,
    {
        let ty = self.resource_type(ElementType::of::<R>())?;
        let mut ctx = TraversalContext::new();

        let result = match self.resolve_node(locator.clone(), ty, &mut ctx, 0).await {
            Ok(node) => self.reconcile(&ctx).map(|()| node),
            Err(e) => Err(e),
        };
        if result.is_err() {
            self.evict_incomplete(&ctx);
        }
        self.finish(&mut ctx);

        downcast::<R>(locator, result?)
    }

    /// Resolve a root-level collection endpoint whose elements are `R`s.
    pub async fn resolve_collection<R>(
        &self,
        locator: &ResourceLocator,
    ) -> Result<Vec<Shared<R>>, ResolveError>
    where
        R: Send + Sync + 'static,
    {
        let ty = self.resource_type(ElementType::of::<R>())?;
        let mut ctx = TraversalContext::new();

        let result = match self.resolve_elements(locator, ty, &mut ctx).await {
            Ok(nodes) => self.reconcile(&ctx).map(|()| nodes),
            Err(e) => Err(e),
        };
        if result.is_err() {
            self.evict_incomplete(&ctx);
        }
        self.finish(&mut ctx);

        result?
            .into_iter()
            .map(|(element, node)| downcast::<R>(&element, node))
            .collect()
    }

    /// Number of transport fetches performed.
    pub fn fetch_count(&self) -> u64 {
        self.fetch_count.load(Ordering::Relaxed)
    }

    /// Reset the fetch counter.
    pub fn reset_fetch_count(&self) {
        self.fetch_count.store(0, Ordering::Relaxed);
    }

    /// The cache registry.
    pub fn caches(&self) -> &Arc<CacheRegistry> {
        &self.caches
    }

    /// The schema registry.
    pub fn schemas(&self) -> &Arc<SchemaRegistry> {
        &self.schemas
    }

    /// The configuration.
    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// The transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    fn resource_type(&self, element: ElementType) -> Result<Arc<ResourceType>, ResolveError> {
        self.schemas
            .get(element.type_id)
            .ok_or(ResolveError::UnregisteredType(element.type_name))
    }

    fn resolve_node<'a>(
        &'a self,
        locator: ResourceLocator,
        ty: Arc<ResourceType>,
        ctx: &'a mut TraversalContext,
        depth: usize,
    ) -> BoxFuture<'a, Result<Node, ResolveError>> {
        Box::pin(async move {
            if let Some(node) = self.caches.get(&locator, &ty) {
                tracing::trace!(locator = %locator, depth, "Cache hit");
                return Ok(node);
            }
            if let Some(node) = ctx.completed(&locator) {
                return Ok(node);
            }

            self.fetch_count.fetch_add(1, Ordering::Relaxed);
            ctx.begin(&locator);
            tracing::debug!(locator = %locator, resource = %ty.name(), depth, "Fetching");

            let document = self
                .transport
                .fetch(&locator)
                .await
                .map_err(|source| ResolveError::Fetch {
                    locator: locator.clone(),
                    source,
                })?;

            self.populate(locator, ty, document, ctx, depth).await
        })
    }

    async fn populate(
        &self,
        locator: ResourceLocator,
        ty: Arc<ResourceType>,
        document: HalDocument,
        ctx: &mut TraversalContext,
        depth: usize,
    ) -> Result<Node, ResolveError> {
        let node = ty
            .decode(document.state)
            .map_err(|reason| ResolveError::Fetch {
                locator: locator.clone(),
                source: FetchError::Decode(format!("{} as {}", reason, ty.name())),
            })?;

        self.follow_links(&locator, &ty, &node, &document.links, ctx, depth)
            .await?;

        self.caches.put(locator.clone(), Arc::clone(&node), &ty);
        ctx.complete(&locator, Arc::clone(&node));
        Ok(node)
    }

    async fn follow_links(
        &self,
        owner: &ResourceLocator,
        ty: &Arc<ResourceType>,
        node: &Node,
        links: &[RelationLink],
        ctx: &mut TraversalContext,
        depth: usize,
    ) -> Result<(), ResolveError> {
        // Links are followed once per locator: a second visit would need a
        // second fetch, which the completed map rules out.
        let first_visit = ctx.mark_visited(owner);
        debug_assert!(first_visit, "links of {owner} followed twice");

        // Map every link before writing anything, so an array slot leaves
        // the owner untouched.
        let mut seen: HashSet<(&str, &ResourceLocator)> = HashSet::new();
        let mut plan: Vec<(RelationSlot, &ResourceLocator)> = Vec::new();
        for link in links.iter().filter(|l| !l.is_self()) {
            if !seen.insert((link.name.as_str(), &link.target)) {
                continue;
            }
            let Some(slot) = self.resolver.resolve_slot(ty, &link.name) else {
                tracing::warn!(
                    resource = %ty.name(),
                    relation = %link.name,
                    "No slot for relation; skipping link"
                );
                continue;
            };
            if slot.is_array() {
                return Err(ResolveError::UnsupportedRelation {
                    owner: ty.name().to_string(),
                    relation: link.name.clone(),
                });
            }
            plan.push((slot, &link.target));
        }

        let mut i = 0;
        while i < plan.len() {
            let (slot, target) = &plan[i];
            if slot.is_collection() {
                // One relation occurrence: the run of consecutive links sharing its name.
                let mut end = i + 1;
                while end < plan.len() && plan[end].0.relation == slot.relation {
                    end += 1;
                }
                let targets: Vec<&ResourceLocator> = plan[i..end].iter().map(|(_, t)| *t).collect();
                self.handle_collection(owner, ty, node, slot, &targets, ctx, depth)
                    .await?;
                i = end;
            } else {
                self.handle_single(owner, ty, node, slot, target, ctx, depth).await?;
                i += 1;
            }
        }
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    async fn handle_single(
        &self,
        owner: &ResourceLocator,
        ty: &Arc<ResourceType>,
        node: &Node,
        slot: &RelationSlot,
        target: &ResourceLocator,
        ctx: &mut TraversalContext,
        depth: usize,
    ) -> Result<(), ResolveError> {
        let BindingShape::Single { assign } = &slot.binding.shape else {
            return Ok(());
        };

        if ctx.is_in_flight(target) {
            tracing::debug!(target = %target, relation = %slot.relation, "Deferring back-reference");
            ctx.defer(
                target,
                PendingWrite::Assign {
                    owner: Arc::clone(node),
                    owner_locator: owner.clone(),
                    owner_type: Arc::clone(ty),
                    slot: slot.clone(),
                },
            );
            return Ok(());
        }

        let element_ty = self.resource_type(slot.element())?;
        let value = self
            .resolve_node(target.clone(), element_ty, ctx, depth + 1)
            .await?;
        assign(node, &value).map_err(|e| ResolveError::binding(ty, slot, e))
    }

    #[allow(clippy::too_many_arguments)]
    async fn handle_collection(
        &self,
        owner: &ResourceLocator,
        ty: &Arc<ResourceType>,
        node: &Node,
        slot: &RelationSlot,
        targets: &[&ResourceLocator],
        ctx: &mut TraversalContext,
        depth: usize,
    ) -> Result<(), ResolveError> {
        let BindingShape::Collection { kind, ops } = &slot.binding.shape else {
            return Ok(());
        };

        let accumulator = ctx.accumulator(owner, &slot.relation, || ops.new_accumulator(*kind));
        let element_ty = self.resource_type(slot.element())?;

        for target in targets {
            if ctx.is_in_flight(target) {
                tracing::debug!(target = %target, relation = %slot.relation, "Deferring collection append");
                ctx.defer(
                    target,
                    PendingWrite::Append {
                        accumulator: Arc::clone(&accumulator),
                        owner_locator: owner.clone(),
                        owner_type: Arc::clone(ty),
                        slot: slot.clone(),
                    },
                );
                continue;
            }
            let value = self
                .resolve_node((*target).clone(), Arc::clone(&element_ty), ctx, depth + 1)
                .await?;
            ops.append(&accumulator, &value)
                .map_err(|e| ResolveError::binding(ty, slot, e))?;
        }

        ops.assign(node, &accumulator)
            .map_err(|e| ResolveError::binding(ty, slot, e))
    }

    async fn resolve_elements(
        &self,
        locator: &ResourceLocator,
        ty: Arc<ResourceType>,
        ctx: &mut TraversalContext,
    ) -> Result<Vec<(ResourceLocator, Node)>, ResolveError> {
        self.fetch_count.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(locator = %locator, resource = %ty.name(), "Fetching collection");

        let documents = self
            .transport
            .fetch_collection(locator)
            .await
            .map_err(|source| ResolveError::Fetch {
                locator: locator.clone(),
                source,
            })?;

        let mut nodes = Vec::with_capacity(documents.len());
        for (index, document) in documents.into_iter().enumerate() {
            let element = document
                .self_locator()
                .cloned()
                .ok_or_else(|| ResolveError::MissingSelfLink {
                    locator: locator.clone(),
                    index,
                })?;

            let existing = self
                .caches
                .get(&element, &ty)
                .or_else(|| ctx.completed(&element));
            let node = match existing {
                Some(node) => node,
                None => {
                    ctx.begin(&element);
                    self.populate(element.clone(), Arc::clone(&ty), document, ctx, 1)
                        .await?
                }
            };
            nodes.push((element, node));
        }
        Ok(nodes)
    }

    fn reconcile(&self, ctx: &TraversalContext) -> Result<(), ResolveError> {
        for (target, writes) in ctx.deferred() {
            // Every deferred target was in flight, so it completed before the
            // top-level resolve returned successfully.
            let value = ctx.completed(target);
            debug_assert!(value.is_some(), "deferred target {target} never completed");
            let Some(value) = value else {
                continue;
            };

            for write in writes {
                match write {
                    PendingWrite::Assign {
                        owner,
                        owner_type,
                        slot,
                        ..
                    } => {
                        if let BindingShape::Single { assign } = &slot.binding.shape {
                            assign(owner, &value)
                                .map_err(|e| ResolveError::binding(owner_type, slot, e))?;
                        }
                    }
                    PendingWrite::Append {
                        accumulator,
                        owner_type,
                        slot,
                        ..
                    } => {
                        if let BindingShape::Collection { ops, .. } = &slot.binding.shape {
                            ops.append(accumulator, &value)
                                .map_err(|e| ResolveError::binding(owner_type, slot, e))?;
                        }
                    }
                }
            }
        }
        Ok(())
    }

    fn evict_incomplete(&self, ctx: &TraversalContext) {
        for (owner, ty) in ctx.pending_owners() {
            if let Some(node) = ctx.completed(&owner) {
                self.caches.evict(&owner, &node, &ty);
            }
        }
    }

    fn finish(&self, ctx: &mut TraversalContext) {
        ctx.clear();
        self.caches.clear_intermediate();
    }
}

fn downcast<R: Send + Sync + 'static>(
    locator: &ResourceLocator,
    node: Node,
) -> Result<Shared<R>, ResolveError> {
    node.downcast::<RwLock<R>>()
        .map_err(|_| ResolveError::UnexpectedType {
            locator: locator.clone(),
            expected: std::any::type_name::<R>(),
        })
}
