//! Per-resolution traversal state.
//!
//! A fresh [`TraversalContext`] is created for every top-level resolve and
//! passed by `&mut` through the recursion, so concurrent resolutions never
//! share it.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use crate::schema::{Accumulator, Node, RelationSlot, ResourceType};
use crate::types::ResourceLocator;

/// A write that waits for a resource still under construction.
#[derive(Debug, Clone)]
pub enum PendingWrite {
    /// Assign the resource to a single-valued slot on `owner`.
    Assign {
        /// Resource whose field receives the value.
        owner: Node,
        /// Locator of the owner.
        owner_locator: ResourceLocator,
        /// Owner's type.
        owner_type: Arc<ResourceType>,
        /// Target slot.
        slot: RelationSlot,
    },
    /// Append the resource to a collection accumulator.
    Append {
        /// Accumulator already assigned to the owner's field.
        accumulator: Accumulator,
        /// Locator of the owner.
        owner_locator: ResourceLocator,
        /// Owner's type.
        owner_type: Arc<ResourceType>,
        /// Collection slot the accumulator belongs to.
        slot: RelationSlot,
    },
}

impl PendingWrite {
    /// Locator of the resource this write completes.
    pub fn owner_locator(&self) -> &ResourceLocator {
        match self {
            Self::Assign { owner_locator, .. } | Self::Append { owner_locator, .. } => owner_locator,
        }
    }

    /// Type of the resource this write completes.
    pub fn owner_type(&self) -> &Arc<ResourceType> {
        match self {
            Self::Assign { owner_type, .. } | Self::Append { owner_type, .. } => owner_type,
        }
    }
}

/// Traversal state for one top-level resolve.
#[derive(Default)]
pub struct TraversalContext {
    /// Resources whose links have been followed.
    visited: HashSet<ResourceLocator>,
    /// Resources fetched but not yet fully linked.
    in_flight: HashSet<ResourceLocator>,
    /// Writes waiting on an in-flight resource, keyed by that resource.
    deferred: BTreeMap<ResourceLocator, Vec<PendingWrite>>,
    /// Collection accumulators by (owner, relation).
    accumulators: HashMap<(ResourceLocator, String), Accumulator>,
    /// Resources completed during this traversal.
    completed: HashMap<ResourceLocator, Node>,
}

impl TraversalContext {
    /// Create an empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `locator` as being fetched and populated.
    pub fn begin(&mut self, locator: &ResourceLocator) {
        self.in_flight.insert(locator.clone());
    }

    /// Whether `locator` is under construction.
    pub fn is_in_flight(&self, locator: &ResourceLocator) -> bool {
        self.in_flight.contains(locator)
    }

    /// Record that the links of `locator` are being followed.
    ///
    /// Returns `false` if they already were.
    pub fn mark_visited(&mut self, locator: &ResourceLocator) -> bool {
        self.visited.insert(locator.clone())
    }

    /// Queue a write until `target` completes.
    pub fn defer(&mut self, target: &ResourceLocator, write: PendingWrite) {
        self.deferred.entry(target.clone()).or_default().push(write);
    }

    /// Number of queued writes.
    pub fn deferred_len(&self) -> usize {
        self.deferred.values().map(Vec::len).sum()
    }

    /// The accumulator for `relation` on `owner`, created on first use.
    pub fn accumulator<F>(&mut self, owner: &ResourceLocator, relation: &str, create: F) -> Accumulator
    where
        F: FnOnce() -> Accumulator,
    {
        self.accumulators
            .entry((owner.clone(), relation.to_string()))
            .or_insert_with(create)
            .clone()
    }

    /// Mark `locator` as fully linked.
    pub fn complete(&mut self, locator: &ResourceLocator, node: Node) {
        self.in_flight.remove(locator);
        self.completed.insert(locator.clone(), node);
    }

    /// Resource completed earlier in this traversal.
    pub fn completed(&self, locator: &ResourceLocator) -> Option<Node> {
        self.completed.get(locator).cloned()
    }

    /// Queued writes, ordered by target locator.
    pub fn deferred(&self) -> impl Iterator<Item = (&ResourceLocator, &[PendingWrite])> {
        self.deferred.iter().map(|(target, writes)| (target, writes.as_slice()))
    }

    /// Owners that still wait on a queued write, each listed once.
    pub fn pending_owners(&self) -> Vec<(ResourceLocator, Arc<ResourceType>)> {
        let mut seen = HashSet::new();
        self.deferred
            .values()
            .flatten()
            .filter(|write| seen.insert(write.owner_locator().clone()))
            .map(|write| (write.owner_locator().clone(), Arc::clone(write.owner_type())))
            .collect()
    }

    /// Discard all state.
    pub fn clear(&mut self) {
        self.visited.clear();
        self.in_flight.clear();
        self.deferred.clear();
        self.accumulators.clear();
        self.completed.clear();
    }

    /// Whether the context holds no state.
    pub fn is_empty(&self) -> bool {
        self.visited.is_empty()
            && self.in_flight.is_empty()
            && self.deferred.is_empty()
            && self.accumulators.is_empty()
            && self.completed.is_empty()
    }
}

impl std::fmt::Debug for TraversalContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TraversalContext")
            .field("visited", &self.visited.len())
            .field("in_flight", &self.in_flight.len())
            .field("deferred", &self.deferred_len())
            .field("accumulators", &self.accumulators.len())
            .field("completed", &self.completed.len())
            .finish()
    }
}
