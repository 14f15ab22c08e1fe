//! Shared resource handles and relation containers.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

/// Handle to a resolved resource.
///
/// One logical resource is represented by exactly one `Shared` allocation
/// while it stays cached; compare handles with [`Arc::ptr_eq`].
pub type Shared<T> = Arc<RwLock<T>>;

/// Container shape for a collection relation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ContainerKind {
    /// Ordered list, duplicates allowed.
    #[default]
    List,
    /// Set by instance identity, insertion-ordered.
    Set,
    /// FIFO queue.
    Queue,
}

impl fmt::Display for ContainerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::List => write!(f, "list"),
            Self::Set => write!(f, "set"),
            Self::Queue => write!(f, "queue"),
        }
    }
}

#[derive(Debug)]
enum Items<T> {
    List(Vec<Shared<T>>),
    Set(Vec<Shared<T>>),
    Queue(VecDeque<Shared<T>>),
}

/// Collection-valued relation field.
///
/// Clones share storage, so an accumulator handed to a field keeps
/// receiving elements appended after the assignment.
pub struct RelatedCollection<T> {
    kind: ContainerKind,
    items: Arc<RwLock<Items<T>>>,
}

impl<T> RelatedCollection<T> {
    /// Create an empty collection of the given shape.
    pub fn new(kind: ContainerKind) -> Self {
        let items = match kind {
            ContainerKind::List => Items::List(Vec::new()),
            ContainerKind::Set => Items::Set(Vec::new()),
            ContainerKind::Queue => Items::Queue(VecDeque::new()),
        };
        Self {
            kind,
            items: Arc::new(RwLock::new(items)),
        }
    }

    /// Container shape.
    pub fn kind(&self) -> ContainerKind {
        self.kind
    }

    /// Append an element. A set ignores an instance it already holds.
    ///
    /// Returns whether the element was added.
    pub fn push(&self, item: Shared<T>) -> bool {
        let mut items = self.items.write();
        match &mut *items {
            Items::List(v) => v.push(item),
            Items::Set(v) => {
                if v.iter().any(|existing| Arc::ptr_eq(existing, &item)) {
                    return false;
                }
                v.push(item);
            }
            Items::Queue(q) => q.push_back(item),
        }
        true
    }

    /// Remove the oldest element. Only meaningful for queues; lists and sets
    /// remove their first element.
    pub fn pop_front(&self) -> Option<Shared<T>> {
        let mut items = self.items.write();
        match &mut *items {
            Items::List(v) | Items::Set(v) => {
                if v.is_empty() {
                    None
                } else {
                    Some(v.remove(0))
                }
            }
            Items::Queue(q) => q.pop_front(),
        }
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        match &*self.items.read() {
            Items::List(v) | Items::Set(v) => v.len(),
            Items::Queue(q) => q.len(),
        }
    }

    /// Whether the collection is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Element at `index`, in container order.
    pub fn get(&self, index: usize) -> Option<Shared<T>> {
        match &*self.items.read() {
            Items::List(v) | Items::Set(v) => v.get(index).cloned(),
            Items::Queue(q) => q.get(index).cloned(),
        }
    }

    /// Snapshot of the current elements.
    pub fn to_vec(&self) -> Vec<Shared<T>> {
        match &*self.items.read() {
            Items::List(v) | Items::Set(v) => v.clone(),
            Items::Queue(q) => q.iter().cloned().collect(),
        }
    }

    /// Whether this exact instance is held.
    pub fn contains(&self, item: &Shared<T>) -> bool {
        self.to_vec().iter().any(|existing| Arc::ptr_eq(existing, item))
    }

    /// Whether two handles share storage.
    pub fn same_collection(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.items, &other.items)
    }
}

impl<T> Clone for RelatedCollection<T> {
    fn clone(&self) -> Self {
        Self {
            kind: self.kind,
            items: Arc::clone(&self.items),
        }
    }
}

impl<T> Default for RelatedCollection<T> {
    fn default() -> Self {
        Self::new(ContainerKind::default())
    }
}

impl<T> fmt::Debug for RelatedCollection<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RelatedCollection")
            .field("kind", &self.kind)
            .field("len", &self.len())
            .finish()
    }
}
