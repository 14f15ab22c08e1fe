//! Type-erased relation bindings.
//!
//! A binding describes one relation-valued field of a resource type and
//! carries the closures that write resolved resources into it. Bindings are
//! built from typed setters by [`ResourceSchema`](super::ResourceSchema), so
//! the engine never needs to know the concrete field types.

use parking_lot::RwLock;
use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;

use crate::types::{ContainerKind, RelatedCollection, Shared};

/// Type-erased resolved resource. The concrete type is always `RwLock<T>`.
pub type Node = Arc<dyn Any + Send + Sync>;

/// Type-erased collection accumulator. The concrete type is `RelatedCollection<U>`.
pub type Accumulator = Arc<dyn Any + Send + Sync>;

type AssignFn = dyn Fn(&Node, &Node) -> Result<(), BindingError> + Send + Sync;
type AppendFn = dyn Fn(&Accumulator, &Node) -> Result<(), BindingError> + Send + Sync;
type AssignCollectionFn = dyn Fn(&Node, &Accumulator) -> Result<(), BindingError> + Send + Sync;
type NewAccumulatorFn = dyn Fn(ContainerKind) -> Accumulator + Send + Sync;

/// Failure to write a value into a relation slot.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BindingError {
    /// Owner or value had a different concrete type than the binding expects.
    #[error("Type mismatch: expected {expected}")]
    TypeMismatch {
        /// Rust type the binding was registered for.
        expected: &'static str,
    },
}

/// Identity of the element type a relation points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ElementType {
    /// `TypeId` of the element resource type.
    pub type_id: TypeId,
    /// Rust type name, for diagnostics.
    pub type_name: &'static str,
}

impl ElementType {
    /// Element type of `U`.
    pub fn of<U: 'static>() -> Self {
        Self {
            type_id: TypeId::of::<U>(),
            type_name: std::any::type_name::<U>(),
        }
    }
}

/// Collection operations for one element type.
#[derive(Clone)]
pub struct CollectionOps {
    new_accumulator: Arc<NewAccumulatorFn>,
    append: Arc<AppendFn>,
    assign: Arc<AssignCollectionFn>,
}

impl CollectionOps {
    /// Create an empty accumulator of the given shape.
    pub fn new_accumulator(&self, kind: ContainerKind) -> Accumulator {
        (self.new_accumulator)(kind)
    }

    /// Append a resolved element to an accumulator.
    pub fn append(&self, accumulator: &Accumulator, element: &Node) -> Result<(), BindingError> {
        (self.append)(accumulator, element)
    }

    /// Store an accumulator into the owning resource's field.
    pub fn assign(&self, owner: &Node, accumulator: &Accumulator) -> Result<(), BindingError> {
        (self.assign)(owner, accumulator)
    }
}

/// Shape of a relation field.
#[derive(Clone)]
pub enum BindingShape {
    /// Single-valued reference.
    Single {
        /// Writes the resolved target into the owner.
        assign: Arc<AssignFn>,
    },
    /// Collection of references.
    Collection {
        /// Container shape created for the accumulator.
        kind: ContainerKind,
        /// Accumulator operations.
        ops: CollectionOps,
    },
    /// Fixed array field. Declared so it can be rejected; never populated.
    Array,
}

impl fmt::Debug for BindingShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Single { .. } => write!(f, "Single"),
            Self::Collection { kind, .. } => write!(f, "Collection({kind})"),
            Self::Array => write!(f, "Array"),
        }
    }
}

/// One relation-valued field of a resource type.
#[derive(Debug, Clone)]
pub struct RelationBinding {
    /// Field name.
    pub field: String,
    /// Explicitly declared relation name, if any.
    pub relation: Option<String>,
    /// Resource type the relation points at.
    pub element: ElementType,
    /// Field shape.
    pub shape: BindingShape,
}

impl RelationBinding {
    pub(crate) fn single<T, U, F>(field: String, setter: F) -> Self
    where
        T: Send + Sync + 'static,
        U: Send + Sync + 'static,
        F: Fn(&mut T, Shared<U>) + Send + Sync + 'static,
    {
        let assign = move |owner: &Node, value: &Node| -> Result<(), BindingError> {
            let owner = downcast_node::<T>(owner)?;
            let value = Arc::clone(value)
                .downcast::<RwLock<U>>()
                .map_err(|_| mismatch::<U>())?;
            setter(&mut owner.write(), value);
            Ok(())
        };
        Self {
            field,
            relation: None,
            element: ElementType::of::<U>(),
            shape: BindingShape::Single {
                assign: Arc::new(assign),
            },
        }
    }

    pub(crate) fn collection<T, U, F>(field: String, kind: ContainerKind, setter: F) -> Self
    where
        T: Send + Sync + 'static,
        U: Send + Sync + 'static,
        F: Fn(&mut T, RelatedCollection<U>) + Send + Sync + 'static,
    {
        let new_accumulator =
            |kind: ContainerKind| -> Accumulator { Arc::new(RelatedCollection::<U>::new(kind)) };
        let append = |accumulator: &Accumulator, element: &Node| -> Result<(), BindingError> {
            let collection = accumulator
                .downcast_ref::<RelatedCollection<U>>()
                .ok_or_else(mismatch::<RelatedCollection<U>>)?;
            let element = Arc::clone(element)
                .downcast::<RwLock<U>>()
                .map_err(|_| mismatch::<U>())?;
            collection.push(element);
            Ok(())
        };
        let assign = move |owner: &Node, accumulator: &Accumulator| -> Result<(), BindingError> {
            let owner = downcast_node::<T>(owner)?;
            let collection = accumulator
                .downcast_ref::<RelatedCollection<U>>()
                .ok_or_else(mismatch::<RelatedCollection<U>>)?;
            setter(&mut owner.write(), collection.clone());
            Ok(())
        };
        Self {
            field,
            relation: None,
            element: ElementType::of::<U>(),
            shape: BindingShape::Collection {
                kind,
                ops: CollectionOps {
                    new_accumulator: Arc::new(new_accumulator),
                    append: Arc::new(append),
                    assign: Arc::new(assign),
                },
            },
        }
    }

    pub(crate) fn array<U: 'static>(field: String) -> Self {
        Self {
            field,
            relation: None,
            element: ElementType::of::<U>(),
            shape: BindingShape::Array,
        }
    }
}

/// A binding matched to a relation name by a [`RelationResolver`](super::RelationResolver).
#[derive(Debug, Clone)]
pub struct RelationSlot {
    /// Relation name the slot was matched for.
    pub relation: String,
    /// Matched binding.
    pub binding: Arc<RelationBinding>,
}

impl RelationSlot {
    /// Field the slot writes to.
    pub fn field(&self) -> &str {
        &self.binding.field
    }

    /// Element type of the relation.
    pub fn element(&self) -> ElementType {
        self.binding.element
    }

    /// Whether the slot is collection-valued.
    pub fn is_collection(&self) -> bool {
        matches!(self.binding.shape, BindingShape::Collection { .. })
    }

    /// Whether the slot is an array field.
    pub fn is_array(&self) -> bool {
        matches!(self.binding.shape, BindingShape::Array)
    }
}

fn downcast_node<T: Send + Sync + 'static>(node: &Node) -> Result<&RwLock<T>, BindingError> {
    node.downcast_ref::<RwLock<T>>().ok_or_else(mismatch::<T>)
}

fn mismatch<T>() -> BindingError {
    BindingError::TypeMismatch {
        expected: std::any::type_name::<T>(),
    }
}
