//! Resource schemas: registration tables describing how decoded resources
//! are built and which fields their relations populate.

pub mod binding;
pub mod resource;
pub mod resolver;

pub use binding::{
    Node, Accumulator, BindingError, BindingShape, CollectionOps, ElementType,
    RelationBinding, RelationSlot,
};
pub use resource::{CacheDeclaration, ResourceSchema, ResourceType, SchemaRegistry};
pub use resolver::{BindingResolver, RelationResolver, ResolverMode};
