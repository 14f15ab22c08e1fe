//! Core value types: locators, links, documents and relation containers.

pub mod locator;
pub mod link;
pub mod collection;

pub use locator::{ResourceLocator, LocatorError};
pub use link::{RelationLink, HalDocument, DocumentError, SELF_RELATION};
pub use collection::{Shared, RelatedCollection, ContainerKind};
