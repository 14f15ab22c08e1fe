//! Resource type descriptors and their registry.

use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::any::TypeId;
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use super::binding::{Node, RelationBinding};
use crate::types::{ContainerKind, RelatedCollection, Shared};

type DecodeFn = dyn Fn(Value) -> Result<Node, String> + Send + Sync;

/// Caching declared by a resource type.
///
/// A missing name means the common cache; a missing capacity means the
/// configured default.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CacheDeclaration {
    /// Cache name.
    pub name: Option<String>,
    /// Cache capacity.
    pub capacity: Option<usize>,
}

/// Registered description of a resource type.
pub struct ResourceType {
    name: String,
    type_id: TypeId,
    type_name: &'static str,
    cache: Option<CacheDeclaration>,
    decode: Arc<DecodeFn>,
    bindings: Vec<Arc<RelationBinding>>,
}

impl ResourceType {
    /// Registered name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// `TypeId` of the Rust type.
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Rust type name.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Caching declaration, `None` when the type declares none.
    pub fn cache(&self) -> Option<&CacheDeclaration> {
        self.cache.as_ref()
    }

    /// Relation bindings in registration order.
    pub fn bindings(&self) -> &[Arc<RelationBinding>] {
        &self.bindings
    }

    /// Decode resource state into a fresh node.
    pub fn decode(&self, state: Value) -> Result<Node, String> {
        (self.decode)(state)
    }
}

impl fmt::Debug for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceType")
            .field("name", &self.name)
            .field("type_name", &self.type_name)
            .field("cache", &self.cache)
            .field("bindings", &self.bindings)
            .finish()
    }
}

/// Builder for a [`ResourceType`].
///
/// ```rust,ignore
/// let schema = ResourceSchema::<Order>::new("Order")
///     .cache("orders", 100)
///     .single("customer", |o: &mut Order, c| o.customer = Some(c))
///     .rel("customer")
///     .collection("lines", ContainerKind::List, |o: &mut Order, l| o.lines = l)
///     .rel("order-lines");
/// ```
pub struct ResourceSchema<T> {
    name: String,
    cache: Option<CacheDeclaration>,
    decode: Arc<DecodeFn>,
    bindings: Vec<RelationBinding>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> ResourceSchema<T>
where
    T: DeserializeOwned + Send + Sync + 'static,
{
    /// Describe a type decoded from its HAL state with serde.
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_decoder(name, |state| {
            serde_json::from_value::<T>(state).map_err(|e| e.to_string())
        })
    }
}

impl<T> ResourceSchema<T>
where
    T: Send + Sync + 'static,
{
    /// Describe a type with a custom state decoder.
    pub fn with_decoder<F>(name: impl Into<String>, decoder: F) -> Self
    where
        F: Fn(Value) -> Result<T, String> + Send + Sync + 'static,
    {
        let decode = move |state: Value| -> Result<Node, String> {
            let value = decoder(state)?;
            let node: Node = Arc::new(RwLock::new(value));
            Ok(node)
        };
        Self {
            name: name.into(),
            cache: None,
            decode: Arc::new(decode),
            bindings: Vec::new(),
            _marker: PhantomData,
        }
    }

    /// Declare a named cache with an explicit capacity.
    pub fn cache(mut self, name: impl Into<String>, capacity: usize) -> Self {
        self.cache = Some(CacheDeclaration {
            name: Some(name.into()),
            capacity: Some(capacity),
        });
        self
    }

    /// Declare a named cache with the default capacity.
    pub fn cache_named(mut self, name: impl Into<String>) -> Self {
        self.cache = Some(CacheDeclaration {
            name: Some(name.into()),
            capacity: None,
        });
        self
    }

    /// Declare the common cache with an explicit capacity.
    pub fn cache_sized(mut self, capacity: usize) -> Self {
        self.cache = Some(CacheDeclaration {
            name: None,
            capacity: Some(capacity),
        });
        self
    }

    /// Declare the common cache with the default capacity.
    pub fn cacheable(mut self) -> Self {
        self.cache = Some(CacheDeclaration::default());
        self
    }

    /// Add a single-valued relation field.
    pub fn single<U, F>(mut self, field: impl Into<String>, setter: F) -> Self
    where
        U: Send + Sync + 'static,
        F: Fn(&mut T, Shared<U>) + Send + Sync + 'static,
    {
        self.bindings
            .push(RelationBinding::single::<T, U, F>(field.into(), setter));
        self
    }

    /// Add a collection-valued relation field.
    pub fn collection<U, F>(mut self, field: impl Into<String>, kind: ContainerKind, setter: F) -> Self
    where
        U: Send + Sync + 'static,
        F: Fn(&mut T, RelatedCollection<U>) + Send + Sync + 'static,
    {
        self.bindings
            .push(RelationBinding::collection::<T, U, F>(field.into(), kind, setter));
        self
    }

    /// Add an array-typed relation field.
    ///
    /// Array relations are not supported: resolving a link that maps onto
    /// this field fails.
    pub fn array<U: 'static>(mut self, field: impl Into<String>) -> Self {
        self.bindings.push(RelationBinding::array::<U>(field.into()));
        self
    }

    /// Give the most recently added field an explicit relation name.
    pub fn rel(mut self, relation: impl Into<String>) -> Self {
        let relation: String = relation.into();
        match self.bindings.last_mut() {
            Some(binding) => binding.relation = Some(relation),
            None => tracing::warn!(
                resource = %self.name,
                relation = %relation,
                "Relation name declared before any field; ignored"
            ),
        }
        self
    }

    /// Finish the description.
    pub fn build(self) -> ResourceType {
        ResourceType {
            name: self.name,
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
            cache: self.cache,
            decode: self.decode,
            bindings: self.bindings.into_iter().map(Arc::new).collect(),
        }
    }
}

/// Registry of resource types, keyed by Rust type.
#[derive(Debug, Default)]
pub struct SchemaRegistry {
    types: HashMap<TypeId, Arc<ResourceType>>,
}

impl SchemaRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a type, replacing any earlier description of it.
    pub fn register<T: Send + Sync + 'static>(&mut self, schema: ResourceSchema<T>) -> &mut Self {
        let resource = schema.build();
        self.types.insert(resource.type_id, Arc::new(resource));
        self
    }

    /// Builder-style [`register`](Self::register).
    pub fn with<T: Send + Sync + 'static>(mut self, schema: ResourceSchema<T>) -> Self {
        self.register(schema);
        self
    }

    /// Look up a type by `TypeId`.
    pub fn get(&self, type_id: TypeId) -> Option<Arc<ResourceType>> {
        self.types.get(&type_id).cloned()
    }

    /// Look up the description of `T`.
    pub fn get_for<T: 'static>(&self) -> Option<Arc<ResourceType>> {
        self.get(TypeId::of::<T>())
    }

    /// Number of registered types.
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Whether no type is registered.
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}
