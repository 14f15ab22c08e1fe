//! Relation name → field slot resolution.

use super::binding::RelationSlot;
use super::resource::ResourceType;

/// Finds the field a relation populates on a resource type.
///
/// Returning `None` is not an error: unmapped links are skipped.
pub trait RelationResolver: Send + Sync {
    /// Slot on `owner` for `relation`, if any.
    fn resolve_slot(&self, owner: &ResourceType, relation: &str) -> Option<RelationSlot>;
}

/// How [`BindingResolver`] matches relation names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResolverMode {
    /// Only explicitly declared relation names match.
    #[default]
    Declarative,
    /// Declared names are ignored; relation names match field names, either
    /// exactly or after camelCase/kebab-case → snake_case conversion.
    Convention,
}

/// Resolver backed by the bindings registered on each [`ResourceType`].
#[derive(Debug, Clone, Copy, Default)]
pub struct BindingResolver {
    mode: ResolverMode,
}

impl BindingResolver {
    /// Create a resolver in the given mode.
    pub fn new(mode: ResolverMode) -> Self {
        Self { mode }
    }

    /// Matching mode.
    pub fn mode(&self) -> ResolverMode {
        self.mode
    }
}

impl RelationResolver for BindingResolver {
    fn resolve_slot(&self, owner: &ResourceType, relation: &str) -> Option<RelationSlot> {
        let bindings = owner.bindings();
        let matched = match self.mode {
            ResolverMode::Declarative => bindings
                .iter()
                .find(|b| b.relation.as_deref() == Some(relation)),
            ResolverMode::Convention => {
                let snake = to_snake_case(relation);
                bindings
                    .iter()
                    .find(|b| b.field == relation)
                    .or_else(|| bindings.iter().find(|b| b.field == snake))
            }
        }?;

        Some(RelationSlot {
            relation: relation.to_string(),
            binding: matched.clone(),
        })
    }
}

/// `parentCategory` / `parent-category` / `parentID` → `parent_category` /
/// `parent_category` / `parent_id`.
///
/// A word boundary sits before an uppercase letter that follows a lowercase
/// letter or digit, so runs of capitals stay one word.
pub(crate) fn to_snake_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    let mut prev: Option<char> = None;
    for ch in name.chars() {
        if ch == '-' || ch == ' ' {
            out.push('_');
        } else if ch.is_uppercase() {
            if prev.is_some_and(|p| p.is_lowercase() || p.is_ascii_digit()) {
                out.push('_');
            }
            out.extend(ch.to_lowercase());
        } else {
            out.push(ch);
        }
        prev = Some(ch);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ResourceSchema;
    use crate::types::Shared;
    use serde::Deserialize;

    #[derive(Debug, Default, Deserialize)]
    struct Node {
        #[serde(skip)]
        parent_node: Option<Shared<Node>>,
    }

    fn node_type() -> ResourceType {
        ResourceSchema::<Node>::new("Node")
            .single("parent_node", |n: &mut Node, p| n.parent_node = Some(p))
            .rel("up")
            .build()
    }

    #[test]
    fn test_snake_case() {
        assert_eq!(to_snake_case("parentNode"), "parent_node");
        assert_eq!(to_snake_case("parent-node"), "parent_node");
        assert_eq!(to_snake_case("children"), "children");
    }

    #[test]
    fn test_snake_case_keeps_acronyms_together() {
        assert_eq!(to_snake_case("parentID"), "parent_id");
        assert_eq!(to_snake_case("homeURL"), "home_url");
        assert_eq!(to_snake_case("item2Owner"), "item2_owner");
        assert_eq!(to_snake_case("ID"), "id");
    }

    #[test]
    fn test_convention_matches_acronym_relation() {
        #[derive(Debug, Default, Deserialize)]
        struct Account {
            #[serde(skip)]
            owner_id: Option<Shared<Account>>,
        }

        let ty = ResourceSchema::<Account>::new("Account")
            .single("owner_id", |a: &mut Account, o| a.owner_id = Some(o))
            .build();
        let resolver = BindingResolver::new(ResolverMode::Convention);
        assert_eq!(resolver.resolve_slot(&ty, "ownerID").unwrap().field(), "owner_id");
    }

    #[test]
    fn test_declarative_matches_declared_name_only() {
        let resolver = BindingResolver::new(ResolverMode::Declarative);
        let ty = node_type();
        let slot = resolver.resolve_slot(&ty, "up").unwrap();
        assert_eq!(slot.field(), "parent_node");
        assert!(resolver.resolve_slot(&ty, "parentNode").is_none());
    }

    #[test]
    fn test_convention_matches_field_name() {
        let resolver = BindingResolver::new(ResolverMode::Convention);
        let ty = node_type();
        assert!(resolver.resolve_slot(&ty, "parentNode").is_some());
        assert!(resolver.resolve_slot(&ty, "parent_node").is_some());
        assert!(resolver.resolve_slot(&ty, "up").is_none());
    }

    #[test]
    fn test_unknown_relation_is_none() {
        let resolver = BindingResolver::default();
        assert!(resolver.resolve_slot(&node_type(), "sibling").is_none());
    }
}
