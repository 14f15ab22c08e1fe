//! HAL links and decoded documents.
//!
//! A HAL body is a JSON object whose `_links` member maps relation names to
//! either one link object or an array of them. Decoding keeps the link order
//! of the body, expanding arrays in place.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::locator::{LocatorError, ResourceLocator};

/// Reserved relation naming the enclosing resource.
pub const SELF_RELATION: &str = "self";

/// A named link from one resource to another.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RelationLink {
    /// Relation name.
    pub name: String,
    /// Target of the link.
    pub target: ResourceLocator,
}

impl RelationLink {
    /// Create a link.
    pub fn new(name: impl Into<String>, target: ResourceLocator) -> Self {
        Self {
            name: name.into(),
            target,
        }
    }

    /// Whether this is the reserved `self` link.
    pub fn is_self(&self) -> bool {
        self.name == SELF_RELATION
    }
}

/// Error decoding a HAL body.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DocumentError {
    /// Top-level value is not a JSON object.
    #[error("HAL document must be a JSON object")]
    NotAnObject,
    /// Collection body is neither an array nor carries an `_embedded` array.
    #[error("HAL collection must be an array or carry an _embedded array")]
    NotACollection,
    /// A link entry is missing its `href`.
    #[error("Link '{relation}' has no href")]
    MissingHref {
        /// Relation name.
        relation: String,
    },
    /// A link href could not be turned into an absolute locator.
    #[error("Link '{relation}' has an invalid href: {source}")]
    InvalidHref {
        /// Relation name.
        relation: String,
        /// Underlying locator error.
        #[source]
        source: LocatorError,
    },
}

/// Decoded representation of one resource: its state plus its links.
#[derive(Debug, Clone, PartialEq)]
pub struct HalDocument {
    /// Resource properties, minus `_links` and `_embedded`.
    pub state: Value,
    /// Links in document order, `self` included.
    pub links: Vec<RelationLink>,
}

impl HalDocument {
    /// Decode a HAL JSON body.
    ///
    /// `base` is the locator the body was fetched from. The `self` href is
    /// resolved against it; every other href is resolved against `self`,
    /// falling back to `base` when the document has no `self` link.
    pub fn from_json(body: Value, base: Option<&ResourceLocator>) -> Result<Self, DocumentError> {
        let Value::Object(mut object) = body else {
            return Err(DocumentError::NotAnObject);
        };

        let raw_links = match object.remove("_links") {
            Some(Value::Object(map)) => map,
            _ => Map::new(),
        };
        object.remove("_embedded");

        let self_base = match raw_links.get(SELF_RELATION) {
            Some(entry) => match entry_href(SELF_RELATION, entry)? {
                Some(href) => Some(resolve_href(base, href).map_err(|source| {
                    DocumentError::InvalidHref {
                        relation: SELF_RELATION.to_string(),
                        source,
                    }
                })?),
                None => base.cloned(),
            },
            None => base.cloned(),
        };

        let mut links = Vec::new();
        for (relation, entry) in raw_links.iter() {
            let entries: Vec<&Value> = match entry {
                Value::Array(items) => items.iter().collect(),
                other => vec![other],
            };
            for item in entries {
                if item.get("templated").and_then(Value::as_bool).unwrap_or(false) {
                    tracing::debug!(relation = %relation, "Skipping templated link");
                    continue;
                }
                let Some(href) = entry_href(relation, item)? else {
                    continue;
                };
                let target = resolve_href(self_base.as_ref(), href).map_err(|source| {
                    DocumentError::InvalidHref {
                        relation: relation.clone(),
                        source,
                    }
                })?;
                links.push(RelationLink::new(relation.clone(), target));
            }
        }

        Ok(Self {
            state: Value::Object(object),
            links,
        })
    }

    /// Decode a root-level collection body.
    ///
    /// Accepts a bare JSON array of HAL objects, or an object whose
    /// `_embedded` member holds an array (the first one found).
    pub fn collection_from_json(
        body: Value,
        base: Option<&ResourceLocator>,
    ) -> Result<Vec<Self>, DocumentError> {
        let items = match body {
            Value::Array(items) => items,
            Value::Object(mut object) => {
                let embedded = match object.remove("_embedded") {
                    Some(Value::Object(map)) => map,
                    _ => return Err(DocumentError::NotACollection),
                };
                embedded
                    .into_iter()
                    .find_map(|(_, v)| match v {
                        Value::Array(items) => Some(items),
                        _ => None,
                    })
                    .ok_or(DocumentError::NotACollection)?
            }
            _ => return Err(DocumentError::NotACollection),
        };

        items
            .into_iter()
            .map(|item| Self::from_json(item, base))
            .collect()
    }

    /// Locator of the `self` link, if present.
    pub fn self_locator(&self) -> Option<&ResourceLocator> {
        self.links.iter().find(|l| l.is_self()).map(|l| &l.target)
    }
}

fn entry_href<'a>(relation: &str, entry: &'a Value) -> Result<Option<&'a str>, DocumentError> {
    match entry {
        Value::Object(map) => match map.get("href") {
            Some(Value::String(href)) => Ok(Some(href.as_str())),
            _ => Err(DocumentError::MissingHref {
                relation: relation.to_string(),
            }),
        },
        Value::String(href) => Ok(Some(href.as_str())),
        Value::Null => Ok(None),
        _ => Err(DocumentError::MissingHref {
            relation: relation.to_string(),
        }),
    }
}

fn resolve_href(base: Option<&ResourceLocator>, href: &str) -> Result<ResourceLocator, LocatorError> {
    match base {
        Some(base) => base.join(href),
        None => ResourceLocator::parse(href),
    }
}
