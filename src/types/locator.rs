//! Resource locators.

use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

/// Error raised when a locator is not an absolute, well-formed URI.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LocatorError {
    /// The input could not be parsed as a URI.
    #[error("Invalid resource locator '{input}': {reason}")]
    Malformed {
        /// Offending input.
        input: String,
        /// Parser message.
        reason: String,
    },
    /// A relative reference was given where an absolute one is required.
    #[error("Resource locator must be absolute: {0}")]
    Relative(String),
}

/// Absolute URI identifying a fetchable resource.
///
/// Equality and hashing are by exact serialized value, so two locators that
/// differ only in a trailing slash are distinct cache keys.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ResourceLocator(Url);

impl ResourceLocator {
    /// Parse an absolute locator.
    pub fn parse(input: &str) -> Result<Self, LocatorError> {
        match Url::parse(input) {
            Ok(url) => Ok(Self(url)),
            Err(url::ParseError::RelativeUrlWithoutBase) => {
                Err(LocatorError::Relative(input.to_string()))
            }
            Err(e) => Err(LocatorError::Malformed {
                input: input.to_string(),
                reason: e.to_string(),
            }),
        }
    }

    /// Resolve a possibly-relative href against this locator.
    pub fn join(&self, href: &str) -> Result<Self, LocatorError> {
        self.0.join(href).map(Self).map_err(|e| LocatorError::Malformed {
            input: href.to_string(),
            reason: e.to_string(),
        })
    }

    /// Borrow the underlying URL.
    pub fn as_url(&self) -> &Url {
        &self.0
    }

    /// Serialized form.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for ResourceLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Url> for ResourceLocator {
    fn from(url: Url) -> Self {
        Self(url)
    }
}

impl std::str::FromStr for ResourceLocator {
    type Err = LocatorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
