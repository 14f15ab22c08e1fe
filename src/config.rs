//! Resolver configuration.
//!
//! All settings can be configured via environment variables:
//! - `HAL_GRAPH_DEFAULT_CACHE_SIZE`: capacity of caches declared without one (default: 100)
//! - `HAL_GRAPH_CACHING_DISABLED`: disable every durable cache (default: false)
//! - `HAL_GRAPH_NO_DECLARATIVE_METADATA`: match relations by field-name convention (default: false)
//! - `HAL_GRAPH_HTTP_TIMEOUT_SECS`: HTTP transport timeout (default: 30)

use serde::{Deserialize, Serialize};

use crate::schema::ResolverMode;

/// Default capacity for caches declared without one.
pub const DEFAULT_CACHE_CAPACITY: usize = 100;

/// Invalid configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// Cache capacity must be positive.
    #[error("default_cache_capacity must be greater than zero")]
    ZeroCapacity,
    /// HTTP timeout must be positive.
    #[error("http_timeout_secs must be greater than zero")]
    ZeroTimeout,
}

/// Settings consumed by the resolver. Immutable once the resolver is built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Capacity of caches declared without one.
    pub default_cache_capacity: usize,
    /// Disable every cache except the intermediate one.
    pub caching_disabled: bool,
    /// Ignore declared relation names and match by field-name convention.
    pub declarative_metadata_disabled: bool,
    /// Timeout for the HTTP transport.
    pub http_timeout_secs: u64,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            default_cache_capacity: DEFAULT_CACHE_CAPACITY,
            caching_disabled: false,
            declarative_metadata_disabled: false,
            http_timeout_secs: 30,
        }
    }
}

impl ResolverConfig {
    /// Load configuration from environment variables with defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            default_cache_capacity: std::env::var("HAL_GRAPH_DEFAULT_CACHE_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.default_cache_capacity),
            caching_disabled: std::env::var("HAL_GRAPH_CACHING_DISABLED")
                .ok()
                .and_then(|s| parse_flag(&s))
                .unwrap_or(defaults.caching_disabled),
            declarative_metadata_disabled: std::env::var("HAL_GRAPH_NO_DECLARATIVE_METADATA")
                .ok()
                .and_then(|s| parse_flag(&s))
                .unwrap_or(defaults.declarative_metadata_disabled),
            http_timeout_secs: std::env::var("HAL_GRAPH_HTTP_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.http_timeout_secs),
        }
    }

    /// Check invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_cache_capacity == 0 {
            return Err(ConfigError::ZeroCapacity);
        }
        if self.http_timeout_secs == 0 {
            return Err(ConfigError::ZeroTimeout);
        }
        Ok(())
    }

    /// Relation matching mode implied by the metadata flag.
    pub fn resolver_mode(&self) -> ResolverMode {
        if self.declarative_metadata_disabled {
            ResolverMode::Convention
        } else {
            ResolverMode::Declarative
        }
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
