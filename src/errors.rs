//! Session Expiration Error Hierarchy
//!
//! Errors are grouped by the layer that produces them. None of them ever
//! reaches the cache's event-delivery thread: workers log and continue.

use config::ConfigError;

#[doc(hidden)]
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Configuration file loading or parsing failures
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Failures reported by the grid gateway while listing or mutating caches
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    /// Relevant cache pattern is not a valid regular expression after tag substitution
    #[error("Invalid relevant cache pattern [{pattern}]")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// Engine builder was finalized without a required collaborator
    #[error("Engine component missing: {0}")]
    MissingComponent(&'static str),

    /// Unrecoverable failures
    #[error("Fatal error: {0}")]
    Fatal(String),
}

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// Cache vanished between listing and mutation
    #[error("Cache not found: {0}")]
    CacheNotFound(String),

    /// Store rejected the request (node leaving, partition migration, ...)
    #[error("Grid unavailable: {0}")]
    Unavailable(String),

    /// Predicate application failed on a specific cache
    #[error("Operation on cache {cache} failed: {reason}")]
    Operation { cache: String, reason: String },
}

/// Raised by key accessors. Logged and counted per key, never propagated.
#[derive(Debug, thiserror::Error)]
pub enum KeyAccessError {
    /// Key type exposes no property with the requested name
    #[error("Key [{key}] has no property [{property}]")]
    UnknownProperty { property: String, key: String },

    /// Typed accessor registered for another key type
    #[error("Key [{key}] is not a {expected}")]
    TypeMismatch { expected: &'static str, key: String },

    /// Accessor ran but failed
    #[error("Accessor failed for key [{key}]: {reason}")]
    Failed { key: String, reason: String },
}

/// Raised by predicate providers. Logged and counted per key, never propagated.
#[derive(Debug, thiserror::Error)]
#[error("Predicate provider failed for key [{key}] in {primary_cache}: {reason}")]
pub struct ProviderError {
    pub primary_cache: String,
    pub key: String,
    pub reason: String,
}

impl ProviderError {
    pub fn new(
        primary_cache: impl Into<String>,
        key: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            primary_cache: primary_cache.into(),
            key: key.into(),
            reason: reason.into(),
        }
    }
}
