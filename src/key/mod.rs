//! Primary and relevant cache keys.
//!
//! Keys are polymorphic. Instead of inspecting concrete key types, the engine
//! asks a key for the capability its primary cache's strategy needs:
//!
//! - [`CacheKey::session_id`] for `INTERFACE` keys
//! - [`CacheKey::partition_key`] for `PARTITION_AWARE` keys
//! - [`CacheKey::property`] (or a registered [`KeyAccessor`]) for `OBJECT` keys
//! - the key's `Display` form for `STRING` keys
//!
//! The same capabilities are used by predicates evaluated against relevant
//! cache keys.

mod accessor;

pub use accessor::*;


use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::constants::PARTITION_KEY_PROPERTY;
use crate::constants::SESSION_ID_PROPERTY;
use crate::KeyAccessError;

/// Shared handle to a key owned by a notification or a cache entry.
pub type KeyRef = Arc<dyn CacheKey>;

/// Capability interface implemented by every key stored in the grid.
pub trait CacheKey: fmt::Debug + fmt::Display + Send + Sync + 'static {
    /// Session identifier carried by the key, if its type exposes one.
    fn session_id(&self) -> Option<String> {
        None
    }

    /// Partition affinity key, if the key type routes by one.
    fn partition_key(&self) -> Option<String> {
        None
    }

    /// Named property lookup.
    ///
    /// The default serves `sessionId` and `partitionKey` from the capability
    /// methods above and rejects every other name.
    fn property(
        &self,
        name: &str,
    ) -> std::result::Result<Option<String>, KeyAccessError> {
        match name {
            SESSION_ID_PROPERTY => Ok(self.session_id()),
            PARTITION_KEY_PROPERTY => Ok(self.partition_key()),
            _ => Err(KeyAccessError::UnknownProperty {
                property: name.to_string(),
                key: self.to_string(),
            }),
        }
    }

    fn as_any(&self) -> &dyn Any;
}

impl CacheKey for String {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Wraps a string as a [`KeyRef`].
pub fn string_key(key: impl Into<String>) -> KeyRef {
    Arc::new(key.into())
}
