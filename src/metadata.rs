//! Session metadata stored as a primary entry's value.
//!
//! When a primary value records exactly which relevant entries belong to the
//! session, the cascade removes (or touches) those keys directly instead of
//! deriving a predicate.

use crate::KeyRef;

#[derive(Debug, Clone, Default)]
pub struct SessionMetadata {
    /// `(relevant cache name, relevant key)` in insertion order
    entries: Vec<(String, KeyRef)>,
}

impl SessionMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entry(
        mut self,
        cache_name: impl Into<String>,
        key: KeyRef,
    ) -> Self {
        self.push(cache_name, key);
        self
    }

    pub fn push(
        &mut self,
        cache_name: impl Into<String>,
        key: KeyRef,
    ) {
        self.entries.push((cache_name.into(), key));
    }

    pub fn entries(&self) -> &[(String, KeyRef)] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
