//! Access to the relevant caches of the grid.
//!
//! The engine only ever talks to the store through [`CacheGateway`]. Predicate
//! driven operations are scoped to partitions owned by the local member, so
//! that every member running the same cascade does not repeat work done by
//! the others.

mod memory;

pub use memory::*;


use std::collections::HashMap;

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;

use crate::KeyRef;
use crate::Predicate;
use crate::Result;

/// Handle to a cache as returned by [`CacheGateway::list_caches`]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheHandle {
    name: String,
}

impl CacheHandle {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

#[cfg_attr(test, automock)]
#[async_trait]
pub trait CacheGateway: Send + Sync + 'static {
    /// Snapshot of every cache currently known to the grid, by name.
    async fn list_caches(&self) -> Result<HashMap<String, CacheHandle>>;

    /// Removes entries of locally owned partitions matching `predicate`.
    /// Returns the number of removed entries.
    async fn remove_matching(
        &self,
        cache: &CacheHandle,
        predicate: &Predicate,
    ) -> Result<usize>;

    /// Keys of locally owned partitions matching `predicate`.
    async fn local_key_set(
        &self,
        cache: &CacheHandle,
        predicate: &Predicate,
    ) -> Result<Vec<KeyRef>>;

    /// Removes a single entry. Removing an absent key is not an error.
    async fn remove_key(
        &self,
        cache: &CacheHandle,
        key: &KeyRef,
    ) -> Result<bool>;

    /// Resets the idle timer of locally owned entries matching `predicate`.
    async fn touch_matching(
        &self,
        cache: &CacheHandle,
        predicate: &Predicate,
    ) -> Result<usize>;

    /// Resets the idle timer of a single entry.
    async fn touch_key(
        &self,
        cache: &CacheHandle,
        key: &KeyRef,
    ) -> Result<bool>;
}
