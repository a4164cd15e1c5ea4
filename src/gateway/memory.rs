use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::collections::HashSet;
use std::hash::Hash;
use std::hash::Hasher;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use dashmap::DashMap;
use tracing::trace;

use super::CacheGateway;
use super::CacheHandle;
use crate::CacheKey;
use crate::GatewayError;
use crate::KeyRef;
use crate::Predicate;
use crate::Result;

/// Partition count used by [`MemoryGrid::new`]
pub const DEFAULT_PARTITION_COUNT: usize = 271;

#[derive(Debug, Clone)]
struct StoredEntry {
    key: KeyRef,
    value: String,
    last_access: Instant,
}

#[derive(Debug, Default)]
struct MemoryCache {
    /// Entries by the key's string form
    entries: DashMap<String, StoredEntry>,
}

/// In-process grid member.
///
/// Keys are placed on partitions by their partition key when they have one,
/// by their string form otherwise. Only the partitions listed as local are
/// visible to predicate operations.
#[derive(Debug)]
pub struct MemoryGrid {
    caches: DashMap<String, Arc<MemoryCache>>,
    partition_count: usize,
    /// `None` means every partition is local
    local_partitions: Option<HashSet<usize>>,
}

impl Default for MemoryGrid {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryGrid {
    /// Single member grid owning all partitions.
    pub fn new() -> Self {
        Self {
            caches: DashMap::new(),
            partition_count: DEFAULT_PARTITION_COUNT,
            local_partitions: None,
        }
    }

    /// Grid member owning only `local` out of `partition_count` partitions.
    pub fn with_partitions(
        partition_count: usize,
        local: impl IntoIterator<Item = usize>,
    ) -> Self {
        Self {
            caches: DashMap::new(),
            partition_count: partition_count.max(1),
            local_partitions: Some(local.into_iter().collect()),
        }
    }

    /// Returns false if the cache already exists.
    pub fn create_cache(
        &self,
        name: impl Into<String>,
    ) -> bool {
        let name = name.into();
        if self.caches.contains_key(&name) {
            return false;
        }
        self.caches.insert(name, Arc::new(MemoryCache::default()));
        true
    }

    pub fn drop_cache(
        &self,
        name: &str,
    ) -> bool {
        self.caches.remove(name).is_some()
    }

    pub fn put(
        &self,
        cache: &str,
        key: KeyRef,
        value: impl Into<String>,
    ) -> Result<()> {
        let cache = self.cache(cache)?;
        cache.entries.insert(
            key.to_string(),
            StoredEntry {
                key,
                value: value.into(),
                last_access: Instant::now(),
            },
        );
        Ok(())
    }

    /// Reads an entry and refreshes its last access instant.
    pub fn get(
        &self,
        cache: &str,
        key: &dyn CacheKey,
    ) -> Option<String> {
        let cache = self.cache(cache).ok()?;
        let mut entry = cache.entries.get_mut(&key.to_string())?;
        entry.last_access = Instant::now();
        Some(entry.value.clone())
    }

    pub fn contains(
        &self,
        cache: &str,
        key: &dyn CacheKey,
    ) -> bool {
        self.cache(cache)
            .map(|c| c.entries.contains_key(&key.to_string()))
            .unwrap_or(false)
    }

    pub fn len(
        &self,
        cache: &str,
    ) -> usize {
        self.cache(cache).map(|c| c.entries.len()).unwrap_or(0)
    }

    pub fn is_empty(
        &self,
        cache: &str,
    ) -> bool {
        self.len(cache) == 0
    }

    pub fn last_access(
        &self,
        cache: &str,
        key: &dyn CacheKey,
    ) -> Option<Instant> {
        let cache = self.cache(cache).ok()?;
        let entry = cache.entries.get(&key.to_string())?;
        Some(entry.last_access)
    }

    /// String forms of every key in `cache`, sorted.
    pub fn keys(
        &self,
        cache: &str,
    ) -> Vec<String> {
        let Ok(cache) = self.cache(cache) else {
            return Vec::new();
        };
        let mut keys: Vec<String> = cache.entries.iter().map(|e| e.key().clone()).collect();
        keys.sort();
        keys
    }

    pub fn partition_of(
        &self,
        key: &dyn CacheKey,
    ) -> usize {
        let mut hasher = DefaultHasher::new();
        match key.partition_key() {
            Some(partition_key) => partition_key.hash(&mut hasher),
            None => key.to_string().hash(&mut hasher),
        }
        (hasher.finish() % self.partition_count as u64) as usize
    }

    pub fn is_local(
        &self,
        key: &dyn CacheKey,
    ) -> bool {
        match &self.local_partitions {
            None => true,
            Some(local) => local.contains(&self.partition_of(key)),
        }
    }

    fn cache(
        &self,
        name: &str,
    ) -> std::result::Result<Arc<MemoryCache>, GatewayError> {
        self.caches
            .get(name)
            .map(|c| c.value().clone())
            .ok_or_else(|| GatewayError::CacheNotFound(name.to_string()))
    }

    /// Local keys of `cache` matching `predicate`, by string form.
    fn local_matches(
        &self,
        cache: &MemoryCache,
        predicate: &Predicate,
    ) -> Vec<(String, KeyRef)> {
        cache
            .entries
            .iter()
            .filter(|e| self.is_local(e.value().key.as_ref()))
            .filter(|e| predicate.evaluate(e.value().key.as_ref()))
            .map(|e| (e.key().clone(), e.value().key.clone()))
            .collect()
    }
}

#[async_trait]
impl CacheGateway for MemoryGrid {
    async fn list_caches(&self) -> Result<HashMap<String, CacheHandle>> {
        Ok(self
            .caches
            .iter()
            .map(|c| (c.key().clone(), CacheHandle::new(c.key().clone())))
            .collect())
    }

    async fn remove_matching(
        &self,
        cache: &CacheHandle,
        predicate: &Predicate,
    ) -> Result<usize> {
        let store = self.cache(cache.name())?;
        let removed = self
            .local_matches(&store, predicate)
            .into_iter()
            .filter(|(id, _)| store.entries.remove(id).is_some())
            .count();
        trace!(cache = %cache.name(), %predicate, removed, "remove_matching");
        Ok(removed)
    }

    async fn local_key_set(
        &self,
        cache: &CacheHandle,
        predicate: &Predicate,
    ) -> Result<Vec<KeyRef>> {
        let store = self.cache(cache.name())?;
        Ok(self.local_matches(&store, predicate).into_iter().map(|(_, key)| key).collect())
    }

    async fn remove_key(
        &self,
        cache: &CacheHandle,
        key: &KeyRef,
    ) -> Result<bool> {
        let store = self.cache(cache.name())?;
        Ok(store.entries.remove(&key.to_string()).is_some())
    }

    async fn touch_matching(
        &self,
        cache: &CacheHandle,
        predicate: &Predicate,
    ) -> Result<usize> {
        let store = self.cache(cache.name())?;
        let now = Instant::now();
        let touched = self
            .local_matches(&store, predicate)
            .into_iter()
            .filter(|(id, _)| match store.entries.get_mut(id) {
                Some(mut entry) => {
                    entry.last_access = now;
                    true
                }
                None => false,
            })
            .count();
        trace!(cache = %cache.name(), %predicate, touched, "touch_matching");
        Ok(touched)
    }

    async fn touch_key(
        &self,
        cache: &CacheHandle,
        key: &KeyRef,
    ) -> Result<bool> {
        let store = self.cache(cache.name())?;
        let touched = match store.entries.get_mut(&key.to_string()) {
            Some(mut entry) => {
                entry.last_access = Instant::now();
                true
            }
            None => false,
        };
        Ok(touched)
    }
}
