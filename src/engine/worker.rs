use std::any::Any;
use std::collections::BTreeMap;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use futures::FutureExt;
use regex::Regex;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::error;
use tracing::trace;
use tracing::warn;

use super::dispatcher::LaneReceiver;
use super::CascadeAction;
use super::Notification;
use super::Payload;
use crate::anchored_regex;
use crate::CacheGateway;
use crate::CacheHandle;
use crate::Correlation;
use crate::Error;
use crate::ExpirationConfig;
use crate::KeyRef;
use crate::Predicate;
use crate::ProcessingMode;
use crate::ResolvedTag;
use crate::Result;
use crate::SessionMetadata;
use crate::SpecRegistry;
use crate::StatusReporter;

/// State shared by the engine handle and all of its lanes
pub(crate) struct EngineShared {
    pub(crate) config: ExpirationConfig,
    pub(crate) action: CascadeAction,
    pub(crate) registry: SpecRegistry,
    pub(crate) gateway: Arc<dyn CacheGateway>,
    pub(crate) reporter: Arc<dyn StatusReporter>,
    pub(crate) depths: Vec<Arc<AtomicUsize>>,
    /// Lanes whose worker has not been dropped yet
    pub(crate) active_lanes: AtomicUsize,
}

impl EngineShared {
    pub(crate) fn queue_size(&self) -> usize {
        self.depths.iter().map(|d| d.load(Ordering::Acquire)).sum()
    }

    pub(crate) fn report_queue_size(&self) {
        self.reporter.report_queue_size(&self.config.tag, self.queue_size());
    }
}

/// Groups a drained batch by primary cache name, in order of first appearance.
pub(crate) fn group_by_primary_cache(batch: Vec<Notification>) -> Vec<(String, Vec<Payload>)> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut groups: Vec<(String, Vec<Payload>)> = Vec::new();
    for notification in batch {
        match index.get(&notification.primary_cache_name) {
            Some(&i) => groups[i].1.push(notification.payload),
            None => {
                index.insert(notification.primary_cache_name.clone(), groups.len());
                groups.push((notification.primary_cache_name, vec![notification.payload]));
            }
        }
    }
    groups
}

/// Best effort text of a caught panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "non-string panic payload"
    }
}

/// Consumer of one lane.
///
/// Dropping a worker (normal exit or abort) discards whatever is still
/// queued in its lane.
pub(crate) struct Worker {
    lane: usize,
    receiver: mpsc::UnboundedReceiver<Notification>,
    depth: Arc<AtomicUsize>,
    shared: Arc<EngineShared>,
    cancel: CancellationToken,
    /// Compiled relevant cache patterns, `None` for invalid ones
    patterns: HashMap<String, Option<Regex>>,
}

impl Worker {
    pub(crate) fn new(
        lane: LaneReceiver,
        shared: Arc<EngineShared>,
        cancel: CancellationToken,
    ) -> Self {
        shared.active_lanes.fetch_add(1, Ordering::AcqRel);
        Self {
            lane: lane.index,
            receiver: lane.receiver,
            depth: lane.depth,
            shared,
            cancel,
            patterns: HashMap::new(),
        }
    }

    pub(crate) async fn run(mut self) {
        debug!(tag = %self.shared.config.tag, lane = self.lane, "Expiration worker started");
        while let Some(batch) = self.next_batch().await {
            self.process_batch(batch).await;
        }
    }

    /// Waits for one notification, then drains up to `queue_drain_size` more
    /// without waiting. `None` once cancelled or the lane is closed.
    pub(crate) async fn next_batch(&mut self) -> Option<Vec<Notification>> {
        let first = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => None,
            next = self.receiver.recv() => next,
        };
        let first = first?;

        let drain_size = self.shared.config.queue_drain_size;
        let mut batch = Vec::with_capacity(drain_size.min(1024) + 1);
        batch.push(first);
        while batch.len() <= drain_size {
            match self.receiver.try_recv() {
                Ok(notification) => batch.push(notification),
                Err(_) => break,
            }
        }

        self.depth.fetch_sub(batch.len(), Ordering::AcqRel);
        self.shared.report_queue_size();
        trace!(lane = self.lane, size = batch.len(), "Drained batch");
        Some(batch)
    }

    pub(crate) async fn process_batch(
        &mut self,
        batch: Vec<Notification>,
    ) {
        let shared = self.shared.clone();
        let tag = shared.config.tag.as_str();
        let groups = group_by_primary_cache(batch);

        let caches = match shared.gateway.list_caches().await {
            Ok(caches) => caches,
            Err(e) => {
                warn!(tag, lane = self.lane, error = %e, groups = groups.len(), "Failed to list caches, skipping batch");
                shared.reporter.record_group_failure(tag);
                return;
            }
        };

        for (primary, payloads) in groups {
            let outcome = AssertUnwindSafe(self.process_group(&caches, &primary, payloads))
                .catch_unwind()
                .await;
            let outcome = match outcome {
                Ok(outcome) => outcome,
                Err(panic) => {
                    error!(
                        tag,
                        lane = self.lane,
                        primary_cache = %primary,
                        panic = %panic_message(panic.as_ref()),
                        "Cascade panicked for primary cache group"
                    );
                    shared.reporter.record_group_failure(tag);
                    continue;
                }
            };
            match outcome {
                Ok(0) => {}
                Ok(count) => {
                    debug!(
                        tag,
                        lane = self.lane,
                        primary_cache = %primary,
                        action = %shared.action,
                        count,
                        "Cascaded primary cache group"
                    );
                    shared.reporter.record_cascaded(tag, shared.action, count);
                }
                Err(e) => {
                    warn!(
                        tag,
                        lane = self.lane,
                        primary_cache = %primary,
                        error = %e,
                        "Failed to cascade primary cache group"
                    );
                    shared.reporter.record_group_failure(tag);
                }
            }
        }
    }

    async fn process_group(
        &mut self,
        caches: &HashMap<String, CacheHandle>,
        primary: &str,
        payloads: Vec<Payload>,
    ) -> Result<usize> {
        let mut keys: Vec<KeyRef> = Vec::new();
        let mut count = 0;
        for payload in payloads {
            match payload {
                Payload::Key(key) => keys.push(key),
                Payload::Metadata(metadata) => {
                    count += self.cascade_metadata(caches, primary, &metadata).await;
                }
            }
        }
        if !keys.is_empty() {
            count += self.cascade_keys(caches, primary, &keys).await?;
        }
        Ok(count)
    }

    /// Applies the action to every listed entry whose cache currently exists.
    /// Per-entry failures are logged and skipped.
    async fn cascade_metadata(
        &self,
        caches: &HashMap<String, CacheHandle>,
        primary: &str,
        metadata: &SessionMetadata,
    ) -> usize {
        let mut count = 0;
        for (cache_name, key) in metadata.entries() {
            let Some(handle) = caches.get(cache_name) else {
                trace!(primary_cache = %primary, relevant_cache = %cache_name, "Relevant cache does not exist");
                continue;
            };
            let result = match self.shared.action {
                CascadeAction::Expire => self.shared.gateway.remove_key(handle, key).await,
                CascadeAction::ResetIdleTimeout => self.shared.gateway.touch_key(handle, key).await,
            };
            match result {
                Ok(true) => count += 1,
                Ok(false) => {}
                Err(e) => warn!(
                    tag = %self.shared.config.tag,
                    primary_cache = %primary,
                    relevant_cache = %cache_name,
                    key = %key,
                    error = %e,
                    "Failed to cascade metadata entry"
                ),
            }
        }
        count
    }

    async fn cascade_keys(
        &mut self,
        caches: &HashMap<String, CacheHandle>,
        primary: &str,
        keys: &[KeyRef],
    ) -> Result<usize> {
        let shared = self.shared.clone();
        let tag = shared.config.tag.as_str();

        let Some(resolved) = shared.registry.resolve(primary) else {
            debug!(tag, primary_cache = %primary, "No session spec for primary cache, skipping group");
            return Ok(0);
        };
        let handles = self.relevant_caches(caches, &resolved);
        if handles.is_empty() {
            debug!(tag, primary_cache = %primary, "No relevant cache matches, skipping group");
            return Ok(0);
        }

        let correlation = Correlation {
            tag,
            delimiter: &shared.config.key_delimiter,
            position: shared.config.string_key_position,
            reporter: shared.reporter.as_ref(),
        };

        let mut count = 0;
        match shared.config.processing_mode {
            ProcessingMode::Batched => {
                let Some(predicate) = correlation.group_predicate(&resolved, keys) else {
                    debug!(tag, primary_cache = %primary, "No session identifier derived, skipping group");
                    return Ok(0);
                };
                trace!(tag, primary_cache = %primary, %predicate, "Group predicate");
                for handle in &handles {
                    count += self.apply_batched(handle, &predicate).await?;
                }
            }
            ProcessingMode::PerEvent => {
                for key in keys {
                    let Some(predicate) = correlation.item_predicate(&resolved, key) else {
                        continue;
                    };
                    for handle in &handles {
                        count += self.apply_per_event(handle, &predicate).await?;
                    }
                }
            }
        }
        Ok(count)
    }

    async fn apply_batched(
        &self,
        handle: &CacheHandle,
        predicate: &Predicate,
    ) -> Result<usize> {
        let gateway = &self.shared.gateway;
        let count = match self.shared.action {
            CascadeAction::Expire => gateway.remove_matching(handle, predicate).await?,
            CascadeAction::ResetIdleTimeout => gateway.touch_matching(handle, predicate).await?,
        };
        trace!(relevant_cache = %handle.name(), count, "Applied group predicate");
        Ok(count)
    }

    /// Expiration removes through the local key set, one key at a time.
    async fn apply_per_event(
        &self,
        handle: &CacheHandle,
        predicate: &Predicate,
    ) -> Result<usize> {
        let gateway = &self.shared.gateway;
        match self.shared.action {
            CascadeAction::Expire => {
                let mut removed = 0;
                for key in gateway.local_key_set(handle, predicate).await? {
                    if gateway.remove_key(handle, &key).await? {
                        removed += 1;
                    }
                }
                Ok(removed)
            }
            CascadeAction::ResetIdleTimeout => gateway.touch_matching(handle, predicate).await,
        }
    }

    /// Caches whose full name matches one of the resolved relevant patterns,
    /// each listed once, ordered by name.
    pub(crate) fn relevant_caches(
        &mut self,
        caches: &HashMap<String, CacheHandle>,
        resolved: &ResolvedTag,
    ) -> Vec<CacheHandle> {
        let tag = self.shared.config.tag.as_str();
        let lane = self.lane;
        let mut matched: BTreeMap<&str, &CacheHandle> = BTreeMap::new();

        for pattern in resolved.relevant_patterns() {
            let regex = self.patterns.entry(pattern).or_insert_with_key(|pattern| {
                match anchored_regex(pattern) {
                    Ok(regex) => Some(regex),
                    Err(source) => {
                        let e = Error::InvalidPattern {
                            pattern: pattern.clone(),
                            source,
                        };
                        warn!(tag, lane, error = %e, "Skipping relevant cache pattern");
                        None
                    }
                }
            });
            let Some(regex) = regex else {
                continue;
            };
            for (name, handle) in caches {
                if regex.is_match(name) {
                    matched.insert(name.as_str(), handle);
                }
            }
        }

        matched.into_values().cloned().collect()
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        self.receiver.close();
        let mut discarded = 0;
        while self.receiver.try_recv().is_ok() {
            discarded += 1;
        }
        if discarded > 0 {
            self.depth.fetch_sub(discarded, Ordering::AcqRel);
        }
        self.shared.active_lanes.fetch_sub(1, Ordering::AcqRel);
        self.shared.report_queue_size();
        debug!(
            tag = %self.shared.config.tag,
            lane = self.lane,
            discarded,
            "Expiration worker stopped"
        );
    }
}
