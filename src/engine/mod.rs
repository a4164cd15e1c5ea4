//! Expiration cascade engine.
//!
//! ```text
//! cache event thread                      worker lanes (tokio tasks)
//!   submit() -> Dispatcher ──least loaded──> lane 0: recv + drain -> group -> predicate -> gateway
//!                                  └──────> lane N: ...
//! ```
//!
//! Producers never block: lanes are unbounded and submission only scans the
//! lane depths. All predicate construction and cache mutation happens on the
//! lanes. Within a lane batches are processed in FIFO order; there is no
//! ordering across lanes.

mod dispatcher;
mod notification;
mod worker;

pub use dispatcher::*;
pub use notification::*;


use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use futures::future::join_all;
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing::warn;
use worker::EngineShared;
use worker::Worker;

use crate::CacheGateway;
use crate::Error;
use crate::ExpirationConfig;
use crate::KeyExtensions;
use crate::KeyRef;
use crate::PrometheusStatusReporter;
use crate::Result;
use crate::SessionMetadata;
use crate::SpecRegistry;
use crate::StatusReporter;

/// Builder for [`ExpirationEngine`]. A gateway is mandatory.
pub struct EngineBuilder {
    config: ExpirationConfig,
    action: CascadeAction,
    gateway: Option<Arc<dyn CacheGateway>>,
    extensions: KeyExtensions,
    reporter: Arc<dyn StatusReporter>,
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self {
            config: ExpirationConfig::default(),
            action: CascadeAction::default(),
            gateway: None,
            extensions: KeyExtensions::default(),
            reporter: Arc::new(PrometheusStatusReporter),
        }
    }
}

impl EngineBuilder {
    pub fn with_config(
        mut self,
        config: ExpirationConfig,
    ) -> Self {
        self.config = config;
        self
    }

    pub fn with_action(
        mut self,
        action: CascadeAction,
    ) -> Self {
        self.action = action;
        self
    }

    pub fn with_gateway(
        mut self,
        gateway: Arc<dyn CacheGateway>,
    ) -> Self {
        self.gateway = Some(gateway);
        self
    }

    pub fn with_extensions(
        mut self,
        extensions: KeyExtensions,
    ) -> Self {
        self.extensions = extensions;
        self
    }

    pub fn with_status_reporter(
        mut self,
        reporter: Arc<dyn StatusReporter>,
    ) -> Self {
        self.reporter = reporter;
        self
    }

    /// Sanitizes the configuration and spawns one task per lane on the
    /// current tokio runtime.
    pub fn build(self) -> Result<ExpirationEngine> {
        let gateway = self.gateway.ok_or(Error::MissingComponent("gateway"))?;
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| Error::Fatal(format!("engine must be built inside a tokio runtime: {e}")))?;

        let config = self.config.sanitize();
        let registry = SpecRegistry::from_config(&config, &self.extensions);

        let patterns: Vec<String> = registry
            .specs()
            .iter()
            .map(|spec| format!("{} -> {:?}", spec.pattern().template(), spec.relevant_patterns()))
            .collect();
        info!(
            tag = %config.tag,
            action = %self.action,
            delimiter = %config.key_delimiter,
            string_key_position = ?config.string_key_position,
            thread_pool_size = config.thread_pool_size,
            queue_drain_size = config.queue_drain_size,
            processing_mode = ?config.processing_mode,
            sessions = ?patterns,
            "Session expiration engine configured"
        );

        let (dispatcher, receivers) = Dispatcher::new(config.thread_pool_size);
        let shared = Arc::new(EngineShared {
            depths: dispatcher.depth_counters(),
            config,
            action: self.action,
            registry,
            gateway,
            reporter: self.reporter,
            active_lanes: AtomicUsize::new(0),
        });

        let cancel = CancellationToken::new();
        let handles = receivers
            .into_iter()
            .map(|lane| {
                let worker = Worker::new(lane, shared.clone(), cancel.child_token());
                runtime.spawn(worker.run())
            })
            .collect();

        Ok(ExpirationEngine {
            dispatcher,
            shared,
            cancel,
            handles: Mutex::new(handles),
        })
    }
}

/// Cascades expiration (or idle refresh) of primary entries to their
/// relevant caches.
///
/// Owned by the host's composition root and shared by reference with the
/// cache event listeners. Dropping the engine stops its lanes.
pub struct ExpirationEngine {
    dispatcher: Dispatcher,
    shared: Arc<EngineShared>,
    cancel: CancellationToken,
    handles: Mutex<Vec<JoinHandle<()>>>,
}

impl ExpirationEngine {
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }

    /// Queues a primary key of `primary_cache_name`. Returns false if the
    /// notification was dropped because the engine is terminating.
    pub fn submit(
        &self,
        primary_cache_name: impl Into<String>,
        key: KeyRef,
    ) -> bool {
        self.submit_notification(Notification::key(primary_cache_name, key))
    }

    /// Queues a primary value carrying its relevant entries.
    pub fn submit_metadata(
        &self,
        primary_cache_name: impl Into<String>,
        metadata: Arc<SessionMetadata>,
    ) -> bool {
        self.submit_notification(Notification::metadata(primary_cache_name, metadata))
    }

    pub fn submit_notification(
        &self,
        notification: Notification,
    ) -> bool {
        if self.cancel.is_cancelled() {
            return false;
        }
        let queued = self.dispatcher.submit(notification);
        self.shared.report_queue_size();
        queued
    }

    /// Aggregate number of queued notifications across all lanes
    pub fn queue_size(&self) -> usize {
        self.dispatcher.queue_size()
    }

    pub fn lane_depths(&self) -> Vec<usize> {
        self.dispatcher.lane_depths()
    }

    pub fn delimiter(&self) -> &str {
        &self.shared.config.key_delimiter
    }

    /// Effective (sanitized) configuration
    pub fn config(&self) -> &ExpirationConfig {
        &self.shared.config
    }

    pub fn action(&self) -> CascadeAction {
        self.shared.action
    }

    pub fn registry(&self) -> &SpecRegistry {
        &self.shared.registry
    }

    /// Signals every lane to stop without waiting. Queued notifications are
    /// discarded and later submissions are dropped.
    pub fn terminate(&self) {
        if !self.cancel.is_cancelled() {
            info!(tag = %self.shared.config.tag, "Terminating session expiration engine");
        }
        self.cancel.cancel();
    }

    pub fn is_terminating(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// True once terminating and every lane has stopped.
    pub fn is_terminated(&self) -> bool {
        self.is_terminating() && self.shared.active_lanes.load(Ordering::Acquire) == 0
    }

    /// Terminates and waits for the lanes, at most for the configured grace
    /// period. Lanes still busy after that are aborted.
    pub async fn shutdown(&self) {
        self.terminate();

        let handles: Vec<JoinHandle<()>> = std::mem::take(&mut *self.handles.lock());
        if handles.is_empty() {
            return;
        }
        let aborts: Vec<_> = handles.iter().map(|h| h.abort_handle()).collect();
        let grace = self.shared.config.shutdown_grace_period();

        match tokio::time::timeout(grace, join_all(handles)).await {
            Ok(results) => {
                for result in results {
                    if let Err(e) = result {
                        if !e.is_cancelled() {
                            warn!(tag = %self.shared.config.tag, error = %e, "Worker lane failed");
                        }
                    }
                }
            }
            Err(_) => {
                warn!(
                    tag = %self.shared.config.tag,
                    grace_ms = grace.as_millis() as u64,
                    "Worker lanes did not stop within the grace period, aborting"
                );
                for abort in aborts {
                    abort.abort();
                }
            }
        }
    }
}

impl Drop for ExpirationEngine {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

impl std::fmt::Debug for ExpirationEngine {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("ExpirationEngine")
            .field("tag", &self.shared.config.tag)
            .field("action", &self.shared.action)
            .field("lane_depths", &self.lane_depths())
            .field("terminating", &self.is_terminating())
            .finish_non_exhaustive()
    }
}
