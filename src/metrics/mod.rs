//! Status surface of the engine.
//!
//! The engine pushes queue depth snapshots and cascade outcomes to a
//! [`StatusReporter`]. [`PrometheusStatusReporter`] records them in the
//! process wide metric statics below; hosts expose them by calling
//! [`register_custom_metrics`] on their own registry.


use lazy_static::lazy_static;
#[cfg(test)]
use mockall::automock;
use prometheus::IntCounterVec;
use prometheus::IntGaugeVec;
use prometheus::Opts;
use prometheus::Registry;
use tracing::warn;

use crate::CascadeAction;
use crate::KeyType;

lazy_static! {
    pub static ref QUEUE_SIZE_METRIC: IntGaugeVec = IntGaugeVec::new(
        Opts::new("session_expiry_queue_size", "Notifications waiting in all worker lanes"),
        &["tag"]
    )
    .expect("metric can not be created");

    pub static ref CASCADED_ENTRIES_METRIC: IntCounterVec = IntCounterVec::new(
        Opts::new("session_expiry_cascaded_entries", "Relevant entries removed or touched"),
        &["tag", "action"]
    )
    .expect("metric can not be created");

    pub static ref GROUP_FAILURES_METRIC: IntCounterVec = IntCounterVec::new(
        Opts::new("session_expiry_group_failures", "Primary cache groups that failed to cascade"),
        &["tag"]
    )
    .expect("metric can not be created");

    pub static ref DERIVATION_FAILURES_METRIC: IntCounterVec = IntCounterVec::new(
        Opts::new(
            "session_expiry_derivation_failures",
            "Keys excluded because no session identifier could be derived"
        ),
        &["tag", "key_type"]
    )
    .expect("metric can not be created");
}

/// Registers every engine metric with `registry`. Collectors that are
/// already registered are skipped with a warning.
pub fn register_custom_metrics(registry: &Registry) {
    let collectors: Vec<Box<dyn prometheus::core::Collector>> = vec![
        Box::new(QUEUE_SIZE_METRIC.clone()),
        Box::new(CASCADED_ENTRIES_METRIC.clone()),
        Box::new(GROUP_FAILURES_METRIC.clone()),
        Box::new(DERIVATION_FAILURES_METRIC.clone()),
    ];
    for collector in collectors {
        if let Err(e) = registry.register(collector) {
            warn!(error = %e, "collector can not be registered");
        }
    }
}

#[cfg_attr(test, automock)]
pub trait StatusReporter: Send + Sync + 'static {
    /// Aggregate number of notifications queued across all lanes
    fn report_queue_size(
        &self,
        tag: &str,
        depth: usize,
    );

    fn record_cascaded(
        &self,
        tag: &str,
        action: CascadeAction,
        count: usize,
    );

    fn record_group_failure(
        &self,
        tag: &str,
    );

    fn record_derivation_failure(
        &self,
        tag: &str,
        key_type: KeyType,
    );
}

#[derive(Debug, Default, Clone, Copy)]
pub struct PrometheusStatusReporter;

impl StatusReporter for PrometheusStatusReporter {
    fn report_queue_size(
        &self,
        tag: &str,
        depth: usize,
    ) {
        QUEUE_SIZE_METRIC
            .with_label_values(&[tag])
            .set(i64::try_from(depth).unwrap_or(i64::MAX));
    }

    fn record_cascaded(
        &self,
        tag: &str,
        action: CascadeAction,
        count: usize,
    ) {
        CASCADED_ENTRIES_METRIC
            .with_label_values(&[tag, action.as_str()])
            .inc_by(count as u64);
    }

    fn record_group_failure(
        &self,
        tag: &str,
    ) {
        GROUP_FAILURES_METRIC.with_label_values(&[tag]).inc();
    }

    fn record_derivation_failure(
        &self,
        tag: &str,
        key_type: KeyType,
    ) {
        DERIVATION_FAILURES_METRIC.with_label_values(&[tag, key_type.as_str()]).inc();
    }
}

/// Discards every report
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopStatusReporter;

impl StatusReporter for NoopStatusReporter {
    fn report_queue_size(
        &self,
        _tag: &str,
        _depth: usize,
    ) {
    }

    fn record_cascaded(
        &self,
        _tag: &str,
        _action: CascadeAction,
        _count: usize,
    ) {
    }

    fn record_group_failure(
        &self,
        _tag: &str,
    ) {
    }

    fn record_derivation_failure(
        &self,
        _tag: &str,
        _key_type: KeyType,
    ) {
    }
}
