//! Case 1: engine lifecycle under load.
//!
//! Scenario:
//!
//! 1. Start an engine with four lanes and a small drain size.
//! 2. Expire a burst of sessions.
//! 3. Shut the engine down.
//!
//! Expected Result:
//!
//! - Every relevant entry is removed and the queue drains to zero.
//! - Cascaded entries are counted per tag and action.
//! - After shutdown the engine is terminated and rejects new notifications.

use session_expiry::string_key;
use session_expiry::CascadeAction;
use session_expiry::ExpirationConfig;
use session_expiry::ExpirationEngine;
use session_expiry::CASCADED_ENTRIES_METRIC;

use crate::common::enable_logger;
use crate::common::grid;
use crate::common::wait_until;
use crate::common::WAIT_FOR_CASCADE;

const SESSIONS: usize = 200;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_burst_is_fully_cascaded_and_engine_shuts_down() {
    enable_logger();
    let config = ExpirationConfig::from_properties([
        ("session.expiration.tag", "lifecycle_case1"),
        ("session.expiration.thread-pool-size", "4"),
        ("session.expiration.queue.drain-size", "8"),
        ("session.expiration.shutdown.grace-period-ms", "2000"),
        ("session.expiration.session.web_sessions", "web_.*"),
    ]);
    let grid = grid(&["web_sessions", "web_cart", "web_prefs"]);
    for i in 0..SESSIONS {
        grid.put("web_cart", string_key(format!("s{i}@cart")), "v").expect("put");
        grid.put("web_prefs", string_key(format!("s{i}@prefs")), "v").expect("put");
    }

    let cascaded = CASCADED_ENTRIES_METRIC.with_label_values(&["lifecycle_case1", "expire"]);
    let cascaded_before = cascaded.get();

    let engine = ExpirationEngine::builder()
        .with_config(config)
        .with_action(CascadeAction::Expire)
        .with_gateway(grid.clone())
        .build()
        .expect("engine builds");
    assert_eq!(engine.lane_depths().len(), 4);

    for i in 0..SESSIONS {
        assert!(engine.submit("web_sessions", string_key(format!("s{i}"))));
    }

    let drained = wait_until(WAIT_FOR_CASCADE, || {
        let grid = grid.clone();
        let queued = engine.queue_size();
        async move { queued == 0 && grid.is_empty("web_cart") && grid.is_empty("web_prefs") }
    })
    .await;
    assert!(drained);

    let expected = (SESSIONS * 2) as u64;
    let counted = wait_until(WAIT_FOR_CASCADE, || {
        let counted = cascaded.get() - cascaded_before == expected;
        async move { counted }
    })
    .await;
    assert!(counted);

    engine.shutdown().await;
    assert!(engine.is_terminated());
    assert!(!engine.submit("web_sessions", string_key("late")));
}
