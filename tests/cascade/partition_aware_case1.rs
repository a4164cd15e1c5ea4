//! Case 1: PARTITION_AWARE keys only cascade on the member owning the partition.
//!
//! Scenario:
//!
//! 1. Start a grid member owning only the partition of session `s1`.
//! 2. Store relevant entries of `s1` and of a session living on another partition.
//! 3. Expire both sessions on this member.
//!
//! Expected Result:
//!
//! - Entries of `s1` are removed.
//! - Entries of the remote session are left to the member owning them.

use std::sync::Arc;

use session_expiry::ExpirationConfig;
use session_expiry::ExpirationEngine;
use session_expiry::MemoryGrid;
use session_expiry::NoopStatusReporter;
use session_expiry::SessionConfig;

use crate::common::enable_logger;
use crate::common::wait_until;
use crate::common::AffinityKey;
use crate::common::WAIT_FOR_CASCADE;

const PARTITIONS: usize = 8;

#[tokio::test]
async fn test_partition_aware_cascade_is_scoped_to_local_partitions() {
    enable_logger();
    let probe = MemoryGrid::with_partitions(PARTITIONS, 0..PARTITIONS);
    let local = probe.partition_of(AffinityKey::shared("s1", "x").as_ref());
    let remote = (2..100)
        .map(|i| format!("s{i}"))
        .find(|session| probe.partition_of(AffinityKey::shared(session, "x").as_ref()) != local)
        .expect("some session lives on another partition");

    let grid = Arc::new(MemoryGrid::with_partitions(PARTITIONS, [local]));
    for name in ["orders_eu", "order_lines_eu"] {
        grid.create_cache(name);
    }
    grid.put("order_lines_eu", AffinityKey::shared("s1", "line-1"), "v").expect("put");
    grid.put("order_lines_eu", AffinityKey::shared("s1", "line-2"), "v").expect("put");
    grid.put("order_lines_eu", AffinityKey::shared(&remote, "line-1"), "v").expect("put");

    let config = ExpirationConfig {
        tag: "partition_aware_case1".into(),
        sessions: vec![SessionConfig::new("orders_%TAG%", ["order_lines_%TAG%"])
            .with_key_type("PARTITION_AWARE")],
        ..Default::default()
    };
    let engine = ExpirationEngine::builder()
        .with_config(config)
        .with_gateway(grid.clone())
        .with_status_reporter(Arc::new(NoopStatusReporter))
        .build()
        .expect("engine builds");
    engine.submit("orders_eu", AffinityKey::shared("s1", "order"));
    engine.submit("orders_eu", AffinityKey::shared(&remote, "order"));

    let done = wait_until(WAIT_FOR_CASCADE, || {
        let grid = grid.clone();
        async move { grid.len("order_lines_eu") == 1 }
    })
    .await;
    assert!(done);
    assert_eq!(grid.keys("order_lines_eu"), vec![format!("{remote}/line-1")]);

    engine.shutdown().await;
}
