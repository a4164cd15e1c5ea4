//! Case 1: OBJECT keys correlate through a named key property.
//!
//! Scenario:
//!
//! 1. Configure `sessions_%TAG%` with key type OBJECT and key property `session`, and register a
//!    typed accessor for cart keys under that name.
//! 2. Store cart lines of two sessions plus a plain string entry in the relevant cache.
//! 3. Expire the primary entry of session `s1`, and one entry whose key is not a cart key.
//!
//! Expected Result:
//!
//! - Cart lines of `s1` are removed, those of `s2` survive.
//! - The plain string entry has no `session` property and is never matched.
//! - The foreign primary key is excluded and counted as a derivation failure.

use std::sync::Arc;

use session_expiry::string_key;
use session_expiry::ExpirationConfig;
use session_expiry::ExpirationEngine;
use session_expiry::KeyAccessor;
use session_expiry::KeyExtensions;
use session_expiry::KeyType;
use session_expiry::SessionConfig;
use session_expiry::DERIVATION_FAILURES_METRIC;

use crate::common::enable_logger;
use crate::common::grid;
use crate::common::wait_until;
use crate::common::CartKey;
use crate::common::WAIT_FOR_CASCADE;

#[tokio::test]
async fn test_object_keys_cascade_by_property() {
    enable_logger();
    let config = ExpirationConfig {
        tag: "object_key_case1".into(),
        sessions: vec![SessionConfig::new("sessions_%TAG%", ["carts_%TAG%"])
            .with_key_type("object")
            .with_key_property("session")],
        ..Default::default()
    };
    let extensions = KeyExtensions::new().with_accessor(KeyAccessor::typed::<CartKey, _>(
        "session",
        |key| Some(key.session.clone()),
    ));

    let grid = grid(&["sessions_eu", "carts_eu"]);
    grid.put("carts_eu", CartKey::shared("s1", "sku-1"), "1").expect("put");
    grid.put("carts_eu", CartKey::shared("s1", "sku-2"), "2").expect("put");
    grid.put("carts_eu", CartKey::shared("s2", "sku-1"), "1").expect("put");
    grid.put("carts_eu", string_key("s1"), "legacy").expect("put");

    let engine = ExpirationEngine::builder()
        .with_config(config)
        .with_extensions(extensions)
        .with_gateway(grid.clone())
        .build()
        .expect("engine builds");
    assert_eq!(
        engine.registry().specs()[0].key_type(),
        KeyType::Object
    );

    let failures = DERIVATION_FAILURES_METRIC.with_label_values(&["object_key_case1", "OBJECT"]);
    let failures_before = failures.get();

    engine.submit("sessions_eu", CartKey::shared("s1", "login"));
    engine.submit("sessions_eu", string_key("not-a-cart-key"));

    let done = wait_until(WAIT_FOR_CASCADE, || {
        let grid = grid.clone();
        async move { grid.len("carts_eu") == 2 }
    })
    .await;
    assert!(done);
    assert_eq!(grid.keys("carts_eu"), vec!["cart:s2:sku-1", "s1"]);

    let counted = wait_until(WAIT_FOR_CASCADE, || {
        let counted = failures.get() > failures_before;
        async move { counted }
    })
    .await;
    assert!(counted);

    engine.shutdown().await;
}
