//! Case 1: STRING keys correlate through a delimiter.
//!
//! Scenario:
//!
//! 1. Configure `primary_%TAG%` with relevant patterns `relevant_%TAG%_.*` and `audit_%TAG%`
//!    through the flat property map.
//! 2. Fill relevant caches of two tags (`web`, `mobile`) with entries of two sessions.
//! 3. Expire session `s1` of `primary_web`.
//!
//! Expected Result:
//!
//! - Every `s1` entry in `web` relevant caches is removed.
//! - Entries of `s2` and every entry of `mobile` caches survive.

use session_expiry::string_key;
use session_expiry::EntryEvent;
use session_expiry::EntryListener;
use session_expiry::ExpirationConfig;
use session_expiry::ExpirationEngine;
use session_expiry::NoopStatusReporter;
use std::sync::Arc;

use crate::common::enable_logger;
use crate::common::grid;
use crate::common::wait_until;
use crate::common::WAIT_FOR_CASCADE;

#[tokio::test]
async fn test_prefix_string_keys_cascade_within_the_tag() {
    enable_logger();
    let config = ExpirationConfig::from_properties([
        ("session.expiration.tag", "string_key_case1"),
        ("session.expiration.key.delimiter", "::"),
        (
            "session.expiration.session.primary_%TAG%",
            "relevant_%TAG%_.*, audit_%TAG%",
        ),
    ]);
    let grid = grid(&[
        "primary_web",
        "relevant_web_cart",
        "relevant_web_prefs",
        "audit_web",
        "relevant_mobile_cart",
    ]);
    for (cache, key) in [
        ("relevant_web_cart", "s1::a"),
        ("relevant_web_cart", "s2::a"),
        ("relevant_web_prefs", "s1::b"),
        ("audit_web", "s1::c"),
        ("relevant_mobile_cart", "s1::a"),
    ] {
        grid.put(cache, string_key(key), "v").expect("put");
    }

    let engine = ExpirationEngine::builder()
        .with_config(config)
        .with_gateway(grid.clone())
        .with_status_reporter(Arc::new(NoopStatusReporter))
        .build()
        .expect("engine builds");
    engine.on_entry_event(EntryEvent::expired("primary_web", string_key("s1")));

    let done = wait_until(WAIT_FOR_CASCADE, || {
        let grid = grid.clone();
        async move {
            grid.is_empty("relevant_web_prefs")
                && grid.is_empty("audit_web")
                && grid.len("relevant_web_cart") == 1
        }
    })
    .await;
    assert!(done);
    assert_eq!(grid.keys("relevant_web_cart"), vec!["s2::a"]);
    assert_eq!(grid.keys("relevant_mobile_cart"), vec!["s1::a"]);

    engine.shutdown().await;
}

#[tokio::test]
async fn test_postfix_string_keys_use_the_text_after_the_last_delimiter() {
    enable_logger();
    let config = ExpirationConfig::from_properties([
        ("session.expiration.tag", "string_key_case1"),
        ("session.expiration.string-key.postfix.enabled", "TRUE"),
        ("session.expiration.session.primary_%TAG%", "relevant_%TAG%"),
    ]);
    let grid = grid(&["primary_web", "relevant_web"]);
    for key in ["cart@s1", "prefs@cart@s1", "s1@cart", "cart@s2"] {
        grid.put("relevant_web", string_key(key), "v").expect("put");
    }

    let engine = ExpirationEngine::builder()
        .with_config(config)
        .with_gateway(grid.clone())
        .with_status_reporter(Arc::new(NoopStatusReporter))
        .build()
        .expect("engine builds");
    engine.on_entry_event(EntryEvent::expired("primary_web", string_key("login@s1")));

    let done = wait_until(WAIT_FOR_CASCADE, || {
        let grid = grid.clone();
        async move { grid.len("relevant_web") == 2 }
    })
    .await;
    assert!(done);
    assert_eq!(grid.keys("relevant_web"), vec!["cart@s2", "s1@cart"]);

    engine.shutdown().await;
}
