//! Case 1: CUSTOM keys delegate predicate construction to a registered provider.
//!
//! Scenario:
//!
//! 1. Register a provider that maps a primary key `<session>` to `__key LIKE '<session>|%'`.
//! 2. Expire three primary keys in one burst: one the provider rejects, one it skips and one it
//!    accepts, plus a second accepted key.
//!
//! Expected Result:
//!
//! - Relevant entries of the accepted sessions are removed.
//! - The rejected and skipped keys affect nothing and do not stop the others.

use std::sync::Arc;

use session_expiry::string_key;
use session_expiry::ExpirationConfig;
use session_expiry::ExpirationEngine;
use session_expiry::KeyExtensions;
use session_expiry::KeyRef;
use session_expiry::NoopStatusReporter;
use session_expiry::Predicate;
use session_expiry::ProviderError;
use session_expiry::SessionConfig;
use session_expiry::SessionPredicateProvider;

use crate::common::enable_logger;
use crate::common::grid;
use crate::common::wait_until;
use crate::common::WAIT_FOR_CASCADE;

struct PipeDelimitedProvider;

impl SessionPredicateProvider for PipeDelimitedProvider {
    fn predicate(
        &self,
        primary_cache: &str,
        key: &KeyRef,
    ) -> Result<Option<Predicate>, ProviderError> {
        match key.to_string().as_str() {
            "corrupted" => Err(ProviderError::new(primary_cache, "corrupted", "unreadable key")),
            "anonymous" => Ok(None),
            session => Ok(Some(Predicate::like("__key", format!("{session}|%")))),
        }
    }
}

#[tokio::test]
async fn test_custom_provider_predicates_are_combined() {
    enable_logger();
    let config = ExpirationConfig {
        tag: "custom_key_case1".into(),
        sessions: vec![SessionConfig::new("login", ["basket", "history"])
            .with_key_type("CUSTOM")
            .with_key_predicate("pipe-delimited")],
        ..Default::default()
    };
    let extensions = KeyExtensions::new()
        .with_predicate_provider("pipe-delimited", Arc::new(PipeDelimitedProvider));

    let grid = grid(&["login", "basket", "history"]);
    for (cache, key) in [
        ("basket", "s1|apples"),
        ("basket", "s2|pears"),
        ("basket", "s3|plums"),
        ("history", "s1|2024-01-01"),
        ("history", "anonymous|2024-01-01"),
        ("history", "corrupted|2024-01-01"),
    ] {
        grid.put(cache, string_key(key), "v").expect("put");
    }

    let engine = ExpirationEngine::builder()
        .with_config(config)
        .with_extensions(extensions)
        .with_gateway(grid.clone())
        .with_status_reporter(Arc::new(NoopStatusReporter))
        .build()
        .expect("engine builds");
    for key in ["corrupted", "s1", "anonymous", "s3"] {
        engine.submit("login", string_key(key));
    }

    let done = wait_until(WAIT_FOR_CASCADE, || {
        let grid = grid.clone();
        async move { grid.len("basket") == 1 && grid.len("history") == 2 }
    })
    .await;
    assert!(done);
    assert_eq!(grid.keys("basket"), vec!["s2|pears"]);
    assert_eq!(
        grid.keys("history"),
        vec!["anonymous|2024-01-01", "corrupted|2024-01-01"]
    );

    engine.shutdown().await;
}
