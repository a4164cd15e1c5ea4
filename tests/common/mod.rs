use std::any::Any;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use session_expiry::CacheKey;
use session_expiry::KeyRef;
use session_expiry::MemoryGrid;
use tokio::time::Instant;
use tracing_subscriber::EnvFilter;

pub const WAIT_FOR_CASCADE: Duration = Duration::from_secs(3);

static LOGGER_INIT: once_cell::sync::Lazy<()> = once_cell::sync::Lazy::new(|| {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
});

pub fn enable_logger() {
    *LOGGER_INIT;
    println!("setup logger for integration test.");
}

/// Polls `condition` every few milliseconds until it holds or `timeout` elapses.
///
/// Mirrors the unit test `test_utils::wait_until`, which is only built under `cfg(test)`.
pub async fn wait_until<F, Fut>(
    timeout: Duration,
    mut condition: F,
) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = Instant::now() + timeout;
    loop {
        if condition().await {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

pub fn grid(names: &[&str]) -> Arc<MemoryGrid> {
    let grid = MemoryGrid::new();
    for name in names {
        grid.create_cache(*name);
    }
    Arc::new(grid)
}

/// Shopping cart line keyed by its owning session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartKey {
    pub session: String,
    pub sku: String,
}

impl CartKey {
    #[allow(dead_code)]
    pub fn shared(
        session: &str,
        sku: &str,
    ) -> KeyRef {
        Arc::new(Self {
            session: session.to_string(),
            sku: sku.to_string(),
        })
    }
}

impl fmt::Display for CartKey {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "cart:{}:{}", self.session, self.sku)
    }
}

impl CacheKey for CartKey {
    fn property(
        &self,
        name: &str,
    ) -> Result<Option<String>, session_expiry::KeyAccessError> {
        match name {
            "session" => Ok(Some(self.session.clone())),
            "sku" => Ok(Some(self.sku.clone())),
            _ => Err(session_expiry::KeyAccessError::UnknownProperty {
                property: name.to_string(),
                key: self.to_string(),
            }),
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Key co-located with its session through the partition key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AffinityKey {
    pub session: String,
    pub item: String,
}

impl AffinityKey {
    #[allow(dead_code)]
    pub fn shared(
        session: &str,
        item: &str,
    ) -> KeyRef {
        Arc::new(Self {
            session: session.to_string(),
            item: item.to_string(),
        })
    }
}

impl fmt::Display for AffinityKey {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "{}/{}", self.session, self.item)
    }
}

impl CacheKey for AffinityKey {
    fn partition_key(&self) -> Option<String> {
        Some(self.session.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
