use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;

use crate::MemoryGrid;

/// Polls `condition` every few milliseconds until it holds or `timeout` elapses.
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

/// Creates `names` on a fresh single-node grid.
pub fn grid_with_caches(names: &[&str]) -> MemoryGrid {
    let grid = MemoryGrid::new();
    for name in names {
        grid.create_cache(*name);
    }
    grid
}
