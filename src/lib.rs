//! Session expiration cascade for distributed key-value grids.
//!
//! A *primary* cache holds one entry per user session. When such an entry
//! expires (or is accessed), every entry of the session held in *relevant*
//! caches is removed (or has its idle timer reset). Relevant entries are
//! correlated to the session through the key strategy configured for the
//! primary cache.
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use session_expiry::string_key;
//! use session_expiry::ExpirationConfig;
//! use session_expiry::ExpirationEngine;
//! use session_expiry::MemoryGrid;
//! use session_expiry::SessionConfig;
//!
//! # async fn run() -> session_expiry::Result<()> {
//! let grid = Arc::new(MemoryGrid::new());
//! let mut config = ExpirationConfig::default();
//! config.sessions.push(SessionConfig::new("primary_%TAG%", ["relevant_%TAG%_.*"]));
//!
//! let engine = ExpirationEngine::builder()
//!     .with_config(config)
//!     .with_gateway(grid.clone())
//!     .build()?;
//!
//! engine.submit("primary_web", string_key("s1"));
//! engine.shutdown().await;
//! # Ok(())
//! # }
//! ```

mod config;
mod correlation;
mod engine;
mod errors;
mod gateway;
mod key;
mod listener;
mod metadata;
mod metrics;
mod predicate;
mod spec;
mod tag;

pub mod constants;

pub use config::*;
pub use correlation::*;
pub use engine::*;
pub use errors::*;
pub use gateway::*;
pub use key::*;
pub use listener::*;
pub use metadata::*;
pub use metrics::*;
pub use predicate::*;
pub use spec::*;
pub use tag::*;

//-----------------------------------------------------------
// Test utils

#[cfg(test)]
pub mod test_utils;
