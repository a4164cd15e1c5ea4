use std::fmt;
use std::sync::Arc;

use crate::KeyRef;
use crate::SessionMetadata;

/// What the engine does to relevant entries
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum CascadeAction {
    /// Remove relevant entries of expired primary entries
    #[default]
    Expire,
    /// Reset the idle timer of relevant entries of accessed primary entries
    ResetIdleTimeout,
}

impl CascadeAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            CascadeAction::Expire => "expire",
            CascadeAction::ResetIdleTimeout => "reset_idle_timeout",
        }
    }
}

impl fmt::Display for CascadeAction {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
pub enum Payload {
    /// Primary key, correlated through the primary cache's strategy
    Key(KeyRef),
    /// Primary value listing its relevant entries
    Metadata(Arc<SessionMetadata>),
}

/// A primary cache event queued for a worker lane
#[derive(Debug, Clone)]
pub struct Notification {
    pub primary_cache_name: String,
    pub payload: Payload,
}

impl Notification {
    pub fn key(
        primary_cache_name: impl Into<String>,
        key: KeyRef,
    ) -> Self {
        Self {
            primary_cache_name: primary_cache_name.into(),
            payload: Payload::Key(key),
        }
    }

    pub fn metadata(
        primary_cache_name: impl Into<String>,
        metadata: Arc<SessionMetadata>,
    ) -> Self {
        Self {
            primary_cache_name: primary_cache_name.into(),
            payload: Payload::Metadata(metadata),
        }
    }
}
