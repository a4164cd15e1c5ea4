//! Entry event intake.
//!
//! The host's cache layer forwards primary cache events here. An engine only
//! reacts to the event kinds of its [`CascadeAction`]; everything else is
//! ignored.


use std::fmt;
use std::sync::Arc;

use tracing::trace;

use crate::CascadeAction;
use crate::ExpirationEngine;
use crate::KeyRef;
use crate::Notification;
use crate::SessionMetadata;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryEventKind {
    Added,
    Updated,
    Merged,
    Expired,
    Removed,
    Evicted,
}

impl EntryEventKind {
    /// Whether an engine running `action` cascades this kind of event.
    pub fn triggers(
        &self,
        action: CascadeAction,
    ) -> bool {
        match action {
            CascadeAction::Expire => matches!(self, EntryEventKind::Expired),
            CascadeAction::ResetIdleTimeout => matches!(
                self,
                EntryEventKind::Added | EntryEventKind::Updated | EntryEventKind::Merged
            ),
        }
    }
}

impl fmt::Display for EntryEventKind {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        let name = match self {
            EntryEventKind::Added => "added",
            EntryEventKind::Updated => "updated",
            EntryEventKind::Merged => "merged",
            EntryEventKind::Expired => "expired",
            EntryEventKind::Removed => "removed",
            EntryEventKind::Evicted => "evicted",
        };
        f.write_str(name)
    }
}

/// An event on a primary cache entry.
///
/// `metadata` is set when the entry's value is a [`SessionMetadata`]; the
/// cascade then uses the listed entries instead of correlating by key.
#[derive(Debug, Clone)]
pub struct EntryEvent {
    pub cache_name: String,
    pub kind: EntryEventKind,
    pub key: KeyRef,
    pub metadata: Option<Arc<SessionMetadata>>,
}

impl EntryEvent {
    pub fn new(
        cache_name: impl Into<String>,
        kind: EntryEventKind,
        key: KeyRef,
    ) -> Self {
        Self {
            cache_name: cache_name.into(),
            kind,
            key,
            metadata: None,
        }
    }

    pub fn expired(
        cache_name: impl Into<String>,
        key: KeyRef,
    ) -> Self {
        Self::new(cache_name, EntryEventKind::Expired, key)
    }

    pub fn with_metadata(
        mut self,
        metadata: Arc<SessionMetadata>,
    ) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub(crate) fn into_notification(self) -> Notification {
        match self.metadata {
            Some(metadata) => Notification::metadata(self.cache_name, metadata),
            None => Notification::key(self.cache_name, self.key),
        }
    }
}

/// Receives primary cache entry events. Called on the event delivery thread,
/// so implementations must not block.
pub trait EntryListener: Send + Sync {
    fn on_entry_event(
        &self,
        event: EntryEvent,
    );
}

impl EntryListener for ExpirationEngine {
    fn on_entry_event(
        &self,
        event: EntryEvent,
    ) {
        if !event.kind.triggers(self.action()) {
            trace!(
                primary_cache = %event.cache_name,
                kind = %event.kind,
                action = %self.action(),
                "Ignoring entry event"
            );
            return;
        }
        self.submit_notification(event.into_notification());
    }
}
