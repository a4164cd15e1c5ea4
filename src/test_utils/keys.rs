use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::CacheKey;
use crate::KeyAccessError;
use crate::KeyRef;

/// Key exposing its session through [`CacheKey::session_id`]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InterfaceKey {
    pub session: String,
    pub attribute: String,
}

impl InterfaceKey {
    pub fn new(
        session: impl Into<String>,
        attribute: impl Into<String>,
    ) -> Self {
        Self {
            session: session.into(),
            attribute: attribute.into(),
        }
    }

    pub fn shared(
        session: &str,
        attribute: &str,
    ) -> KeyRef {
        Arc::new(Self::new(session, attribute))
    }
}

impl fmt::Display for InterfaceKey {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "InterfaceKey({}, {})", self.session, self.attribute)
    }
}

impl CacheKey for InterfaceKey {
    fn session_id(&self) -> Option<String> {
        Some(self.session.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Key routed by [`CacheKey::partition_key`]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PartitionAwareKey {
    pub partition: String,
    pub attribute: String,
}

impl PartitionAwareKey {
    pub fn new(
        partition: impl Into<String>,
        attribute: impl Into<String>,
    ) -> Self {
        Self {
            partition: partition.into(),
            attribute: attribute.into(),
        }
    }

    pub fn shared(
        partition: &str,
        attribute: &str,
    ) -> KeyRef {
        Arc::new(Self::new(partition, attribute))
    }
}

impl fmt::Display for PartitionAwareKey {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "PartitionAwareKey({}, {})", self.partition, self.attribute)
    }
}

impl CacheKey for PartitionAwareKey {
    fn partition_key(&self) -> Option<String> {
        Some(self.partition.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Plain struct key queried by named property
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectKey {
    pub session: String,
    pub attribute: String,
}

impl ObjectKey {
    pub fn new(
        session: impl Into<String>,
        attribute: impl Into<String>,
    ) -> Self {
        Self {
            session: session.into(),
            attribute: attribute.into(),
        }
    }

    pub fn shared(
        session: &str,
        attribute: &str,
    ) -> KeyRef {
        Arc::new(Self::new(session, attribute))
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "ObjectKey({}, {})", self.session, self.attribute)
    }
}

impl CacheKey for ObjectKey {
    fn property(
        &self,
        name: &str,
    ) -> std::result::Result<Option<String>, KeyAccessError> {
        match name {
            "session" => Ok(Some(self.session.clone())),
            "attribute" => Ok(Some(self.attribute.clone())),
            _ => Err(KeyAccessError::UnknownProperty {
                property: name.to_string(),
                key: self.to_string(),
            }),
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
