//! Per primary cache pattern correlation settings.
//!
//! A [`SessionSpec`] is built once from a [`SessionConfig`]. Configuration
//! mistakes (unknown key type, `OBJECT` without a property, `CUSTOM` without a
//! registered provider) never fail: the spec degrades to [`KeyStrategy::String`]
//! and a warning is logged.

mod registry;

pub use registry::*;


use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use tracing::warn;

use crate::KeyAccessor;
use crate::SessionConfig;
use crate::SessionPredicateProvider;
use crate::TagTemplate;

/// How a primary key yields the identifier shared with its relevant entries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyType {
    Custom,
    Interface,
    Object,
    PartitionAware,
    String,
}

impl KeyType {
    pub fn as_str(&self) -> &'static str {
        match self {
            KeyType::Custom => "CUSTOM",
            KeyType::Interface => "INTERFACE",
            KeyType::Object => "OBJECT",
            KeyType::PartitionAware => "PARTITION_AWARE",
            KeyType::String => "STRING",
        }
    }
}

impl fmt::Display for KeyType {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for KeyType {
    type Err = String;

    /// Case-insensitive
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "CUSTOM" => Ok(KeyType::Custom),
            "INTERFACE" => Ok(KeyType::Interface),
            "OBJECT" => Ok(KeyType::Object),
            "PARTITION_AWARE" => Ok(KeyType::PartitionAware),
            "STRING" => Ok(KeyType::String),
            other => Err(format!("Invalid key type [{other}]")),
        }
    }
}

#[derive(Clone)]
pub enum KeyStrategy {
    Interface,
    Object {
        accessor: KeyAccessor,
    },
    PartitionAware,
    Custom {
        provider_id: String,
        provider: Arc<dyn SessionPredicateProvider>,
    },
    String,
}

impl KeyStrategy {
    pub fn key_type(&self) -> KeyType {
        match self {
            KeyStrategy::Interface => KeyType::Interface,
            KeyStrategy::Object { .. } => KeyType::Object,
            KeyStrategy::PartitionAware => KeyType::PartitionAware,
            KeyStrategy::Custom { .. } => KeyType::Custom,
            KeyStrategy::String => KeyType::String,
        }
    }
}

impl fmt::Debug for KeyStrategy {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match self {
            KeyStrategy::Object { accessor } => {
                f.debug_struct("Object").field("property", &accessor.name()).finish()
            }
            KeyStrategy::Custom { provider_id, .. } => {
                f.debug_struct("Custom").field("provider_id", provider_id).finish()
            }
            other => f.write_str(other.key_type().as_str()),
        }
    }
}

/// Accessors and predicate providers supplied by the host at construction time
#[derive(Clone, Default)]
pub struct KeyExtensions {
    accessors: HashMap<String, KeyAccessor>,
    providers: HashMap<String, Arc<dyn SessionPredicateProvider>>,
}

impl KeyExtensions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `accessor` under its property name for `OBJECT` keys.
    pub fn with_accessor(
        mut self,
        accessor: KeyAccessor,
    ) -> Self {
        self.accessors.insert(accessor.name().to_string(), accessor);
        self
    }

    /// Registers a `CUSTOM` predicate provider referenced by `.key.predicate`.
    pub fn with_predicate_provider(
        mut self,
        id: impl Into<String>,
        provider: Arc<dyn SessionPredicateProvider>,
    ) -> Self {
        self.providers.insert(id.into(), provider);
        self
    }

    pub fn accessor(
        &self,
        property: &str,
    ) -> Option<&KeyAccessor> {
        self.accessors.get(property)
    }

    pub fn provider(
        &self,
        id: &str,
    ) -> Option<&Arc<dyn SessionPredicateProvider>> {
        self.providers.get(id)
    }
}

impl fmt::Debug for KeyExtensions {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        let mut providers: Vec<&String> = self.providers.keys().collect();
        providers.sort();
        f.debug_struct("KeyExtensions")
            .field("accessors", &self.accessors.keys().collect::<Vec<_>>())
            .field("providers", &providers)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct SessionSpec {
    pattern: TagTemplate,
    relevant_patterns: Vec<String>,
    strategy: KeyStrategy,
}

impl SessionSpec {
    pub fn new(
        pattern: impl Into<String>,
        relevant_patterns: Vec<String>,
        strategy: KeyStrategy,
    ) -> Self {
        Self {
            pattern: TagTemplate::new(pattern),
            relevant_patterns,
            strategy,
        }
    }

    /// Resolves the configured key type against `extensions`, degrading to
    /// `STRING` on any inconsistency.
    pub fn from_config(
        config: &SessionConfig,
        extensions: &KeyExtensions,
        tag: &str,
    ) -> Self {
        let strategy = resolve_strategy(config, extensions, tag);
        Self::new(config.pattern.clone(), config.relevant.clone(), strategy)
    }

    pub fn pattern(&self) -> &TagTemplate {
        &self.pattern
    }

    pub fn relevant_patterns(&self) -> &[String] {
        &self.relevant_patterns
    }

    pub fn strategy(&self) -> &KeyStrategy {
        &self.strategy
    }

    pub fn key_type(&self) -> KeyType {
        self.strategy.key_type()
    }
}

fn resolve_strategy(
    config: &SessionConfig,
    extensions: &KeyExtensions,
    tag: &str,
) -> KeyStrategy {
    let pattern = &config.pattern;
    let key_type = match config.key_type.as_deref() {
        None => return KeyStrategy::String,
        Some(raw) => match raw.parse::<KeyType>() {
            Ok(key_type) => key_type,
            Err(e) => {
                warn!(tag, pattern = %pattern, error = %e, "Invalid key type, defaulting to STRING");
                return KeyStrategy::String;
            }
        },
    };

    match key_type {
        KeyType::Interface => KeyStrategy::Interface,
        KeyType::PartitionAware => KeyStrategy::PartitionAware,
        KeyType::String => KeyStrategy::String,
        KeyType::Object => {
            let Some(property) = config.key_property.as_deref().filter(|p| !p.is_empty()) else {
                warn!(
                    tag,
                    pattern = %pattern,
                    "key.property undefined for key type OBJECT, defaulting to STRING"
                );
                return KeyStrategy::String;
            };
            let accessor = extensions
                .accessor(property)
                .cloned()
                .unwrap_or_else(|| KeyAccessor::property(property));
            KeyStrategy::Object { accessor }
        }
        KeyType::Custom => {
            let Some(provider_id) = config.key_predicate.as_deref().filter(|p| !p.is_empty())
            else {
                warn!(
                    tag,
                    pattern = %pattern,
                    "key.predicate undefined for key type CUSTOM, defaulting to STRING"
                );
                return KeyStrategy::String;
            };
            match extensions.provider(provider_id) {
                Some(provider) => KeyStrategy::Custom {
                    provider_id: provider_id.to_string(),
                    provider: provider.clone(),
                },
                None => {
                    warn!(
                        tag,
                        pattern = %pattern,
                        provider = %provider_id,
                        "Predicate provider not registered, defaulting to STRING"
                    );
                    KeyStrategy::String
                }
            }
        }
    }
}
