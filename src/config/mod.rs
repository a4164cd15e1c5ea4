//! Configuration management for the expiration cascade engine.
//!
//! Two entry points produce the same [`ExpirationConfig`]:
//! - hierarchical loading ([`ExpirationConfig::new`]): defaults, then the file named by
//!   `CONFIG_PATH`, then `EXPIRATION__*` environment variables
//! - a flat `session.expiration.*` property map ([`ExpirationConfig::from_properties`])
//!
//! Invalid values never fail the engine. [`ExpirationConfig::sanitize`] replaces
//! them with defaults and logs a warning.

mod properties;


use std::env;
use std::time::Duration;

use config::Config;
use config::Environment;
use config::File;
use serde::Deserialize;
use serde::Serialize;
use tracing::warn;

use crate::constants::DEFAULT_KEY_DELIMITER;
use crate::constants::DEFAULT_QUEUE_DRAIN_SIZE;
use crate::constants::DEFAULT_SHUTDOWN_GRACE_PERIOD_MS;
use crate::constants::DEFAULT_TAG;
use crate::constants::DEFAULT_THREAD_POOL_SIZE;
use crate::Result;

const ENV_PREFIX: &str = "EXPIRATION";

/// Where the session identifier sits inside a `STRING` key
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StringKeyPosition {
    /// `<session><delimiter><rest>`
    #[default]
    Prefix,
    /// `<rest><delimiter><session>`
    Postfix,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum ProcessingMode {
    /// One combined predicate per primary cache group
    #[default]
    Batched,
    /// One predicate per notification, removal through the local key set
    PerEvent,
}

/// Relevant caches of one primary cache pattern.
///
/// `key_type` stays a string so that an unknown value degrades to `STRING`
/// instead of failing deserialization.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct SessionConfig {
    /// Primary cache name pattern, may contain `%TAG%`
    pub pattern: String,

    /// Relevant cache name patterns (regex, may contain `%TAG%`)
    #[serde(default)]
    pub relevant: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_type: Option<String>,

    /// Property read from `OBJECT` keys
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_property: Option<String>,

    /// Identifier of the registered predicate provider for `CUSTOM` keys
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_predicate: Option<String>,
}

impl SessionConfig {
    pub fn new<I, S>(
        pattern: impl Into<String>,
        relevant: I,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            pattern: pattern.into(),
            relevant: relevant.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    pub fn with_key_type(
        mut self,
        key_type: impl Into<String>,
    ) -> Self {
        self.key_type = Some(key_type.into());
        self
    }

    pub fn with_key_property(
        mut self,
        property: impl Into<String>,
    ) -> Self {
        self.key_property = Some(property.into());
        self
    }

    pub fn with_key_predicate(
        mut self,
        provider_id: impl Into<String>,
    ) -> Self {
        self.key_predicate = Some(provider_id.into());
        self
    }
}

/// Engine configuration
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ExpirationConfig {
    /// Tag attached to log lines and metric labels
    #[serde(default = "default_tag")]
    pub tag: String,

    /// Separator between session id and the rest of a `STRING` key
    #[serde(default = "default_key_delimiter")]
    pub key_delimiter: String,

    #[serde(default)]
    pub string_key_position: StringKeyPosition,

    /// Maximum number of notifications drained after the first one of a batch
    #[serde(default = "default_queue_drain_size")]
    pub queue_drain_size: usize,

    /// Number of worker lanes
    #[serde(default = "default_thread_pool_size")]
    pub thread_pool_size: usize,

    #[serde(default)]
    pub processing_mode: ProcessingMode,

    /// Upper bound for [`crate::ExpirationEngine::shutdown`] to wait on lanes
    #[serde(default = "default_shutdown_grace_period_ms")]
    pub shutdown_grace_period_ms: u64,

    /// Primary cache patterns in resolution order
    #[serde(default)]
    pub sessions: Vec<SessionConfig>,
}

fn default_tag() -> String {
    DEFAULT_TAG.to_string()
}

fn default_key_delimiter() -> String {
    DEFAULT_KEY_DELIMITER.to_string()
}

fn default_queue_drain_size() -> usize {
    DEFAULT_QUEUE_DRAIN_SIZE
}

fn default_thread_pool_size() -> usize {
    DEFAULT_THREAD_POOL_SIZE
}

fn default_shutdown_grace_period_ms() -> u64 {
    DEFAULT_SHUTDOWN_GRACE_PERIOD_MS
}

impl Default for ExpirationConfig {
    fn default() -> Self {
        Self {
            tag: default_tag(),
            key_delimiter: default_key_delimiter(),
            string_key_position: StringKeyPosition::default(),
            queue_drain_size: default_queue_drain_size(),
            thread_pool_size: default_thread_pool_size(),
            processing_mode: ProcessingMode::default(),
            shutdown_grace_period_ms: default_shutdown_grace_period_ms(),
            sessions: Vec::new(),
        }
    }
}

impl ExpirationConfig {
    /// Loads configuration from hierarchical sources without sanitizing.
    ///
    /// Sources are merged in the following order (later sources override earlier):
    /// 1. Type defaults
    /// 2. Configuration file from `CONFIG_PATH` environment variable (if set)
    /// 3. Environment variables with `EXPIRATION__` prefix
    ///
    /// # Examples
    /// ```ignore
    /// std::env::set_var("EXPIRATION__THREAD_POOL_SIZE", "4");
    /// let cfg = ExpirationConfig::new()?.sanitize();
    /// ```
    pub fn new() -> Result<Self> {
        let mut builder = Config::builder().add_source(Config::try_from(&Self::default())?);

        if let Ok(config_path) = env::var("CONFIG_PATH") {
            builder = builder.add_source(File::with_name(&config_path).required(true));
        }

        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .ignore_empty(true)
                .try_parsing(true),
        );

        let config: Self = builder.build()?.try_deserialize()?;
        Ok(config)
    }

    /// Applies overrides from `path` on top of the current values, then the
    /// latest environment variables.
    pub fn with_override_config(
        &self,
        path: &str,
    ) -> Result<Self> {
        let config: Self = Config::builder()
            .add_source(Config::try_from(self)?)
            .add_source(File::with_name(path))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .ignore_empty(true)
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;
        Ok(config)
    }

    /// Replaces invalid values with their defaults.
    pub fn sanitize(mut self) -> Self {
        if self.thread_pool_size == 0 {
            warn!(
                tag = %self.tag,
                default = DEFAULT_THREAD_POOL_SIZE,
                "thread_pool_size must be positive, using default"
            );
            self.thread_pool_size = DEFAULT_THREAD_POOL_SIZE;
        }
        if self.key_delimiter.is_empty() {
            warn!(
                tag = %self.tag,
                default = DEFAULT_KEY_DELIMITER,
                "key_delimiter must not be empty, using default"
            );
            self.key_delimiter = DEFAULT_KEY_DELIMITER.to_string();
        }
        if self.tag.trim().is_empty() {
            self.tag = DEFAULT_TAG.to_string();
        }

        let tag = self.tag.clone();
        self.sessions.retain(|session| {
            if session.pattern.trim().is_empty() {
                warn!(tag = %tag, "Dropping session entry with an empty primary cache pattern");
                return false;
            }
            true
        });
        for session in &mut self.sessions {
            session.relevant = session
                .relevant
                .iter()
                .map(|p| p.trim())
                .filter(|p| !p.is_empty())
                .map(str::to_string)
                .collect();
            if session.relevant.is_empty() {
                warn!(
                    tag = %tag,
                    pattern = %session.pattern,
                    "Primary cache pattern has no relevant caches"
                );
            }
        }
        self
    }

    pub fn is_postfix(&self) -> bool {
        self.string_key_position == StringKeyPosition::Postfix
    }

    pub fn shutdown_grace_period(&self) -> Duration {
        Duration::from_millis(self.shutdown_grace_period_ms)
    }
}
