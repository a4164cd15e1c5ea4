use std::collections::HashMap;
use std::str::FromStr;

use tracing::debug;
use tracing::warn;

use super::ExpirationConfig;
use super::ProcessingMode;
use super::SessionConfig;
use super::StringKeyPosition;
use crate::constants::*;

#[derive(Default)]
struct SessionEntry {
    config: SessionConfig,
    /// Set once the `session.expiration.session.<pattern>` line itself was seen
    listed: bool,
}

impl ExpirationConfig {
    /// Builds a configuration from a flat `session.expiration.*` property map.
    ///
    /// Primary cache patterns keep the iteration order of `properties`, which is
    /// also their resolution order. Sub-keys (`.key.type`, `.key.property`,
    /// `.key.predicate`) of a pattern without a relevant cache list are ignored.
    /// Unparseable values keep their defaults.
    ///
    /// # Example
    /// ```
    /// use session_expiry::ExpirationConfig;
    ///
    /// let config = ExpirationConfig::from_properties([
    ///     ("session.expiration.session.smkp_%TAG%", "mkp_%TAG%_.*,mmkp_%TAG%_.*"),
    ///     ("session.expiration.session.smkp_%TAG%.key.type", "interface"),
    /// ]);
    /// assert_eq!(config.sessions[0].relevant.len(), 2);
    /// ```
    pub fn from_properties<I, K, V>(properties: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut config = ExpirationConfig::default();
        let mut order: Vec<String> = Vec::new();
        let mut sessions: HashMap<String, SessionEntry> = HashMap::new();

        let properties: Vec<(String, String)> = properties
            .into_iter()
            .map(|(k, v)| (k.as_ref().trim().to_string(), v.as_ref().trim().to_string()))
            .collect();

        // Tag first, so that later warnings carry it
        if let Some((_, tag)) = properties.iter().find(|(k, _)| k == PROPERTY_TAG) {
            if !tag.is_empty() {
                config.tag = tag.clone();
            }
        }

        for (key, value) in &properties {
            match key.as_str() {
                PROPERTY_TAG => {}
                PROPERTY_KEY_DELIMITER => {
                    if !value.is_empty() {
                        config.key_delimiter = value.clone();
                    }
                }
                PROPERTY_STRING_KEY_POSTFIX_ENABLED => {
                    let value = value.to_ascii_lowercase();
                    if let Some(enabled) = parse_value::<bool>(&config.tag, key, &value) {
                        config.string_key_position = if enabled {
                            StringKeyPosition::Postfix
                        } else {
                            StringKeyPosition::Prefix
                        };
                    }
                }
                PROPERTY_QUEUE_DRAIN_SIZE => {
                    if let Some(size) = parse_value(&config.tag, key, value) {
                        config.queue_drain_size = size;
                    }
                }
                PROPERTY_THREAD_POOL_SIZE => {
                    if let Some(size) = parse_value(&config.tag, key, value) {
                        config.thread_pool_size = size;
                    }
                }
                PROPERTY_SHUTDOWN_GRACE_PERIOD_MS => {
                    if let Some(ms) = parse_value(&config.tag, key, value) {
                        config.shutdown_grace_period_ms = ms;
                    }
                }
                PROPERTY_PROCESSING_MODE => match parse_processing_mode(value) {
                    Some(mode) => config.processing_mode = mode,
                    None => warn!(
                        tag = %config.tag,
                        property = %key,
                        value = %value,
                        "Invalid processing mode, using default"
                    ),
                },
                _ => {
                    let Some(rest) = key.strip_prefix(PROPERTY_SESSION_PREFIX) else {
                        if key.starts_with(PROPERTY_PREFIX) {
                            debug!(tag = %config.tag, property = %key, "Ignoring unknown property");
                        }
                        continue;
                    };
                    apply_session_property(&mut sessions, &mut order, rest, value);
                }
            }
        }

        for pattern in order {
            let Some(entry) = sessions.remove(&pattern) else {
                continue;
            };
            if !entry.listed {
                warn!(
                    tag = %config.tag,
                    pattern = %pattern,
                    "Session sub-properties without a relevant cache list are ignored"
                );
                continue;
            }
            config.sessions.push(entry.config);
        }

        config
    }
}

fn apply_session_property(
    sessions: &mut HashMap<String, SessionEntry>,
    order: &mut Vec<String>,
    rest: &str,
    value: &str,
) {
    let value = (!value.is_empty()).then(|| value.to_string());

    if let Some(pattern) = rest.strip_suffix(SESSION_KEY_TYPE_SUFFIX) {
        session_entry(sessions, order, pattern).config.key_type = value;
    } else if let Some(pattern) = rest.strip_suffix(SESSION_KEY_PROPERTY_SUFFIX) {
        session_entry(sessions, order, pattern).config.key_property = value;
    } else if let Some(pattern) = rest.strip_suffix(SESSION_KEY_PREDICATE_SUFFIX) {
        session_entry(sessions, order, pattern).config.key_predicate = value;
    } else {
        let entry = session_entry(sessions, order, rest);
        entry.listed = true;
        entry.config.relevant = value
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(str::to_string)
            .collect();
    }
}

fn session_entry<'a>(
    sessions: &'a mut HashMap<String, SessionEntry>,
    order: &mut Vec<String>,
    pattern: &str,
) -> &'a mut SessionEntry {
    if !sessions.contains_key(pattern) {
        order.push(pattern.to_string());
    }
    let entry = sessions.entry(pattern.to_string()).or_default();
    entry.config.pattern = pattern.to_string();
    entry
}

fn parse_value<T>(
    tag: &str,
    key: &str,
    value: &str,
) -> Option<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match value.parse::<T>() {
        Ok(v) => Some(v),
        Err(e) => {
            warn!(
                tag = %tag,
                property = %key,
                value = %value,
                error = %e,
                "Invalid property value, using default"
            );
            None
        }
    }
}

fn parse_processing_mode(value: &str) -> Option<ProcessingMode> {
    match value.to_ascii_lowercase().replace('_', "-").as_str() {
        "batched" | "batch" => Some(ProcessingMode::Batched),
        "per-event" | "single" => Some(ProcessingMode::PerEvent),
        _ => None,
    }
}
