//! Derives the predicate selecting relevant entries from primary keys.
//!
//! | strategy          | identifier                        | predicate                          |
//! |-------------------|-----------------------------------|------------------------------------|
//! | `INTERFACE`       | [`CacheKey::session_id`]          | `__key.sessionId IN (...)`         |
//! | `PARTITION_AWARE` | [`CacheKey::partition_key`]       | `__key.partitionKey IN (...)`      |
//! | `OBJECT`          | registered [`KeyAccessor`]        | `__key.<property> IN (...)`        |
//! | `CUSTOM`          | provider predicate per key        | OR of provider predicates          |
//! | `STRING`          | token before/after the delimiter  | OR of starts-with / ends-with      |
//!
//! Keys yielding no identifier are logged, counted and left out. An empty
//! identifier counts as no identifier.
//!
//! [`CacheKey::session_id`]: crate::CacheKey::session_id
//! [`CacheKey::partition_key`]: crate::CacheKey::partition_key
//! [`KeyAccessor`]: crate::KeyAccessor


use std::collections::BTreeSet;

use tracing::warn;

use crate::constants::KEY_ATTRIBUTE;
use crate::constants::KEY_PROPERTY_PREFIX;
use crate::constants::PARTITION_KEY_PROPERTY;
use crate::constants::SESSION_ID_PROPERTY;
use crate::KeyAccessError;
use crate::KeyRef;
use crate::KeyStrategy;
use crate::KeyType;
use crate::Predicate;
use crate::ResolvedTag;
use crate::StatusReporter;
use crate::StringKeyPosition;

/// Settings shared by every derivation of one engine.
pub struct Correlation<'a> {
    pub tag: &'a str,
    pub delimiter: &'a str,
    pub position: StringKeyPosition,
    pub reporter: &'a dyn StatusReporter,
}

impl Correlation<'_> {
    /// One predicate covering every key of a primary cache group, or `None`
    /// when no key yields an identifier.
    pub fn group_predicate(
        &self,
        resolved: &ResolvedTag,
        keys: &[KeyRef],
    ) -> Option<Predicate> {
        let primary = resolved.primary_cache_name.as_str();
        match resolved.spec.strategy() {
            KeyStrategy::Interface => {
                let ids = self.collect_ids(primary, KeyType::Interface, keys, |key| {
                    Ok(key.session_id())
                });
                in_predicate(SESSION_ID_PROPERTY, ids)
            }
            KeyStrategy::PartitionAware => {
                let ids = self.collect_ids(primary, KeyType::PartitionAware, keys, |key| {
                    Ok(key.partition_key())
                });
                in_predicate(PARTITION_KEY_PROPERTY, ids)
            }
            KeyStrategy::Object { accessor } => {
                let ids = self.collect_ids(primary, KeyType::Object, keys, |key| {
                    accessor.get(key.as_ref())
                });
                in_predicate(accessor.name(), ids)
            }
            KeyStrategy::Custom { provider, .. } => {
                let predicates = keys.iter().filter_map(|key| {
                    match provider.predicate(primary, key) {
                        Ok(Some(predicate)) => Some(predicate),
                        Ok(None) => None,
                        Err(e) => {
                            self.derivation_failed(primary, KeyType::Custom, key, &e);
                            None
                        }
                    }
                });
                Predicate::any_of(predicates.collect::<Vec<_>>())
            }
            KeyStrategy::String => {
                let ids = self.collect_ids(primary, KeyType::String, keys, |key| {
                    let key = key.to_string();
                    Ok(Some(string_session_id(&key, self.delimiter, self.position).to_string()))
                });
                Predicate::any_of(ids.into_iter().map(|id| match self.position {
                    StringKeyPosition::Prefix => {
                        Predicate::starts_with(KEY_ATTRIBUTE, format!("{id}{}", self.delimiter))
                    }
                    StringKeyPosition::Postfix => {
                        Predicate::ends_with(KEY_ATTRIBUTE, format!("{}{id}", self.delimiter))
                    }
                }))
            }
        }
    }

    /// Predicate of a single primary key.
    pub fn item_predicate(
        &self,
        resolved: &ResolvedTag,
        key: &KeyRef,
    ) -> Option<Predicate> {
        self.group_predicate(resolved, std::slice::from_ref(key))
    }

    fn collect_ids<F>(
        &self,
        primary: &str,
        key_type: KeyType,
        keys: &[KeyRef],
        derive: F,
    ) -> BTreeSet<String>
    where
        F: Fn(&KeyRef) -> std::result::Result<Option<String>, KeyAccessError>,
    {
        let mut ids = BTreeSet::new();
        for key in keys {
            match derive(key) {
                Ok(Some(id)) if !id.is_empty() => {
                    ids.insert(id);
                }
                Ok(_) => {
                    self.derivation_failed(primary, key_type, key, &"no session identifier");
                }
                Err(e) => self.derivation_failed(primary, key_type, key, &e),
            }
        }
        ids
    }

    fn derivation_failed(
        &self,
        primary: &str,
        key_type: KeyType,
        key: &KeyRef,
        reason: &dyn std::fmt::Display,
    ) {
        warn!(
            tag = %self.tag,
            primary_cache = %primary,
            key_type = %key_type,
            key = %key,
            reason = %reason,
            "Excluding key from cascade"
        );
        self.reporter.record_derivation_failure(self.tag, key_type);
    }
}

fn in_predicate(
    property: &str,
    ids: BTreeSet<String>,
) -> Option<Predicate> {
    if ids.is_empty() {
        return None;
    }
    Some(Predicate::in_set(format!("{KEY_PROPERTY_PREFIX}{property}"), ids))
}

/// Session identifier of a `STRING` key.
///
/// Prefix mode takes the text up to the first delimiter, postfix mode the
/// text after the last one. Without a delimiter the whole key is the identifier.
///
/// ```
/// use session_expiry::string_session_id;
/// use session_expiry::StringKeyPosition;
///
/// assert_eq!(string_session_id("s1@a1", "@", StringKeyPosition::Prefix), "s1");
/// assert_eq!(string_session_id("a1@s1", "@", StringKeyPosition::Postfix), "s1");
/// assert_eq!(string_session_id("s1", "@", StringKeyPosition::Prefix), "s1");
/// ```
pub fn string_session_id<'a>(
    key: &'a str,
    delimiter: &str,
    position: StringKeyPosition,
) -> &'a str {
    if delimiter.is_empty() {
        return key;
    }
    match position {
        StringKeyPosition::Prefix => key.find(delimiter).map_or(key, |i| &key[..i]),
        StringKeyPosition::Postfix => {
            key.rfind(delimiter).map_or(key, |i| &key[i + delimiter.len()..])
        }
    }
}
