//! Key predicates applied against relevant caches.
//!
//! A predicate addresses either the key's string form ([`KEY_ATTRIBUTE`],
//! `__key`) or a named key property (`__key.<property>`). The grid evaluates
//! them against keys in locally owned partitions.

mod provider;

pub use provider::*;


use std::collections::BTreeSet;
use std::fmt;

use crate::constants::KEY_ATTRIBUTE;
use crate::constants::KEY_PROPERTY_PREFIX;
use crate::CacheKey;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    Equal {
        attribute: String,
        value: String,
    },
    In {
        attribute: String,
        values: BTreeSet<String>,
    },
    StartsWith {
        attribute: String,
        prefix: String,
    },
    EndsWith {
        attribute: String,
        suffix: String,
    },
    /// SQL `LIKE` with `%` (any sequence) and `_` (any char); `\` escapes
    Like {
        attribute: String,
        pattern: String,
    },
    Or(Vec<Predicate>),
    And(Vec<Predicate>),
}

impl Predicate {
    pub fn equal(
        attribute: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Predicate::Equal {
            attribute: attribute.into(),
            value: value.into(),
        }
    }

    pub fn in_set<I, S>(
        attribute: impl Into<String>,
        values: I,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Predicate::In {
            attribute: attribute.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn starts_with(
        attribute: impl Into<String>,
        prefix: impl Into<String>,
    ) -> Self {
        Predicate::StartsWith {
            attribute: attribute.into(),
            prefix: prefix.into(),
        }
    }

    pub fn ends_with(
        attribute: impl Into<String>,
        suffix: impl Into<String>,
    ) -> Self {
        Predicate::EndsWith {
            attribute: attribute.into(),
            suffix: suffix.into(),
        }
    }

    pub fn like(
        attribute: impl Into<String>,
        pattern: impl Into<String>,
    ) -> Self {
        Predicate::Like {
            attribute: attribute.into(),
            pattern: pattern.into(),
        }
    }

    /// Logical OR of `predicates`. Nested ORs are flattened.
    ///
    /// Returns `None` for an empty input and the predicate itself for a single one.
    pub fn any_of<I>(predicates: I) -> Option<Predicate>
    where
        I: IntoIterator<Item = Predicate>,
    {
        let mut flat = Vec::new();
        for predicate in predicates {
            match predicate {
                Predicate::Or(inner) => flat.extend(inner),
                other => flat.push(other),
            }
        }
        match flat.len() {
            0 => None,
            1 => flat.pop(),
            _ => Some(Predicate::Or(flat)),
        }
    }

    /// Logical AND of `predicates`. Nested ANDs are flattened.
    pub fn all_of<I>(predicates: I) -> Option<Predicate>
    where
        I: IntoIterator<Item = Predicate>,
    {
        let mut flat = Vec::new();
        for predicate in predicates {
            match predicate {
                Predicate::And(inner) => flat.extend(inner),
                other => flat.push(other),
            }
        }
        match flat.len() {
            0 => None,
            1 => flat.pop(),
            _ => Some(Predicate::And(flat)),
        }
    }

    pub fn evaluate(
        &self,
        key: &dyn CacheKey,
    ) -> bool {
        match self {
            Predicate::Equal { attribute, value } => {
                attribute_value(attribute, key).is_some_and(|v| &v == value)
            }
            Predicate::In { attribute, values } => {
                attribute_value(attribute, key).is_some_and(|v| values.contains(&v))
            }
            Predicate::StartsWith { attribute, prefix } => {
                attribute_value(attribute, key).is_some_and(|v| v.starts_with(prefix.as_str()))
            }
            Predicate::EndsWith { attribute, suffix } => {
                attribute_value(attribute, key).is_some_and(|v| v.ends_with(suffix.as_str()))
            }
            Predicate::Like { attribute, pattern } => {
                attribute_value(attribute, key).is_some_and(|v| like_match(&v, pattern))
            }
            Predicate::Or(predicates) => predicates.iter().any(|p| p.evaluate(key)),
            Predicate::And(predicates) => predicates.iter().all(|p| p.evaluate(key)),
        }
    }
}

/// Resolves `__key` or `__key.<property>` on `key`. Property lookup failures
/// evaluate as absent.
fn attribute_value(
    attribute: &str,
    key: &dyn CacheKey,
) -> Option<String> {
    if attribute == KEY_ATTRIBUTE {
        return Some(key.to_string());
    }
    let property = attribute.strip_prefix(KEY_PROPERTY_PREFIX)?;
    key.property(property).ok().flatten()
}

#[derive(Debug, Clone, Copy)]
enum LikeToken {
    AnySequence,
    AnyChar,
    Literal(char),
}

fn like_tokens(pattern: &str) -> Vec<LikeToken> {
    let mut tokens = Vec::with_capacity(pattern.len());
    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        tokens.push(match c {
            '%' => LikeToken::AnySequence,
            '_' => LikeToken::AnyChar,
            '\\' => LikeToken::Literal(chars.next().unwrap_or('\\')),
            c => LikeToken::Literal(c),
        });
    }
    tokens
}

/// Greedy wildcard match with single-point backtracking on the last `%`.
pub(crate) fn like_match(
    value: &str,
    pattern: &str,
) -> bool {
    let tokens = like_tokens(pattern);
    let text: Vec<char> = value.chars().collect();

    let mut t = 0;
    let mut p = 0;
    let mut backtrack: Option<(usize, usize)> = None;

    while t < text.len() {
        if p < tokens.len() {
            match tokens[p] {
                LikeToken::AnyChar => {
                    t += 1;
                    p += 1;
                    continue;
                }
                LikeToken::Literal(c) if c == text[t] => {
                    t += 1;
                    p += 1;
                    continue;
                }
                LikeToken::AnySequence => {
                    backtrack = Some((p, t));
                    p += 1;
                    continue;
                }
                LikeToken::Literal(_) => {}
            }
        }
        match backtrack {
            Some((star, mark)) => {
                p = star + 1;
                t = mark + 1;
                backtrack = Some((star, mark + 1));
            }
            None => return false,
        }
    }

    tokens[p..].iter().all(|token| matches!(token, LikeToken::AnySequence))
}

impl fmt::Display for Predicate {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match self {
            Predicate::Equal { attribute, value } => write!(f, "{attribute} = '{value}'"),
            Predicate::In { attribute, values } => {
                let values: Vec<String> = values.iter().map(|v| format!("'{v}'")).collect();
                write!(f, "{attribute} IN ({})", values.join(", "))
            }
            Predicate::StartsWith { attribute, prefix } => {
                write!(f, "{attribute} LIKE '{prefix}%'")
            }
            Predicate::EndsWith { attribute, suffix } => {
                write!(f, "{attribute} LIKE '%{suffix}'")
            }
            Predicate::Like { attribute, pattern } => write!(f, "{attribute} LIKE '{pattern}'"),
            Predicate::Or(predicates) => write_joined(f, predicates, " OR "),
            Predicate::And(predicates) => write_joined(f, predicates, " AND "),
        }
    }
}

fn write_joined(
    f: &mut fmt::Formatter<'_>,
    predicates: &[Predicate],
    separator: &str,
) -> fmt::Result {
    write!(f, "(")?;
    for (i, predicate) in predicates.iter().enumerate() {
        if i > 0 {
            write!(f, "{separator}")?;
        }
        write!(f, "{predicate}")?;
    }
    write!(f, ")")
}
