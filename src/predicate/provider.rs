#[cfg(test)]
use mockall::automock;

use super::Predicate;
use crate::KeyRef;
use crate::ProviderError;

/// User supplied predicate factory for `CUSTOM` keys.
///
/// Registered under an identifier which `session.expiration.session.<pattern>.key.predicate`
/// refers to. Returning `Ok(None)` excludes the key from the cascade without
/// counting as a failure.
#[cfg_attr(test, automock)]
pub trait SessionPredicateProvider: Send + Sync + 'static {
    fn predicate(
        &self,
        primary_cache: &str,
        key: &KeyRef,
    ) -> std::result::Result<Option<Predicate>, ProviderError>;
}
