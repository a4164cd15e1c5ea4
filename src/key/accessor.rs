use std::fmt;
use std::sync::Arc;

use super::CacheKey;
use crate::KeyAccessError;

type AccessorFn =
    dyn Fn(&dyn CacheKey) -> std::result::Result<Option<String>, KeyAccessError> + Send + Sync;

/// Property accessor registered at configuration time for `OBJECT` keys.
///
/// The configured property name selects the accessor; when none is
/// registered the engine falls back to [`KeyAccessor::property`].
#[derive(Clone)]
pub struct KeyAccessor {
    name: String,
    accessor: Arc<AccessorFn>,
}

impl KeyAccessor {
    pub fn new<F>(
        name: impl Into<String>,
        accessor: F,
    ) -> Self
    where
        F: Fn(&dyn CacheKey) -> std::result::Result<Option<String>, KeyAccessError>
            + Send
            + Sync
            + 'static,
    {
        Self {
            name: name.into(),
            accessor: Arc::new(accessor),
        }
    }

    /// Accessor bound to a concrete key type. Keys of any other type fail
    /// with [`KeyAccessError::TypeMismatch`].
    pub fn typed<K, F>(
        name: impl Into<String>,
        accessor: F,
    ) -> Self
    where
        K: CacheKey,
        F: Fn(&K) -> Option<String> + Send + Sync + 'static,
    {
        Self::new(name, move |key: &dyn CacheKey| {
            match key.as_any().downcast_ref::<K>() {
                Some(key) => Ok(accessor(key)),
                None => Err(KeyAccessError::TypeMismatch {
                    expected: std::any::type_name::<K>(),
                    key: key.to_string(),
                }),
            }
        })
    }

    /// Accessor delegating to [`CacheKey::property`].
    pub fn property(name: impl Into<String>) -> Self {
        let name = name.into();
        let property = name.clone();
        Self::new(name, move |key: &dyn CacheKey| key.property(&property))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn get(
        &self,
        key: &dyn CacheKey,
    ) -> std::result::Result<Option<String>, KeyAccessError> {
        (self.accessor)(key)
    }
}

impl fmt::Debug for KeyAccessor {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("KeyAccessor").field("name", &self.name).finish_non_exhaustive()
    }
}
