use std::sync::Arc;

use dashmap::DashMap;
use tracing::debug;

use super::KeyExtensions;
use super::SessionSpec;
use crate::substitute_tag;
use crate::ExpirationConfig;

/// A primary cache name bound to the spec whose pattern it matched.
#[derive(Debug, Clone)]
pub struct ResolvedTag {
    pub primary_cache_name: String,
    /// Empty when the matching pattern has no placeholder
    pub tag: String,
    pub spec: Arc<SessionSpec>,
}

impl ResolvedTag {
    /// Relevant cache patterns with the tag substituted in.
    pub fn relevant_patterns(&self) -> Vec<String> {
        self.spec
            .relevant_patterns()
            .iter()
            .map(|pattern| substitute_tag(pattern, &self.tag))
            .collect()
    }
}

/// Maps primary cache names to their [`ResolvedTag`].
///
/// Resolution results, misses included, are cached for the lifetime of the
/// registry. Concurrent first lookups of the same name may both compute the
/// result; they compute the same value.
#[derive(Debug, Default)]
pub struct SpecRegistry {
    specs: Vec<Arc<SessionSpec>>,
    resolved: DashMap<String, Option<Arc<ResolvedTag>>>,
}

impl SpecRegistry {
    /// `specs` are tried in the given order.
    pub fn new(specs: Vec<SessionSpec>) -> Self {
        Self {
            specs: specs.into_iter().map(Arc::new).collect(),
            resolved: DashMap::new(),
        }
    }

    pub fn from_config(
        config: &ExpirationConfig,
        extensions: &KeyExtensions,
    ) -> Self {
        let specs = config
            .sessions
            .iter()
            .map(|session| SessionSpec::from_config(session, extensions, &config.tag))
            .collect();
        Self::new(specs)
    }

    pub fn resolve(
        &self,
        primary_cache_name: &str,
    ) -> Option<Arc<ResolvedTag>> {
        if let Some(cached) = self.resolved.get(primary_cache_name) {
            return cached.value().clone();
        }

        let resolved = self.specs.iter().find_map(|spec| {
            spec.pattern().extract(primary_cache_name).map(|tag| {
                Arc::new(ResolvedTag {
                    primary_cache_name: primary_cache_name.to_string(),
                    tag,
                    spec: spec.clone(),
                })
            })
        });

        match &resolved {
            Some(r) => debug!(
                primary_cache = %primary_cache_name,
                pattern = %r.spec.pattern().template(),
                tag = %r.tag,
                "Resolved primary cache"
            ),
            None => debug!(primary_cache = %primary_cache_name, "No session spec matches primary cache"),
        }

        self.resolved.insert(primary_cache_name.to_string(), resolved.clone());
        resolved
    }

    pub fn specs(&self) -> &[Arc<SessionSpec>] {
        &self.specs
    }

    /// Number of cached resolutions, misses included
    pub fn resolved_len(&self) -> usize {
        self.resolved.len()
    }
}
