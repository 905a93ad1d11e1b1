//! Module: cache
//! Responsibility: scoped, TTL-bounded caching of derived values.

use crate::config::CacheConfig;
use moka::sync::Cache;
use pidreg_core::fingerprint::RequestFingerprint;
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;
use std::time::Duration;

///
/// CacheScope
///

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum CacheScope {
    /// Relation counters per identifier.
    MetadataCounts,
    /// Grouped rollups.
    Totals,
    /// Owner lookups.
    Lookup,
}

///
/// CacheKey
///

#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct CacheKey {
    pub scope: CacheScope,
    pub entity: String,
    pub fingerprint: Option<RequestFingerprint>,
}

impl CacheKey {
    #[must_use]
    pub fn new(scope: CacheScope, entity: impl Into<String>) -> Self {
        Self {
            scope,
            entity: entity.into(),
            fingerprint: None,
        }
    }

    #[must_use]
    pub const fn with_fingerprint(mut self, fingerprint: RequestFingerprint) -> Self {
        self.fingerprint = Some(fingerprint);
        self
    }
}

///
/// CacheService
///

pub trait CacheService: Send + Sync {
    fn get(&self, key: &CacheKey) -> Option<Value>;

    fn set(&self, key: CacheKey, value: Value);

    /// Drop every entry for `entity` in `scope`, whatever its fingerprint.
    fn invalidate(&self, scope: CacheScope, entity: &str);
}

/// Typed read; entries that no longer decode count as misses.
pub fn get_as<T: DeserializeOwned>(cache: &dyn CacheService, key: &CacheKey) -> Option<T> {
    cache.get(key).and_then(|value| serde_json::from_value(value).ok())
}

pub fn set_as<T: Serialize>(cache: &dyn CacheService, key: CacheKey, value: &T) {
    match serde_json::to_value(value) {
        Ok(value) => cache.set(key, value),
        Err(err) => tracing::warn!(target: "pidreg::cache", error = %err, "value not cached"),
    }
}

///
/// MokaCache
///
/// One moka cache per scope, each with its own time-to-live.
///

pub struct MokaCache {
    metadata_counts: Cache<CacheKey, Value>,
    totals: Cache<CacheKey, Value>,
    lookups: Cache<CacheKey, Value>,
}

impl MokaCache {
    #[must_use]
    pub fn new(config: &CacheConfig) -> Self {
        let build = |ttl_secs: u64| {
            Cache::builder()
                .max_capacity(config.max_entries)
                .time_to_live(Duration::from_secs(ttl_secs))
                .build()
        };

        Self {
            metadata_counts: build(config.metadata_ttl_secs),
            totals: build(config.totals_ttl_secs),
            lookups: build(config.lookup_ttl_secs),
        }
    }

    const fn scoped(&self, scope: CacheScope) -> &Cache<CacheKey, Value> {
        match scope {
            CacheScope::MetadataCounts => &self.metadata_counts,
            CacheScope::Totals => &self.totals,
            CacheScope::Lookup => &self.lookups,
        }
    }
}

impl CacheService for MokaCache {
    fn get(&self, key: &CacheKey) -> Option<Value> {
        self.scoped(key.scope).get(key)
    }

    fn set(&self, key: CacheKey, value: Value) {
        self.scoped(key.scope).insert(key, value);
    }

    fn invalidate(&self, scope: CacheScope, entity: &str) {
        let cache = self.scoped(scope);
        let stale: Vec<_> = cache
            .iter()
            .filter(|(key, _)| key.entity == entity)
            .map(|(key, _)| key)
            .collect();
        for key in stale {
            cache.invalidate(key.as_ref());
        }
    }
}

///
/// NoCache
///
/// Cache that never stores anything.
///

#[derive(Clone, Copy, Debug, Default)]
pub struct NoCache;

impl CacheService for NoCache {
    fn get(&self, _: &CacheKey) -> Option<Value> {
        None
    }

    fn set(&self, _: CacheKey, _: Value) {}

    fn invalidate(&self, _: CacheScope, _: &str) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn entries_are_scoped_and_fingerprinted() {
        let cache = MokaCache::new(&CacheConfig::default());
        let fp = RequestFingerprint::of_pairs([("state", "findable")]);
        let key = CacheKey::new(CacheScope::Totals, "example").with_fingerprint(fp);

        cache.set(key.clone(), json!({ "count": 3 }));

        assert_eq!(cache.get(&key), Some(json!({ "count": 3 })));
        assert_eq!(cache.get(&CacheKey::new(CacheScope::Totals, "example")), None);
        assert_eq!(
            cache.get(&CacheKey::new(CacheScope::Lookup, "example").with_fingerprint(fp)),
            None
        );
    }

    #[test]
    fn invalidate_drops_every_fingerprint_of_an_entity() {
        let cache = MokaCache::new(&CacheConfig::default());
        for state in ["findable", "draft"] {
            let fp = RequestFingerprint::of_pairs([("state", state)]);
            cache.set(CacheKey::new(CacheScope::Totals, "example").with_fingerprint(fp), json!(1));
        }
        cache.set(CacheKey::new(CacheScope::Totals, "other"), json!(2));

        cache.invalidate(CacheScope::Totals, "example");

        assert_eq!(cache.get(&CacheKey::new(CacheScope::Totals, "other")), Some(json!(2)));
        let fp = RequestFingerprint::of_pairs([("state", "draft")]);
        assert_eq!(
            cache.get(&CacheKey::new(CacheScope::Totals, "example").with_fingerprint(fp)),
            None
        );
    }

    #[test]
    fn typed_helpers_round_through_json() {
        let cache = MokaCache::new(&CacheConfig::default());
        let key = CacheKey::new(CacheScope::MetadataCounts, "10.5072/a");

        set_as(&cache, key.clone(), &vec![1_u64, 2, 3]);

        assert_eq!(get_as::<Vec<u64>>(&cache, &key), Some(vec![1, 2, 3]));
        assert_eq!(get_as::<String>(&cache, &key), None);
    }
}
