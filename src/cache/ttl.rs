//! TTL cache.

use std::borrow::Borrow;
use std::collections::HashMap;
use std::hash::Hash;
use std::time::Duration;
use tokio::time::Instant;

use crate::config::CacheConfig;
use crate::observability::metrics;

#[derive(Debug, Clone)]
struct Entry<V> {
    value: V,
    stored_at: Instant,
    ttl: Duration,
}

impl<V> Entry<V> {
    fn is_expired(&self, now: Instant) -> bool {
        now.duration_since(self.stored_at) > self.ttl
    }
}

/// Key/value store where every entry expires independently.
///
/// Timestamps come from `tokio::time::Instant`, so a paused Tokio clock
/// drives expiry in tests.
#[derive(Debug, Clone)]
pub struct TtlCache<K, V> {
    entries: HashMap<K, Entry<V>>,
    default_ttl: Duration,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash,
{
    /// Empty cache whose `insert` uses a 60 second TTL.
    pub fn new() -> Self {
        Self::from_config(&CacheConfig::default())
    }

    pub fn with_default_ttl(default_ttl: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            default_ttl,
        }
    }

    /// Empty cache whose `insert` uses `config.default_ttl_ms`.
    pub fn from_config(config: &CacheConfig) -> Self {
        Self::with_default_ttl(Duration::from_millis(config.default_ttl_ms))
    }

    /// Store `value` under `key` for `ttl`, replacing any previous entry.
    pub fn set(&mut self, key: K, value: V, ttl: Duration) {
        self.entries.insert(
            key,
            Entry {
                value,
                stored_at: Instant::now(),
                ttl,
            },
        );
    }

    /// `set` with the default TTL.
    pub fn insert(&mut self, key: K, value: V) {
        let ttl = self.default_ttl;
        self.set(key, value, ttl);
    }

    /// The live value for `key`. An expired entry is evicted and `None` returned.
    pub fn get<Q>(&mut self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        if self.evict_if_expired(key) {
            metrics::record_cache_lookup("expired");
            return None;
        }

        match self.entries.get(key) {
            Some(entry) => {
                metrics::record_cache_lookup("hit");
                Some(&entry.value)
            }
            None => {
                metrics::record_cache_lookup("miss");
                None
            }
        }
    }

    /// Whether a live entry exists. Applies the same lazy eviction as `get`.
    pub fn has<Q>(&mut self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        !self.evict_if_expired(key) && self.entries.contains_key(key)
    }

    /// Remove `key`; returns whether an entry (live or stale) was present.
    pub fn delete<Q>(&mut self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.entries.remove(key).is_some()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Stored entries, including expired ones not yet read.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn evict_if_expired<Q>(&mut self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let now = Instant::now();
        let expired = self
            .entries
            .get(key)
            .is_some_and(|entry| entry.is_expired(now));
        if expired {
            self.entries.remove(key);
        }
        expired
    }
}

impl<K: Eq + Hash, V> Default for TtlCache<K, V> {
    fn default() -> Self {
        Self::new()
    }
}
