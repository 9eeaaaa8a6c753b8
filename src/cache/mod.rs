//! Memoization cache for upstream query results.
//!
//! Each service owns one [`QueryCache`], built from a [`CachePolicy`]. Values
//! are stored behind an [`Arc`] so a cache hit hands back the very list that
//! was stored, without cloning it.
//!
//! - **Disabled**: nothing is stored, every lookup misses
//! - **Unbounded**: entries live for the whole process (the default for POIs)
//! - **LRU**: `max_entries` bounds the cache, least recently used goes first;
//!   a bound of zero is the same as disabled
//! - **TTL**: `ttl_secs` expires entries lazily on lookup

use lru::LruCache;
use serde::Deserialize;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::{Duration, Instant};

fn default_enabled() -> bool {
    true
}

/// Eviction policy for one endpoint's cache
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct CachePolicy {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Upper bound on stored entries; `None` never evicts, `Some(0)` stores nothing
    #[serde(default)]
    pub max_entries: Option<usize>,
    /// Entry lifetime in seconds, fractions allowed; `None` never expires
    #[serde(default)]
    pub ttl_secs: Option<f64>,
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self::unbounded()
    }
}

impl CachePolicy {
    pub fn unbounded() -> Self {
        Self {
            enabled: true,
            max_entries: None,
            ttl_secs: None,
        }
    }

    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::unbounded()
        }
    }

    pub fn bounded(max_entries: usize) -> Self {
        Self {
            max_entries: Some(max_entries),
            ..Self::unbounded()
        }
    }

    pub fn with_ttl(self, ttl: Duration) -> Self {
        Self {
            ttl_secs: Some(ttl.as_secs_f64()),
            ..self
        }
    }

    /// Whether anything will ever be stored under this policy
    pub fn stores(&self) -> bool {
        self.enabled && self.max_entries != Some(0)
    }

    /// Negative lifetimes count as zero; non-finite ones never expire
    fn ttl(&self) -> Option<Duration> {
        self.ttl_secs
            .and_then(|secs| Duration::try_from_secs_f64(secs.max(0.0)).ok())
    }
}

/// Hit/miss counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub entries: usize,
}

#[derive(Debug)]
struct CacheEntry<V> {
    value: Arc<V>,
    stored_at: Instant,
}

/// String-keyed memoization cache
#[derive(Debug)]
pub struct QueryCache<V> {
    entries: LruCache<String, CacheEntry<V>>,
    policy: CachePolicy,
    stats: CacheStats,
}

impl<V> QueryCache<V> {
    pub fn new(policy: CachePolicy) -> Self {
        let entries = match policy.max_entries.and_then(NonZeroUsize::new) {
            Some(capacity) => LruCache::new(capacity),
            None => LruCache::unbounded(),
        };

        Self {
            entries,
            policy,
            stats: CacheStats::default(),
        }
    }

    pub fn policy(&self) -> CachePolicy {
        self.policy
    }

    /// Look up `key`, dropping it first if it outlived the TTL
    pub fn get(&mut self, key: &str) -> Option<Arc<V>> {
        if !self.policy.stores() {
            self.stats.misses += 1;
            return None;
        }

        let expired = match (self.entries.peek(key), self.policy.ttl()) {
            (Some(entry), Some(ttl)) => entry.stored_at.elapsed() >= ttl,
            _ => false,
        };
        if expired {
            self.entries.pop(key);
            self.stats.evictions += 1;
        }

        match self.entries.get(key) {
            Some(entry) => {
                self.stats.hits += 1;
                Some(Arc::clone(&entry.value))
            }
            None => {
                self.stats.misses += 1;
                None
            }
        }
    }

    /// Store `value` under `key`, replacing any previous entry
    ///
    /// Returns the shared handle that later hits will return.
    pub fn insert(&mut self, key: String, value: V) -> Arc<V> {
        let value = Arc::new(value);
        if !self.policy.stores() {
            return value;
        }

        let entry = CacheEntry {
            value: Arc::clone(&value),
            stored_at: Instant::now(),
        };
        if let Some((old_key, _)) = self.entries.push(key, entry)
            && !self.entries.contains(&old_key)
        {
            self.stats.evictions += 1;
        }

        value
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.entries.len(),
            ..self.stats
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hit_returns_same_allocation() {
        let mut cache = QueryCache::new(CachePolicy::unbounded());
        let stored = cache.insert("k".to_string(), vec![1, 2, 3]);

        let hit = cache.get("k").unwrap();
        assert!(Arc::ptr_eq(&stored, &hit));
        assert_eq!(cache.stats().hits, 1);
    }

    #[test]
    fn test_miss_is_counted() {
        let mut cache: QueryCache<Vec<u8>> = QueryCache::new(CachePolicy::unbounded());
        assert!(cache.get("absent").is_none());
        assert_eq!(cache.stats().misses, 1);
    }

    #[test]
    fn test_disabled_never_stores() {
        let mut cache = QueryCache::new(CachePolicy::disabled());
        cache.insert("k".to_string(), 1);

        assert!(cache.get("k").is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_zero_capacity_stores_nothing() {
        let mut cache = QueryCache::new(CachePolicy::bounded(0));
        for i in 0..100 {
            cache.insert(format!("k{i}"), i);
        }

        assert_eq!(cache.len(), 0);
        assert!(cache.get("k99").is_none());
        assert!(!cache.policy().stores());
    }

    #[test]
    fn test_bounded_evicts_least_recently_used() {
        let mut cache = QueryCache::new(CachePolicy::bounded(2));
        cache.insert("a".to_string(), 1);
        cache.insert("b".to_string(), 2);
        // Touch "a" so "b" becomes the eviction candidate
        assert!(cache.get("a").is_some());
        cache.insert("c".to_string(), 3);

        assert_eq!(cache.len(), 2);
        assert!(cache.get("b").is_none());
        assert!(cache.get("a").is_some());
        assert!(cache.get("c").is_some());
        assert_eq!(cache.stats().evictions, 1);
    }

    #[test]
    fn test_replacing_a_key_is_not_an_eviction() {
        let mut cache = QueryCache::new(CachePolicy::bounded(2));
        cache.insert("a".to_string(), 1);
        cache.insert("a".to_string(), 2);

        assert_eq!(*cache.get("a").unwrap(), 2);
        assert_eq!(cache.stats().evictions, 0);
    }

    #[test]
    fn test_zero_ttl_expires_immediately() {
        let mut cache = QueryCache::new(CachePolicy::unbounded().with_ttl(Duration::ZERO));
        cache.insert("k".to_string(), 1);

        assert!(cache.get("k").is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_sub_second_ttl_is_kept() {
        let policy = CachePolicy::unbounded().with_ttl(Duration::from_millis(500));
        assert_eq!(policy.ttl_secs, Some(0.5));

        let mut cache = QueryCache::new(policy);
        cache.insert("k".to_string(), 1);
        assert_eq!(*cache.get("k").unwrap(), 1);
    }

    #[test]
    fn test_long_ttl_keeps_entry() {
        let mut cache = QueryCache::new(CachePolicy::unbounded().with_ttl(Duration::from_secs(3600)));
        cache.insert("k".to_string(), 1);

        assert_eq!(*cache.get("k").unwrap(), 1);
    }

    #[test]
    fn test_clear() {
        let mut cache = QueryCache::new(CachePolicy::unbounded());
        cache.insert("k".to_string(), 1);
        cache.clear();

        assert!(cache.get("k").is_none());
        assert_eq!(cache.stats().entries, 0);
    }
}
