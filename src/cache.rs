//! In-memory response cache with per-entry TTL.
//!
//! Keys are hashed with SHA-256 before storage; the raw key string is never
//! kept. Expiry is lazy: `get` and `has` drop an expired entry when they see
//! it, and `size` sweeps every expired entry before counting.
//!
//! The cache is not internally synchronized. Callers sharing it across tasks
//! wrap it in a mutex (see `TriageService`).

use std::collections::HashMap;
use std::time::Duration;

use sha2::{Digest, Sha256};
use tokio::time::Instant;

/// Default TTL applied when `set` is called without one: 1 hour.
pub const DEFAULT_TTL: Duration = Duration::from_secs(3600);

type CacheKey = [u8; 32];

/// A cached value with its creation time and lifetime.
#[derive(Debug, Clone)]
pub struct CacheEntry<T> {
    pub value: T,
    pub created_at: Instant,
    pub ttl: Duration,
}

impl<T> CacheEntry<T> {
    fn is_expired(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.created_at) > self.ttl
    }
}

/// Content-addressed key/value cache with TTL expiry.
#[derive(Debug)]
pub struct ResponseCache<T> {
    entries: HashMap<CacheKey, CacheEntry<T>>,
    default_ttl: Duration,
}

impl<T: Clone> ResponseCache<T> {
    /// Create a cache whose entries live for `default_ttl` unless told otherwise.
    pub fn new(default_ttl: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            default_ttl,
        }
    }

    fn digest(key: &str) -> CacheKey {
        let mut out = [0u8; 32];
        out.copy_from_slice(&Sha256::digest(key.as_bytes()));
        out
    }

    /// Store `value` under `key`. A missing or zero `ttl` falls back to the default.
    pub fn set(&mut self, key: &str, value: T, ttl: Option<Duration>) {
        let ttl = ttl.filter(|t| !t.is_zero()).unwrap_or(self.default_ttl);
        self.entries.insert(
            Self::digest(key),
            CacheEntry {
                value,
                created_at: Instant::now(),
                ttl,
            },
        );
    }

    /// Look up `key`, dropping the entry if it has expired.
    pub fn get(&mut self, key: &str) -> Option<T> {
        let hashed = Self::digest(key);
        let entry = self.entries.get(&hashed)?;

        if entry.is_expired(Instant::now()) {
            self.entries.remove(&hashed);
            return None;
        }

        Some(entry.value.clone())
    }

    pub fn has(&mut self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Remove `key`. Returns whether an entry (expired or not) was present.
    pub fn delete(&mut self, key: &str) -> bool {
        self.entries.remove(&Self::digest(key)).is_some()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Number of live entries. Sweeps expired entries first.
    pub fn size(&mut self) -> usize {
        self.purge_expired();
        self.entries.len()
    }

    /// Drop every expired entry. Returns how many were removed.
    pub fn purge_expired(&mut self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired(now));
        before - self.entries.len()
    }
}

impl<T: Clone> Default for ResponseCache<T> {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn set_then_get_until_ttl_elapses() {
        let mut cache = ResponseCache::new(Duration::from_secs(10));
        cache.set("post", 0.75_f64, None);

        tokio::time::advance(Duration::from_secs(10)).await;
        assert_eq!(cache.get("post"), Some(0.75));

        tokio::time::advance(Duration::from_millis(1)).await;
        assert_eq!(cache.get("post"), None);
    }

    #[tokio::test(start_paused = true)]
    async fn per_entry_ttl_overrides_default() {
        let mut cache = ResponseCache::new(Duration::from_secs(3600));
        cache.set("short", 1.0_f64, Some(Duration::from_secs(1)));
        cache.set("long", 0.5_f64, None);

        tokio::time::advance(Duration::from_secs(2)).await;
        assert!(!cache.has("short"));
        assert!(cache.has("long"));
    }

    #[test]
    fn zero_ttl_falls_back_to_default() {
        let mut cache = ResponseCache::new(Duration::from_secs(60));
        cache.set("k", 0.2_f64, Some(Duration::ZERO));
        let entry = cache.entries.values().next().unwrap();
        assert_eq!(entry.ttl, Duration::from_secs(60));
    }

    #[test]
    fn zero_score_is_distinct_from_absent() {
        let mut cache = ResponseCache::default();
        cache.set("boring", 0.0_f64, None);
        assert_eq!(cache.get("boring"), Some(0.0));
        assert_eq!(cache.get("never-set"), None);
    }

    #[test]
    fn keys_are_stored_hashed() {
        let mut cache = ResponseCache::default();
        let long_key = "x".repeat(100_000);
        cache.set(&long_key, 0.4_f64, None);

        let stored: Vec<_> = cache.entries.keys().collect();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].len(), 32);
        assert_eq!(cache.get(&long_key), Some(0.4));
    }

    #[test]
    fn overwrite_replaces_value() {
        let mut cache = ResponseCache::default();
        cache.set("k", 0.1_f64, None);
        cache.set("k", 0.9_f64, None);
        assert_eq!(cache.get("k"), Some(0.9));
        assert_eq!(cache.size(), 1);
    }

    #[test]
    fn delete_and_clear() {
        let mut cache = ResponseCache::default();
        cache.set("a", 0.1_f64, None);
        cache.set("b", 0.2_f64, None);

        assert!(cache.delete("a"));
        assert!(!cache.delete("a"));
        assert_eq!(cache.size(), 1);

        cache.clear();
        assert_eq!(cache.size(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn size_sweeps_entries_that_get_never_touched() {
        let mut cache = ResponseCache::new(Duration::from_secs(5));
        cache.set("a", 0.1_f64, None);
        cache.set("b", 0.2_f64, Some(Duration::from_secs(60)));

        tokio::time::advance(Duration::from_secs(6)).await;

        // Raw storage still holds the stale entry until something sweeps it.
        assert_eq!(cache.entries.len(), 2);
        assert_eq!(cache.size(), 1);
        assert_eq!(cache.entries.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn purge_expired_reports_removed_count() {
        let mut cache = ResponseCache::new(Duration::from_secs(1));
        cache.set("a", 0.1_f64, None);
        cache.set("b", 0.2_f64, None);
        tokio::time::advance(Duration::from_secs(2)).await;
        assert_eq!(cache.purge_expired(), 2);
        assert_eq!(cache.purge_expired(), 0);
    }
}
