//! In-memory TTL cache
//!
//! A string-keyed map guarded by a single mutex. Every entry carries its own
//! expiry instant; expired entries are evicted lazily when a lookup touches
//! them. There is no background sweep and no size bound. Owners whose key space
//! is open-ended call [`TtlCache::purge_expired`] to reclaim dead entries.
//!
//! Time is read from [`tokio::time::Instant`], which follows the real clock
//! unless a test pauses the runtime clock.

use crate::stats::{CacheMetrics, CacheStats};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;
use tracing::trace;

/// Upper bound used when `now + ttl` does not fit in an `Instant`
const MAX_TTL: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

#[derive(Debug)]
struct TtlEntry<V> {
    value: V,
    expires_at: Instant,
}

impl<V> TtlEntry<V> {
    /// An entry is live only while `now < expires_at`
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// Key/value store with per-entry expiry
///
/// Values are handed out by clone, so large payloads should be stored behind
/// an `Arc`.
#[derive(Debug)]
pub struct TtlCache<V> {
    entries: Mutex<HashMap<String, TtlEntry<V>>>,
    metrics: CacheMetrics,
}

impl<V: Clone> TtlCache<V> {
    /// Create an empty cache
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            metrics: CacheMetrics::default(),
        }
    }

    /// Look up a live entry.
    ///
    /// An expired entry is removed before `None` is returned.
    pub fn get(&self, key: &str) -> Option<V> {
        let now = Instant::now();
        let mut entries = self.entries.lock();

        let lookup = entries
            .get(key)
            .map(|entry| {
                let live = !entry.is_expired(now);
                live.then(|| entry.value.clone())
            });

        match lookup {
            Some(Some(value)) => {
                drop(entries);
                self.metrics.record_hit();
                trace!(key, "cache hit");
                Some(value)
            }
            Some(None) => {
                entries.remove(key);
                drop(entries);
                self.metrics.record_expired(1);
                self.metrics.record_miss();
                trace!(key, "cache entry expired");
                None
            }
            None => {
                drop(entries);
                self.metrics.record_miss();
                trace!(key, "cache miss");
                None
            }
        }
    }

    /// Store `value` under `key` for `ttl`, replacing any previous entry
    pub fn put(&self, key: impl Into<String>, value: V, ttl: Duration) {
        let now = Instant::now();
        let expires_at = now.checked_add(ttl).unwrap_or_else(|| now + MAX_TTL);
        let key = key.into();
        trace!(key = %key, ttl_secs = ttl.as_secs(), "cache put");

        self.entries
            .lock()
            .insert(key, TtlEntry { value, expires_at });
        self.metrics.record_insert();
    }

    /// Whether a live entry exists. Expired entries are evicted.
    pub fn contains(&self, key: &str) -> bool {
        let now = Instant::now();
        let mut entries = self.entries.lock();
        match entries.get(key).map(|entry| entry.is_expired(now)) {
            Some(false) => true,
            Some(true) => {
                entries.remove(key);
                drop(entries);
                self.metrics.record_expired(1);
                false
            }
            None => false,
        }
    }

    /// Remove an entry. Returns true if one was present.
    pub fn remove(&self, key: &str) -> bool {
        self.entries.lock().remove(key).is_some()
    }

    /// Drop every expired entry and return how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired(now));
        let removed = before - entries.len();
        drop(entries);

        if removed > 0 {
            self.metrics.record_expired(removed as u64);
        }
        removed
    }

    /// Number of stored entries, including expired ones not yet evicted
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Whether no entries are stored
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Snapshot of the counters and the current entry count
    pub fn stats(&self) -> CacheStats {
        let entries = self.len();
        self.metrics.snapshot(entries)
    }
}

impl<V: Clone> Default for TtlCache<V> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::sync::Arc;

    const FIVE_MINUTES: Duration = Duration::from_secs(300);

    #[tokio::test(start_paused = true)]
    async fn test_entry_live_until_ttl_elapses() {
        let cache = TtlCache::new();
        cache.put("pokemon/25", "pikachu".to_string(), FIVE_MINUTES);

        assert_eq!(cache.get("pokemon/25").as_deref(), Some("pikachu"));

        tokio::time::advance(Duration::from_secs(299)).await;
        assert_eq!(cache.get("pokemon/25").as_deref(), Some("pikachu"));

        tokio::time::advance(Duration::from_secs(1)).await;
        assert_eq!(cache.get("pokemon/25"), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_entry_evicted_on_read() {
        let cache = TtlCache::new();
        cache.put("a", 1_u32, Duration::from_secs(10));
        cache.put("b", 2_u32, Duration::from_secs(60));

        tokio::time::advance(Duration::from_secs(30)).await;

        // Expired but untouched entries stay until a read
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get("a"), None);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("b"), Some(2));

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.expired, 1);
        assert_eq!(stats.entries, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_put_replaces_and_refreshes_expiry() {
        let cache = TtlCache::new();
        cache.put("k", "old", Duration::from_secs(10));
        tokio::time::advance(Duration::from_secs(8)).await;
        cache.put("k", "new", Duration::from_secs(10));
        tokio::time::advance(Duration::from_secs(8)).await;

        assert_eq!(cache.get("k"), Some("new"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_purge_expired() {
        let cache = TtlCache::new();
        for i in 0..5_u32 {
            cache.put(format!("short-{i}"), i, Duration::from_secs(1));
        }
        cache.put("long", 99, Duration::from_secs(3600));

        tokio::time::advance(Duration::from_secs(2)).await;

        assert_eq!(cache.purge_expired(), 5);
        assert_eq!(cache.len(), 1);
        assert!(cache.contains("long"));
        assert_eq!(cache.stats().expired, 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_contains_evicts_expired() {
        let cache = TtlCache::new();
        cache.put("k", (), Duration::from_secs(1));
        assert!(cache.contains("k"));

        tokio::time::advance(Duration::from_secs(1)).await;
        assert!(!cache.contains("k"));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_zero_ttl_is_never_live() {
        let cache = TtlCache::new();
        cache.put("k", 1_u8, Duration::ZERO);
        assert_eq!(cache.get("k"), None);
    }

    #[test]
    fn test_huge_ttl_does_not_overflow() {
        let cache = TtlCache::new();
        cache.put("k", 1_u8, Duration::MAX);
        assert_eq!(cache.get("k"), Some(1));
    }

    #[test]
    fn test_remove() {
        let cache = TtlCache::new();
        cache.put("k", 1_u8, FIVE_MINUTES);
        assert!(cache.remove("k"));
        assert!(!cache.remove("k"));
        assert_eq!(cache.get("k"), None);
    }

    #[test]
    fn test_concurrent_readers_and_writers() {
        let cache = Arc::new(TtlCache::new());
        let handles: Vec<_> = (0..8_u32)
            .map(|t| {
                let cache = Arc::clone(&cache);
                std::thread::spawn(move || {
                    for i in 0..200_u32 {
                        let key = format!("k{}", i % 16);
                        cache.put(key.clone(), t * 1000 + i, FIVE_MINUTES);
                        assert!(cache.get(&key).is_some());
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().expect("writer thread should not panic");
        }

        assert_eq!(cache.len(), 16);
        assert_eq!(cache.stats().inserts, 8 * 200);
    }
}
