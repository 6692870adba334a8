//! Cache statistics
//!
//! Counters are plain relaxed atomics. They are monitoring data, not
//! synchronization, so no ordering between them is guaranteed.

#![allow(clippy::cast_precision_loss)] // Hit rates tolerate precision loss

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Live counters owned by a cache instance
#[derive(Debug, Default)]
pub(crate) struct CacheMetrics {
    hits: AtomicU64,
    misses: AtomicU64,
    expired: AtomicU64,
    inserts: AtomicU64,
}

impl CacheMetrics {
    #[inline]
    pub(crate) fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_expired(&self, count: u64) {
        self.expired.fetch_add(count, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_insert(&self) {
        self.inserts.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self, entries: usize) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            expired: self.expired.load(Ordering::Relaxed),
            inserts: self.inserts.load(Ordering::Relaxed),
            entries,
        }
    }
}

/// Point-in-time cache statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    /// Lookups that returned a live entry
    pub hits: u64,
    /// Lookups that found nothing, including expired entries
    pub misses: u64,
    /// Entries dropped because their TTL elapsed
    pub expired: u64,
    /// Total `put` calls
    pub inserts: u64,
    /// Entries currently stored (expired ones not yet evicted included)
    pub entries: usize,
}

impl CacheStats {
    /// Cache hit rate as a percentage
    pub fn hit_rate(&self) -> f64 {
        let lookups = self.hits + self.misses;
        if lookups == 0 {
            0.0
        } else {
            (self.hits as f64) / (lookups as f64) * 100.0
        }
    }

    /// Total lookups served
    pub fn lookups(&self) -> u64 {
        self.hits + self.misses
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hit_rate_empty() {
        let stats = CacheStats::default();
        assert!(stats.hit_rate().abs() < f64::EPSILON);
        assert_eq!(stats.lookups(), 0);
    }

    #[test]
    fn test_hit_rate() {
        let metrics = CacheMetrics::default();
        metrics.record_hit();
        metrics.record_hit();
        metrics.record_hit();
        metrics.record_miss();

        let stats = metrics.snapshot(3);
        assert_eq!(stats.hits, 3);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.entries, 3);
        assert!((stats.hit_rate() - 75.0).abs() < f64::EPSILON);
    }
}
