//! Cache statistics tracking

use std::sync::atomic::{AtomicU64, Ordering};

/// Statistics for lookup accounting
///
/// `misses` is the backing-store fetch counter: one increment per fetch
/// that succeeded and populated the cache.
#[derive(Debug, Default)]
pub struct CacheStats {
    hits: AtomicU64,
    misses: AtomicU64,
    coalesced: AtomicU64,
    not_found: AtomicU64,
    invalid: AtomicU64,
}

impl CacheStats {
    /// Create new stats tracker
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a cache hit
    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a completed backing-store fetch
    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a lookup served by another caller's fetch
    pub fn record_coalesced(&self) {
        self.coalesced.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a lookup for an id the store does not hold
    pub fn record_not_found(&self) {
        self.not_found.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a malformed id
    pub fn record_invalid(&self) {
        self.invalid.fetch_add(1, Ordering::Relaxed);
    }

    /// Get total hits
    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    /// Get total backing-store fetches
    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    /// Get total coalesced lookups
    pub fn coalesced(&self) -> u64 {
        self.coalesced.load(Ordering::Relaxed)
    }

    /// Get total not-found lookups
    pub fn not_found(&self) -> u64 {
        self.not_found.load(Ordering::Relaxed)
    }

    /// Get total invalid ids
    pub fn invalid(&self) -> u64 {
        self.invalid.load(Ordering::Relaxed)
    }

    /// Get total lookups of every outcome
    pub fn lookups(&self) -> u64 {
        self.hits() + self.misses() + self.coalesced() + self.not_found() + self.invalid()
    }

    /// Share of successful lookups that did not fetch (0.0 to 1.0)
    pub fn hit_ratio(&self) -> f64 {
        let served = self.hits() + self.coalesced();
        let total = served + self.misses();
        if total == 0 {
            0.0
        } else {
            served as f64 / total as f64
        }
    }
}
