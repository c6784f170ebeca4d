//! Level Metrics
//!
//! Lock-free counters kept by the reference levels, and the snapshot type
//! they report.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Counters for a single level
#[derive(Debug, Default)]
pub struct LevelMetrics {
    hits: AtomicU64,
    misses: AtomicU64,
    writes: AtomicU64,
    clears: AtomicU64,
}

impl LevelMetrics {
    /// Create a new metrics collector
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_write(&self) {
        self.writes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_clear(&self) {
        self.clears.fetch_add(1, Ordering::Relaxed);
    }

    /// Take a snapshot of the counters
    pub fn snapshot(&self, name: &str, entries: usize) -> LevelStats {
        LevelStats {
            name: name.to_string(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            writes: self.writes.load(Ordering::Relaxed),
            clears: self.clears.load(Ordering::Relaxed),
            entries,
        }
    }

    /// Reset all counters
    pub fn reset(&self) {
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
        self.writes.store(0, Ordering::Relaxed);
        self.clears.store(0, Ordering::Relaxed);
    }
}

/// Point-in-time statistics for a level
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LevelStats {
    /// Level name
    pub name: String,
    /// Fetches answered from this level
    pub hits: u64,
    /// Fetches this level could not answer
    pub misses: u64,
    /// Stores applied
    pub writes: u64,
    /// Clears applied, including those caused by memory pressure
    pub clears: u64,
    /// Entries currently held
    pub entries: usize,
}

impl LevelStats {
    /// Fraction of fetches that hit, 0.0 when nothing was fetched
    pub fn hit_ratio(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

impl std::fmt::Display for LevelStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}: {} hits, {} misses ({:.1}% hit ratio), {} writes, {} entries",
            self.name,
            self.hits,
            self.misses,
            self.hit_ratio() * 100.0,
            self.writes,
            self.entries
        )
    }
}
