//! Memory Level - In-Process Cache Level
//!
//! Keeps values in a sharded hashmap. Fetches resolve synchronously: a hit
//! succeeds with a clone of the stored value, a miss fails with
//! [`Error::NotFound`]. Memory pressure empties the level unless configured
//! otherwise.
//!
//! There is no capacity bound or eviction policy. Levels that need one
//! should sit in front of this level's `store`.

use std::hash::Hash;

use tracing::debug;

use super::level::CacheLevel;
use super::metrics::{LevelMetrics, LevelStats};
use super::request::CacheRequest;
use super::shard::ShardedMap;
use super::DEFAULT_SHARD_COUNT;
use crate::error::Error;

/// Memory level configuration
#[derive(Debug, Clone)]
pub struct MemoryLevelConfig {
    /// Name used in stats and log events
    pub name: String,
    /// Number of shards (rounded up to a power of two)
    pub shard_count: usize,
    /// Drop all entries when memory pressure is signalled
    pub clear_on_memory_pressure: bool,
}

impl Default for MemoryLevelConfig {
    fn default() -> Self {
        Self {
            name: "memory".to_string(),
            shard_count: DEFAULT_SHARD_COUNT,
            clear_on_memory_pressure: true,
        }
    }
}

impl MemoryLevelConfig {
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_shard_count(mut self, shard_count: usize) -> Self {
        self.shard_count = shard_count;
        self
    }

    pub fn with_clear_on_memory_pressure(mut self, clear: bool) -> Self {
        self.clear_on_memory_pressure = clear;
        self
    }
}

/// Sharded in-memory cache level
pub struct MemoryLevel<K, V> {
    storage: ShardedMap<K, V>,
    config: MemoryLevelConfig,
    metrics: LevelMetrics,
}

impl<K, V> MemoryLevel<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    /// Create a new memory level with default configuration
    pub fn new() -> Self {
        Self::with_config(MemoryLevelConfig::default())
    }

    /// Create a new memory level with custom configuration
    pub fn with_config(config: MemoryLevelConfig) -> Self {
        Self {
            storage: ShardedMap::new(config.shard_count),
            config,
            metrics: LevelMetrics::new(),
        }
    }

    /// Get configuration
    pub fn config(&self) -> &MemoryLevelConfig {
        &self.config
    }

    /// Read a value without going through `fetch` or touching the counters
    pub fn get(&self, key: &K) -> Option<V> {
        self.storage.get(key)
    }

    /// Check if a key is present
    pub fn contains(&self, key: &K) -> bool {
        self.storage.contains_key(key)
    }

    /// Remove a single entry
    pub fn remove(&self, key: &K) -> Option<V> {
        self.storage.remove(key)
    }

    /// Get number of entries
    pub fn len(&self) -> usize {
        self.storage.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.storage.is_empty()
    }

    /// Get level statistics
    pub fn stats(&self) -> LevelStats {
        self.metrics.snapshot(&self.config.name, self.storage.len())
    }
}

impl<K, V> Default for MemoryLevel<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> CacheLevel for MemoryLevel<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    type Key = K;
    type Value = V;

    fn fetch(&self, key: &K) -> CacheRequest<V> {
        match self.storage.get(key) {
            Some(value) => {
                self.metrics.record_hit();
                CacheRequest::succeeded(value)
            }
            None => {
                self.metrics.record_miss();
                CacheRequest::failed(Some(Error::NotFound))
            }
        }
    }

    fn store(&self, value: V, key: &K) {
        self.metrics.record_write();
        self.storage.insert(key.clone(), value);
    }

    fn clear(&self) {
        self.metrics.record_clear();
        self.storage.clear();
    }

    fn on_memory_pressure(&self) {
        if self.config.clear_on_memory_pressure {
            debug!(level = %self.config.name, entries = self.len(), "Memory pressure, clearing level");
            self.clear();
        } else {
            debug!(level = %self.config.name, "Memory pressure, keeping entries");
        }
    }
}
