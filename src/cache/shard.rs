//! Sharded Map
//!
//! Concurrent hashmap split into independently locked shards.
//!
//! # Design
//!
//! - Each shard has its own RwLock, minimizing contention
//! - Power-of-2 shard count enables fast modulo via bitwise AND
//! - Shards are cache-line aligned to prevent false sharing

use parking_lot::RwLock;
use std::borrow::Borrow;
use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};

/// Single shard containing a hashmap and its entry count
#[repr(align(64))]
pub struct Shard<K, V> {
    map: RwLock<HashMap<K, V>>,
    count: AtomicU64,
}

impl<K, V> Default for Shard<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> Shard<K, V> {
    /// Create a new empty shard
    pub fn new() -> Self {
        Self {
            map: RwLock::new(HashMap::new()),
            count: AtomicU64::new(0),
        }
    }

    /// Get the number of entries in this shard
    pub fn len(&self) -> usize {
        self.count.load(Ordering::Relaxed) as usize
    }

    /// Check if the shard is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<K: Eq + Hash, V> Shard<K, V> {
    /// Get a value from the shard
    pub fn get<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
        V: Clone,
    {
        self.map.read().get(key).cloned()
    }

    /// Check if a key exists
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.map.read().contains_key(key)
    }

    /// Insert a value, returning the old value if present
    pub fn insert(&self, key: K, value: V) -> Option<V> {
        let old = self.map.write().insert(key, value);
        if old.is_none() {
            self.count.fetch_add(1, Ordering::Relaxed);
        }
        old
    }

    /// Remove a value, returning it if present
    pub fn remove<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let removed = self.map.write().remove(key);
        if removed.is_some() {
            self.count.fetch_sub(1, Ordering::Relaxed);
        }
        removed
    }

    /// Clear all entries
    pub fn clear(&self) {
        let mut guard = self.map.write();
        guard.clear();
        self.count.store(0, Ordering::Relaxed);
    }
}

/// Hashmap split across a power-of-two number of shards
pub struct ShardedMap<K, V> {
    shards: Box<[Shard<K, V>]>,
    mask: usize,
}

impl<K, V> ShardedMap<K, V> {
    /// Create a map with at least `shard_count` shards
    ///
    /// The count is rounded up to the next power of two.
    pub fn new(shard_count: usize) -> Self {
        let count = shard_count.max(1).next_power_of_two();
        let shards: Vec<Shard<K, V>> = (0..count).map(|_| Shard::new()).collect();
        Self {
            shards: shards.into_boxed_slice(),
            mask: count - 1,
        }
    }

    /// Get the shard count
    #[inline]
    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    /// Get total number of entries across all shards
    pub fn len(&self) -> usize {
        self.shards.iter().map(|s| s.len()).sum()
    }

    /// Check if the map is empty
    pub fn is_empty(&self) -> bool {
        self.shards.iter().all(|s| s.is_empty())
    }
}

impl<K: Eq + Hash, V> ShardedMap<K, V> {
    #[inline]
    fn shard_for<Q>(&self, key: &Q) -> &Shard<K, V>
    where
        Q: Hash + ?Sized,
    {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        &self.shards[(hasher.finish() as usize) & self.mask]
    }

    /// Get a value
    pub fn get<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
        V: Clone,
    {
        self.shard_for(key).get(key)
    }

    /// Check if a key exists
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.shard_for(key).contains_key(key)
    }

    /// Insert a value
    pub fn insert(&self, key: K, value: V) -> Option<V> {
        self.shard_for(&key).insert(key, value)
    }

    /// Remove a value
    pub fn remove<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.shard_for(key).remove(key)
    }

    /// Clear all shards
    pub fn clear(&self) {
        for shard in self.shards.iter() {
            shard.clear();
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_shard_insert_get_remove() {
        let shard: Shard<String, i32> = Shard::new();
        assert!(shard.is_empty());

        assert!(shard.insert("key1".to_string(), 42).is_none());
        assert_eq!(shard.insert("key1".to_string(), 43), Some(42));
        assert_eq!(shard.len(), 1);
        assert_eq!(shard.get("key1"), Some(43));

        assert_eq!(shard.remove("key1"), Some(43));
        assert!(shard.is_empty());
        assert_eq!(shard.remove("key1"), None);
    }

    #[test]
    fn test_shard_count_rounds_to_power_of_two() {
        assert_eq!(ShardedMap::<u8, u8>::new(0).shard_count(), 1);
        assert_eq!(ShardedMap::<u8, u8>::new(5).shard_count(), 8);
        assert_eq!(ShardedMap::<u8, u8>::new(64).shard_count(), 64);
    }

    #[test]
    fn test_sharded_map_operations() {
        let map: ShardedMap<String, usize> = ShardedMap::new(16);

        for i in 0..100 {
            map.insert(format!("key{}", i), i);
        }
        assert_eq!(map.len(), 100);
        assert_eq!(map.get("key42"), Some(42));
        assert!(map.contains_key("key99"));
        assert!(!map.contains_key("key100"));

        map.remove("key42");
        assert_eq!(map.len(), 99);

        map.clear();
        assert!(map.is_empty());
    }

    #[test]
    fn test_sharded_map_concurrent_writers() {
        let map: Arc<ShardedMap<u64, u64>> = Arc::new(ShardedMap::new(8));

        let handles: Vec<_> = (0..4u64)
            .map(|t| {
                let map = Arc::clone(&map);
                thread::spawn(move || {
                    for i in 0..250 {
                        map.insert(t * 1000 + i, i);
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(map.len(), 1000);
        assert_eq!(map.get(&3249), Some(249));
    }
}
