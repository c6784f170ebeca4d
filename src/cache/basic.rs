//! Closure-backed cache level
//!
//! [`BasicCache`] turns plain closures into a [`CacheLevel`]. The most common
//! use is [`BasicCache::fetcher`], which lets a raw fetch function (a network
//! call, a database query) take part in a pipeline as a level that can only
//! fetch.

use std::fmt;

use super::level::CacheLevel;
use super::request::CacheRequest;

type FetchFn<K, V> = Box<dyn Fn(&K) -> CacheRequest<V> + Send + Sync>;
type StoreFn<K, V> = Box<dyn Fn(V, &K) + Send + Sync>;
type ActionFn = Box<dyn Fn() + Send + Sync>;

/// A cache level whose operations are supplied as closures
pub struct BasicCache<K, V> {
    fetch_fn: FetchFn<K, V>,
    store_fn: StoreFn<K, V>,
    clear_fn: ActionFn,
    memory_pressure_fn: ActionFn,
}

impl<K, V> BasicCache<K, V>
where
    K: Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    /// Build a level from all four operations
    pub fn new<F, S, C, M>(fetch: F, store: S, clear: C, on_memory_pressure: M) -> Self
    where
        F: Fn(&K) -> CacheRequest<V> + Send + Sync + 'static,
        S: Fn(V, &K) + Send + Sync + 'static,
        C: Fn() + Send + Sync + 'static,
        M: Fn() + Send + Sync + 'static,
    {
        Self {
            fetch_fn: Box::new(fetch),
            store_fn: Box::new(store),
            clear_fn: Box::new(clear),
            memory_pressure_fn: Box::new(on_memory_pressure),
        }
    }

    /// Wrap a fetch closure; store, clear and memory pressure do nothing
    pub fn fetcher<F>(fetch: F) -> Self
    where
        F: Fn(&K) -> CacheRequest<V> + Send + Sync + 'static,
    {
        Self::new(fetch, |_, _| {}, || {}, || {})
    }
}

impl<K, V> CacheLevel for BasicCache<K, V>
where
    K: Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    type Key = K;
    type Value = V;

    fn fetch(&self, key: &K) -> CacheRequest<V> {
        (self.fetch_fn)(key)
    }

    fn store(&self, value: V, key: &K) {
        (self.store_fn)(value, key)
    }

    fn clear(&self) {
        (self.clear_fn)()
    }

    fn on_memory_pressure(&self) {
        (self.memory_pressure_fn)()
    }
}

impl<K, V> fmt::Debug for BasicCache<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BasicCache").finish_non_exhaustive()
    }
}

// =============================================================================
// Tests
// =============================================================================
