//! Test double for cache levels
//!
//! [`CacheLevelFake`] records every call it receives and answers fetches with
//! a request chosen by the test, so composition logic can be checked without
//! a real store behind it.

use parking_lot::Mutex;

use super::level::CacheLevel;
use super::request::CacheRequest;

struct Calls<K, V> {
    request_to_return: Option<CacheRequest<V>>,
    fetched: Vec<K>,
    stored: Vec<(V, K)>,
    clears: usize,
    memory_pressure: usize,
}

/// Level that counts calls and returns a configurable request
pub struct CacheLevelFake<K, V> {
    calls: Mutex<Calls<K, V>>,
}

impl<K, V> Default for CacheLevelFake<K, V> {
    fn default() -> Self {
        Self {
            calls: Mutex::new(Calls {
                request_to_return: None,
                fetched: Vec::new(),
                stored: Vec::new(),
                clears: 0,
                memory_pressure: 0,
            }),
        }
    }
}

impl<K: Clone, V: Clone> CacheLevelFake<K, V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every following fetch return a handle to `request`
    ///
    /// Without one, each fetch returns a fresh pending request.
    pub fn set_request_to_return(&self, request: CacheRequest<V>) {
        self.calls.lock().request_to_return = Some(request);
    }

    pub fn fetch_count(&self) -> usize {
        self.calls.lock().fetched.len()
    }

    pub fn store_count(&self) -> usize {
        self.calls.lock().stored.len()
    }

    pub fn clear_count(&self) -> usize {
        self.calls.lock().clears
    }

    pub fn memory_pressure_count(&self) -> usize {
        self.calls.lock().memory_pressure
    }

    pub fn last_fetched_key(&self) -> Option<K> {
        self.calls.lock().fetched.last().cloned()
    }

    /// Last `(value, key)` pair passed to `store`
    pub fn last_stored(&self) -> Option<(V, K)> {
        self.calls.lock().stored.last().cloned()
    }
}

impl<K, V> CacheLevel for CacheLevelFake<K, V>
where
    K: Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    type Key = K;
    type Value = V;

    fn fetch(&self, key: &K) -> CacheRequest<V> {
        let mut calls = self.calls.lock();
        calls.fetched.push(key.clone());
        calls.request_to_return.clone().unwrap_or_default()
    }

    fn store(&self, value: V, key: &K) {
        self.calls.lock().stored.push((value, key.clone()));
    }

    fn clear(&self) {
        self.calls.lock().clears += 1;
    }

    fn on_memory_pressure(&self) {
        self.calls.lock().memory_pressure += 1;
    }
}
