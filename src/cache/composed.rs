//! Composed Level - Fallback with Write-Back
//!
//! Composing a primary level with a secondary level yields a level that
//! consults the secondary only when the primary misses, and writes secondary
//! hits back into the primary.
//!
//! ```text
//!   fetch(k) ──▶ primary ──hit──▶ value
//!                   │
//!                 miss
//!                   ▼
//!               secondary ──hit──▶ primary.store(value, k) ──▶ value
//!                   │
//!                 miss ──▶ failure (secondary's error)
//! ```
//!
//! Pipelines of any length are built by composing two levels at a time.
//! Because every tier writes back into the tier directly above it, a value
//! found deep in the chain populates each level it bypassed on the way up.

use std::sync::Arc;

use tracing::trace;

use super::basic::BasicCache;
use super::level::CacheLevel;
use super::request::CacheRequest;

/// Two levels chained so that `secondary` backs `primary`
pub struct Composed<A, B> {
    primary: Arc<A>,
    secondary: Arc<B>,
}

impl<A, B> Composed<A, B>
where
    A: CacheLevel,
    B: CacheLevel<Key = A::Key, Value = A::Value>,
{
    /// Compose `primary` with `secondary` as its fallback
    pub fn new(primary: A, secondary: B) -> Self {
        Self {
            primary: Arc::new(primary),
            secondary: Arc::new(secondary),
        }
    }

    /// Get reference to the primary level
    pub fn primary(&self) -> &A {
        &self.primary
    }

    /// Get reference to the secondary level
    pub fn secondary(&self) -> &B {
        &self.secondary
    }
}

impl<A, B> CacheLevel for Composed<A, B>
where
    A: CacheLevel,
    B: CacheLevel<Key = A::Key, Value = A::Value>,
{
    type Key = A::Key;
    type Value = A::Value;

    fn fetch(&self, key: &Self::Key) -> CacheRequest<Self::Value> {
        let request = CacheRequest::new();

        let on_hit = request.clone();
        let on_miss = request.clone();
        let primary = Arc::clone(&self.primary);
        let secondary = Arc::clone(&self.secondary);
        let fallback_key = key.clone();

        self.primary
            .fetch(key)
            .on_success(move |value| on_hit.succeed(value.clone()))
            .on_failure(move |_| {
                let fallback = secondary.fetch(&fallback_key);
                let on_fallback_hit = on_miss.clone();

                fallback
                    .on_success(move |value| {
                        trace!("Secondary level hit, writing back to primary");
                        primary.store(value.clone(), &fallback_key);
                        on_fallback_hit.succeed(value.clone());
                    })
                    .on_failure(move |error| on_miss.fail(error.cloned()));
            });

        request
    }

    fn store(&self, value: Self::Value, key: &Self::Key) {
        self.primary.store(value.clone(), key);
        self.secondary.store(value, key);
    }

    fn clear(&self) {
        self.primary.clear();
        self.secondary.clear();
    }

    fn on_memory_pressure(&self) {
        self.primary.on_memory_pressure();
        self.secondary.on_memory_pressure();
    }
}

/// Compose two levels
pub fn compose<A, B>(primary: A, secondary: B) -> Composed<A, B>
where
    A: CacheLevel,
    B: CacheLevel<Key = A::Key, Value = A::Value>,
{
    Composed::new(primary, secondary)
}

/// Compose two fetch closures into a level
pub fn compose_fetchers<K, V, F, G>(first: F, second: G) -> Composed<BasicCache<K, V>, BasicCache<K, V>>
where
    K: Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
    F: Fn(&K) -> CacheRequest<V> + Send + Sync + 'static,
    G: Fn(&K) -> CacheRequest<V> + Send + Sync + 'static,
{
    Composed::new(BasicCache::fetcher(first), BasicCache::fetcher(second))
}

// =============================================================================
// Tests
// =============================================================================
