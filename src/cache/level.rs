//! Cache Level Abstraction
//!
//! A cache level is anything that can fetch, store and clear keyed values and
//! react to memory pressure. Concrete storage, composed pipelines, value
//! transformers and request cappers all implement the same trait, so a
//! pipeline is indistinguishable from a primitive level.
//!
//! # Example
//!
//! ```
//! use tierstack::cache::{BasicCache, CacheLevel, CacheLevelExt, CacheRequest, MemoryLevel};
//!
//! let origin = BasicCache::fetcher(|key: &String| CacheRequest::succeeded(key.len()));
//! let pipeline = MemoryLevel::<String, usize>::new().compose(origin);
//!
//! pipeline
//!     .fetch(&"hello".to_string())
//!     .on_success(|len| assert_eq!(*len, 5));
//! ```

use std::sync::Arc;

use super::basic::BasicCache;
use super::capper::RequestCapper;
use super::composed::Composed;
use super::key_transformation::KeyTransformed;
use super::request::CacheRequest;
use super::transformer::{OneWayTransformer, TwoWayTransformer};
use super::value_transformation::ValueTransformed;

/// Capability set shared by every cache level
///
/// `fetch` never signals failure synchronously: every outcome, including
/// "not found", is delivered through the returned [`CacheRequest`].
/// `store`, `clear` and `on_memory_pressure` are fire-and-forget.
pub trait CacheLevel: Send + Sync + 'static {
    /// Key type accepted by this level
    type Key: Clone + Send + Sync + 'static;
    /// Value type produced and accepted by this level
    type Value: Clone + Send + Sync + 'static;

    /// Fetch the value for `key`
    fn fetch(&self, key: &Self::Key) -> CacheRequest<Self::Value>;

    /// Store `value` under `key`
    fn store(&self, value: Self::Value, key: &Self::Key);

    /// Drop every value held by this level
    fn clear(&self);

    /// React to a memory pressure notification
    fn on_memory_pressure(&self);
}

/// Type-erased, shareable cache level
pub type DynCacheLevel<K, V> = Arc<dyn CacheLevel<Key = K, Value = V>>;

impl<L: CacheLevel + ?Sized> CacheLevel for Arc<L> {
    type Key = L::Key;
    type Value = L::Value;

    fn fetch(&self, key: &Self::Key) -> CacheRequest<Self::Value> {
        (**self).fetch(key)
    }

    fn store(&self, value: Self::Value, key: &Self::Key) {
        (**self).store(value, key)
    }

    fn clear(&self) {
        (**self).clear()
    }

    fn on_memory_pressure(&self) {
        (**self).on_memory_pressure()
    }
}

/// Combinators available on every sized cache level
pub trait CacheLevelExt: CacheLevel + Sized {
    /// Use `secondary` as the fallback for this level, writing its hits back here
    fn compose<B>(self, secondary: B) -> Composed<Self, B>
    where
        B: CacheLevel<Key = Self::Key, Value = Self::Value>,
    {
        Composed::new(self, secondary)
    }

    /// Use a bare fetch closure as the fallback for this level
    fn compose_fetcher<F>(self, fetcher: F) -> Composed<Self, BasicCache<Self::Key, Self::Value>>
    where
        F: Fn(&Self::Key) -> CacheRequest<Self::Value> + Send + Sync + 'static,
    {
        Composed::new(self, BasicCache::fetcher(fetcher))
    }

    /// Expose this level's values through a two-way transformer
    fn transform_values<T>(self, transformer: T) -> ValueTransformed<Self, T>
    where
        T: TwoWayTransformer<Input = Self::Value>,
    {
        ValueTransformed::new(self, transformer)
    }

    /// Accept a different key type, mapped onto this level's keys
    fn transform_keys<T>(self, transformer: T) -> KeyTransformed<Self, T>
    where
        T: OneWayTransformer<Output = Self::Key>,
    {
        KeyTransformed::new(self, transformer)
    }

    /// Allow at most `request_cap` concurrent fetches against this level
    fn cap_requests(self, request_cap: usize) -> RequestCapper<Self> {
        RequestCapper::new(self, request_cap)
    }

    /// Erase the concrete type of this level
    fn into_dyn(self) -> DynCacheLevel<Self::Key, Self::Value> {
        Arc::new(self)
    }
}

impl<L: CacheLevel> CacheLevelExt for L {}

// =============================================================================
// Tests
// =============================================================================
