//! Value Transformation
//!
//! Adapts a level whose native value type differs from the type the caller
//! wants. Reads go through the forward transform, writes through the inverse.
//!
//! - A forward transform returning `None` turns a successful fetch into a
//!   failure with [`Error::ValueTransformationFailed`].
//! - An inverse transform returning `None` skips the store. `store` has no
//!   failure channel, so nothing is reported.

use std::sync::Arc;

use tracing::{debug, trace};

use super::basic::BasicCache;
use super::level::CacheLevel;
use super::request::CacheRequest;
use super::transformer::TwoWayTransformer;
use crate::error::Error;

/// A level exposing `T::Output` values over an inner level of `T::Input` values
pub struct ValueTransformed<L, T> {
    inner: L,
    transformer: Arc<T>,
}

impl<L, T> ValueTransformed<L, T>
where
    L: CacheLevel,
    T: TwoWayTransformer<Input = L::Value>,
{
    pub fn new(inner: L, transformer: T) -> Self {
        Self {
            inner,
            transformer: Arc::new(transformer),
        }
    }

    /// Get reference to the wrapped level
    pub fn inner(&self) -> &L {
        &self.inner
    }

    /// Get reference to the transformer
    pub fn transformer(&self) -> &T {
        &self.transformer
    }
}

impl<L, T> CacheLevel for ValueTransformed<L, T>
where
    L: CacheLevel,
    T: TwoWayTransformer<Input = L::Value>,
{
    type Key = L::Key;
    type Value = T::Output;

    fn fetch(&self, key: &Self::Key) -> CacheRequest<Self::Value> {
        let request = CacheRequest::new();

        let on_value = request.clone();
        let on_error = request.clone();
        let transformer = Arc::clone(&self.transformer);

        self.inner
            .fetch(key)
            .on_success(move |value| match transformer.transform(value) {
                Some(transformed) => on_value.succeed(transformed),
                None => {
                    debug!("Fetched value could not be transformed");
                    on_value.fail(Some(Error::ValueTransformationFailed));
                }
            })
            .on_failure(move |error| on_error.fail(error.cloned()));

        request
    }

    fn store(&self, value: Self::Value, key: &Self::Key) {
        match self.transformer.inverse_transform(&value) {
            Some(native) => self.inner.store(native, key),
            None => trace!("Inverse transformation failed, skipping store"),
        }
    }

    fn clear(&self) {
        self.inner.clear();
    }

    fn on_memory_pressure(&self) {
        self.inner.on_memory_pressure();
    }
}

/// Apply a value transformer to a level
pub fn transform_values<L, T>(level: L, transformer: T) -> ValueTransformed<L, T>
where
    L: CacheLevel,
    T: TwoWayTransformer<Input = L::Value>,
{
    ValueTransformed::new(level, transformer)
}

/// Apply a value transformer to a bare fetch closure
pub fn transform_fetcher_values<K, F, T>(fetcher: F, transformer: T) -> ValueTransformed<BasicCache<K, T::Input>, T>
where
    K: Clone + Send + Sync + 'static,
    F: Fn(&K) -> CacheRequest<T::Input> + Send + Sync + 'static,
    T: TwoWayTransformer,
{
    ValueTransformed::new(BasicCache::fetcher(fetcher), transformer)
}

// =============================================================================
// Tests
// =============================================================================
