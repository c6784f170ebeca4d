//! Key Transformation
//!
//! Maps a caller-facing key type onto the key space of an inner level. A key
//! that cannot be mapped fails the fetch with
//! [`Error::KeyTransformationFailed`] and skips the store.

use tracing::trace;

use super::level::CacheLevel;
use super::request::CacheRequest;
use super::transformer::OneWayTransformer;
use crate::error::Error;

/// A level keyed by `T::Input` over an inner level keyed by `T::Output`
pub struct KeyTransformed<L, T> {
    inner: L,
    transformer: T,
}

impl<L, T> KeyTransformed<L, T>
where
    L: CacheLevel,
    T: OneWayTransformer<Output = L::Key>,
{
    pub fn new(inner: L, transformer: T) -> Self {
        Self { inner, transformer }
    }

    /// Get reference to the wrapped level
    pub fn inner(&self) -> &L {
        &self.inner
    }
}

impl<L, T> CacheLevel for KeyTransformed<L, T>
where
    L: CacheLevel,
    T: OneWayTransformer<Output = L::Key>,
{
    type Key = T::Input;
    type Value = L::Value;

    fn fetch(&self, key: &Self::Key) -> CacheRequest<Self::Value> {
        match self.transformer.transform(key) {
            Some(inner_key) => self.inner.fetch(&inner_key),
            None => CacheRequest::failed(Some(Error::KeyTransformationFailed)),
        }
    }

    fn store(&self, value: Self::Value, key: &Self::Key) {
        match self.transformer.transform(key) {
            Some(inner_key) => self.inner.store(value, &inner_key),
            None => trace!("Key transformation failed, skipping store"),
        }
    }

    fn clear(&self) {
        self.inner.clear();
    }

    fn on_memory_pressure(&self) {
        self.inner.on_memory_pressure();
    }
}

/// Apply a key transformer to a level
pub fn transform_keys<L, T>(level: L, transformer: T) -> KeyTransformed<L, T>
where
    L: CacheLevel,
    T: OneWayTransformer<Output = L::Key>,
{
    KeyTransformed::new(level, transformer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::level::CacheLevelExt;
    use crate::cache::memory::MemoryLevel;
    use crate::cache::testing::CacheLevelFake;
    use crate::cache::transformer::{DisplayKeyTransformer, OneWayTransformationBox};
    use crate::error::ErrorKind;
    use parking_lot::Mutex;
    use std::sync::Arc;

    fn user_ids() -> OneWayTransformationBox<String, u64> {
        OneWayTransformationBox::new(|key: &String| key.strip_prefix("user:")?.parse().ok())
    }

    #[test]
    fn test_fetch_with_transformed_key() {
        let inner = Arc::new(CacheLevelFake::<u64, String>::new());
        inner.set_request_to_return(CacheRequest::succeeded("ada".to_string()));
        let cache = transform_keys(Arc::clone(&inner), user_ids());

        assert!(cache.fetch(&"user:17".to_string()).is_succeeded());
        assert_eq!(inner.last_fetched_key(), Some(17));
    }

    #[test]
    fn test_untransformable_key_fails_without_reaching_inner() {
        let inner = Arc::new(CacheLevelFake::<u64, String>::new());
        let cache = transform_keys(Arc::clone(&inner), user_ids());

        let kind = Arc::new(Mutex::new(None));
        let sink = Arc::clone(&kind);
        cache
            .fetch(&"group:3".to_string())
            .on_failure(move |e| *sink.lock() = e.map(Error::kind));

        assert_eq!(*kind.lock(), Some(ErrorKind::KeyTransformationFailed));
        assert_eq!(inner.fetch_count(), 0);
    }

    #[test]
    fn test_store_with_untransformable_key_is_skipped() {
        let inner = Arc::new(CacheLevelFake::<u64, String>::new());
        let cache = transform_keys(Arc::clone(&inner), user_ids());

        cache.store("x".to_string(), &"user:nope".to_string());
        assert_eq!(inner.store_count(), 0);

        cache.store("y".to_string(), &"user:4".to_string());
        assert_eq!(inner.last_stored(), Some(("y".to_string(), 4)));
    }

    #[test]
    fn test_display_keys_over_string_level() {
        let memory = Arc::new(MemoryLevel::<String, u8>::new());
        let cache = Arc::clone(&memory).transform_keys(DisplayKeyTransformer::<u32>::new());

        cache.store(3, &99);
        assert_eq!(memory.get(&"99".to_string()), Some(3));
        assert!(cache.fetch(&99).is_succeeded());

        cache.clear();
        assert!(memory.is_empty());
    }
}
