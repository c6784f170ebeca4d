//! Tierstack Integration Tests
//!
//! End-to-end pipelines built from the public API:
//! - Multi-tier fallback with write-back
//! - Value and key transformation over real levels
//! - Request capping against a slow origin
//! - Shared and type-erased levels
//! - The `testing` feature's call-recording fake

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;

/// Let spawned backend writes land
async fn settle() {
    tokio::time::sleep(Duration::from_millis(10)).await;
}

// =============================================================================
// Multi-Tier Pipeline Tests
// =============================================================================

mod pipeline_tests {
    use super::*;
    use tierstack::cache::{
        BackendLevel, BasicCache, CacheLevel, CacheLevelExt, CacheRequest, InMemoryBackend,
        Lz4Transformer, MemoryLevel, StorageBackend,
    };
    use tierstack::Error;

    fn counting_origin(fetches: Arc<AtomicUsize>) -> BasicCache<String, Bytes> {
        BasicCache::fetcher(move |key: &String| {
            fetches.fetch_add(1, Ordering::SeqCst);
            if key.starts_with("missing") {
                CacheRequest::failed(Some(Error::NotFound))
            } else {
                CacheRequest::succeeded(Bytes::from(key.repeat(200)))
            }
        })
    }

    #[tokio::test]
    async fn test_three_tier_write_back() {
        let memory = Arc::new(MemoryLevel::<String, Bytes>::new());
        let backend = Arc::new(BackendLevel::new(InMemoryBackend::new()).unwrap());
        let fetches = Arc::new(AtomicUsize::new(0));

        let pipeline = Arc::clone(&memory)
            .compose(Arc::clone(&backend).transform_values(Lz4Transformer::new()))
            .compose(counting_origin(Arc::clone(&fetches)));

        let key = "object".to_string();
        let expected = Bytes::from(key.repeat(200));

        // Cold: origin answers, memory is filled before the caller is notified
        let value = pipeline.fetch(&key).outcome().await;
        assert_eq!(value, Ok(expected.clone()));
        assert_eq!(memory.get(&key), Some(expected.clone()));
        assert_eq!(fetches.load(Ordering::SeqCst), 1);

        // Backend receives the compressed form
        settle().await;
        let stored = backend.backend().get(&key).await.unwrap().unwrap();
        assert!(stored.len() < expected.len());

        // Warm: memory answers
        assert_eq!(pipeline.fetch(&key).outcome().await, Ok(expected.clone()));
        assert_eq!(fetches.load(Ordering::SeqCst), 1);

        // After memory pressure the backend answers and refills memory
        pipeline.on_memory_pressure();
        assert!(memory.is_empty());
        assert_eq!(pipeline.fetch(&key).outcome().await, Ok(expected.clone()));
        assert_eq!(fetches.load(Ordering::SeqCst), 1);
        assert!(memory.contains(&key));
        assert_eq!(backend.stats().hits, 1);
    }

    #[tokio::test]
    async fn test_miss_everywhere_reports_last_error() {
        let memory = Arc::new(MemoryLevel::<String, Bytes>::new());
        let fetches = Arc::new(AtomicUsize::new(0));
        let pipeline = Arc::clone(&memory).compose(counting_origin(Arc::clone(&fetches)));

        let outcome = pipeline.fetch(&"missing-1".to_string()).outcome().await;

        assert_eq!(outcome, Err(Some(Error::NotFound)));
        assert!(memory.is_empty());
        assert_eq!(memory.stats().misses, 1);
    }

    #[tokio::test]
    async fn test_store_and_clear_reach_every_tier() {
        let memory = Arc::new(MemoryLevel::<String, Bytes>::new());
        let backend = Arc::new(BackendLevel::new(InMemoryBackend::new()).unwrap());
        let pipeline = Arc::clone(&memory).compose(Arc::clone(&backend));

        pipeline.store(Bytes::from_static(b"v"), &"k".to_string());
        settle().await;
        assert!(memory.contains(&"k".to_string()));
        assert_eq!(backend.backend().stats().object_count, 1);

        pipeline.clear();
        settle().await;
        assert!(memory.is_empty());
        assert_eq!(backend.backend().stats().object_count, 0);
    }

    #[test]
    fn test_synchronous_pipeline_with_block_on() {
        let pipeline = MemoryLevel::<u32, u32>::new()
            .compose_fetcher(|k: &u32| CacheRequest::succeeded(k * k));

        let value = tokio_test::block_on(pipeline.fetch(&12).outcome());
        assert_eq!(value, Ok(144));
        assert_eq!(pipeline.primary().get(&12), Some(144));
    }
}

// =============================================================================
// Transformation Tests
// =============================================================================

mod transformation_tests {
    use super::*;
    use serde::{Deserialize, Serialize};
    use tierstack::cache::{
        BackendLevel, CacheLevel, CacheLevelExt, CacheRequest, DisplayKeyTransformer,
        InMemoryBackend, JsonTransformer, MemoryLevel, TwoWayTransformationBox, Utf8Transformer,
    };
    use tierstack::ErrorKind;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Account {
        id: u64,
        owner: String,
    }

    #[tokio::test]
    async fn test_json_values_over_numeric_keys() {
        let backend = Arc::new(BackendLevel::new(InMemoryBackend::new()).unwrap());
        let accounts = Arc::clone(&backend)
            .transform_values(JsonTransformer::<Account>::new())
            .transform_keys(DisplayKeyTransformer::<u64>::new());

        let account = Account {
            id: 7,
            owner: "ada".into(),
        };
        accounts.store(account.clone(), &7);
        settle().await;

        let raw = backend.fetch(&"7".to_string()).outcome().await.unwrap();
        assert_eq!(raw, Bytes::from(r#"{"id":7,"owner":"ada"}"#));
        assert_eq!(accounts.fetch(&7).outcome().await, Ok(account));
    }

    #[tokio::test]
    async fn test_undecodable_value_fails_fetch() {
        let backend = Arc::new(BackendLevel::new(InMemoryBackend::new()).unwrap());
        backend.store(Bytes::from_static(&[0xff, 0xfe]), &"bad".to_string());
        settle().await;

        let text = Arc::clone(&backend).transform_values(Utf8Transformer);
        let outcome = text.fetch(&"bad".to_string()).outcome().await;

        let kind = outcome.unwrap_err().map(|e| e.kind());
        assert_eq!(kind, Some(ErrorKind::ValueTransformationFailed));
    }

    #[test]
    fn test_parsed_values_over_string_memory() {
        let parse = TwoWayTransformationBox::new(
            |s: &String| s.parse::<i64>().ok(),
            |n: &i64| Some(n.to_string()),
        );
        let memory = Arc::new(MemoryLevel::<String, String>::new());
        let numbers = Arc::clone(&memory)
            .transform_values(parse)
            .compose_fetcher(|key: &String| CacheRequest::succeeded(key.len() as i64));

        let value = tokio_test::block_on(numbers.fetch(&"four".to_string()).outcome());
        assert_eq!(value, Ok(4));
        assert_eq!(memory.get(&"four".to_string()), Some("4".to_string()));
    }
}

// =============================================================================
// Request Capping Tests
// =============================================================================

mod capper_tests {
    use super::*;
    use futures::future::join_all;
    use tierstack::cache::{BasicCache, CacheLevel, CacheLevelExt, CacheRequest, MemoryLevel};

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_capped_origin_behind_memory() {
        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let (flight, high) = (Arc::clone(&in_flight), Arc::clone(&peak));

        let origin = BasicCache::fetcher(move |key: &u32| {
            let now = flight.fetch_add(1, Ordering::SeqCst) + 1;
            high.fetch_max(now, Ordering::SeqCst);

            let request = CacheRequest::new();
            let (producer, flight, key) = (request.clone(), Arc::clone(&flight), *key);
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(5)).await;
                flight.fetch_sub(1, Ordering::SeqCst);
                producer.succeed(key + 1000);
            });
            request
        });

        let memory = Arc::new(MemoryLevel::<u32, u32>::new());
        let pipeline = Arc::clone(&memory).compose(origin.cap_requests(2));

        let outcomes = join_all((0..16u32).map(|k| pipeline.fetch(&k).outcome())).await;

        for (k, outcome) in outcomes.into_iter().enumerate() {
            assert_eq!(outcome, Ok(k as u32 + 1000));
        }
        assert!(peak.load(Ordering::SeqCst) <= 2);
        assert_eq!(memory.len(), 16);

        let capper = pipeline.secondary();
        assert_eq!(capper.stats().running, 0);
        assert_eq!(capper.stats().enqueued, 14);
    }
}

// =============================================================================
// Shared Level Tests
// =============================================================================

mod sharing_tests {
    use super::*;
    use tierstack::cache::{
        compose, BasicCache, CacheLevel, CacheLevelExt, CacheRequest, DynCacheLevel, MemoryLevel,
        MemoryLevelConfig,
    };

    #[test]
    fn test_one_memory_level_in_two_pipelines() {
        let shared = Arc::new(MemoryLevel::<String, String>::new());

        let upper = Arc::clone(&shared)
            .compose_fetcher(|k: &String| CacheRequest::succeeded(k.to_uppercase()));
        let lower = Arc::clone(&shared)
            .compose_fetcher(|k: &String| CacheRequest::succeeded(k.to_lowercase()));

        // Whichever pipeline populates the key first wins for both
        assert!(upper.fetch(&"Key".to_string()).is_succeeded());
        let value = tokio_test::block_on(lower.fetch(&"Key".to_string()).outcome());
        assert_eq!(value, Ok("KEY".to_string()));
    }

    #[test]
    fn test_type_erased_levels() {
        let levels: Vec<DynCacheLevel<u8, u8>> = vec![
            MemoryLevel::<u8, u8>::new().into_dyn(),
            BasicCache::fetcher(|k: &u8| CacheRequest::succeeded(*k)).into_dyn(),
        ];

        let chained = compose(Arc::clone(&levels[0]), Arc::clone(&levels[1]));
        assert!(chained.fetch(&3).is_succeeded());
        assert!(levels[0].fetch(&3).is_succeeded());
    }

    #[test]
    fn test_memory_pressure_respects_level_config() {
        let volatile = Arc::new(MemoryLevel::<u8, u8>::new());
        let pinned = Arc::new(MemoryLevel::<u8, u8>::with_config(
            MemoryLevelConfig::default().with_clear_on_memory_pressure(false),
        ));
        let pipeline = Arc::clone(&volatile).compose(Arc::clone(&pinned));

        pipeline.store(1, &1);
        pipeline.on_memory_pressure();

        assert!(volatile.is_empty());
        assert_eq!(pinned.get(&1), Some(1));
        assert!(pipeline.fetch(&1).is_succeeded());
        assert_eq!(volatile.get(&1), Some(1));
    }
}

// =============================================================================
// Test Double Tests
// =============================================================================

#[cfg(feature = "testing")]
mod fake_tests {
    use super::*;
    use tierstack::cache::testing::CacheLevelFake;
    use tierstack::cache::{CacheLevel, CacheLevelExt, CacheRequest, MemoryLevel};

    #[test]
    fn test_fake_as_secondary_of_memory() {
        let origin = Arc::new(CacheLevelFake::<String, u32>::new());
        origin.set_request_to_return(CacheRequest::succeeded(3));
        let memory = Arc::new(MemoryLevel::<String, u32>::new());
        let pipeline = Arc::clone(&memory).compose(Arc::clone(&origin));

        assert!(pipeline.fetch(&"a".to_string()).is_succeeded());
        assert!(pipeline.fetch(&"a".to_string()).is_succeeded());

        assert_eq!(origin.fetch_count(), 1);
        assert_eq!(origin.last_fetched_key(), Some("a".to_string()));
        assert_eq!(memory.get(&"a".to_string()), Some(3));
    }
}
