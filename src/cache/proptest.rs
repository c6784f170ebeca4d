//! Property-Based Tests for Cache Requests and Levels
//!
//! # Test Properties
//!
//! 1. **Observer Order**: observers of one kind run in registration order
//! 2. **First Resolution Wins**: later `succeed`/`fail` calls are ignored
//! 3. **FIFO Admission**: a capper starts queued fetches in submission order
//!    and never exceeds its cap
//! 4. **Write-Back**: a composed miss-then-hit leaves the value in the primary

#![cfg(test)]

use std::sync::Arc;

use parking_lot::Mutex;
use proptest::prelude::*;

use super::basic::BasicCache;
use super::capper::RequestCapper;
use super::composed::Composed;
use super::level::CacheLevel;
use super::memory::MemoryLevel;
use super::request::CacheRequest;
use crate::error::Error;

// =============================================================================
// Property Strategies
// =============================================================================

/// A resolution to apply to a request: `Ok(value)` or `Err(())` for failure
fn resolution_strategy() -> impl Strategy<Value = Result<u32, ()>> {
    prop_oneof![any::<u32>().prop_map(Ok), Just(Err(()))]
}

fn apply(request: &CacheRequest<u32>, resolution: Result<u32, ()>) {
    match resolution {
        Ok(value) => request.succeed(value),
        Err(()) => request.fail(Some(Error::NotFound)),
    }
}

// =============================================================================
// Request Properties
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Property: observers registered before and after resolution all fire
    /// exactly once, in registration order.
    #[test]
    fn prop_observers_fire_in_registration_order(
        before in 0usize..16,
        after in 0usize..16,
        resolution in resolution_strategy(),
    ) {
        let request = CacheRequest::new();
        let order = Arc::new(Mutex::new(Vec::new()));

        for i in 0..before {
            let order = Arc::clone(&order);
            request.on_completion(move |_, _| order.lock().push(i));
        }
        apply(&request, resolution);
        for i in before..before + after {
            let order = Arc::clone(&order);
            request.on_completion(move |_, _| order.lock().push(i));
        }

        let expected: Vec<usize> = (0..before + after).collect();
        prop_assert_eq!(&*order.lock(), &expected);
    }

    /// Property: only the first resolution is observable.
    #[test]
    fn prop_first_resolution_wins(
        resolutions in prop::collection::vec(resolution_strategy(), 1..8),
    ) {
        let request = CacheRequest::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let sink = Arc::clone(&seen);
        request.on_completion(move |value, _| sink.lock().push(value.copied()));

        for resolution in resolutions.iter().copied() {
            apply(&request, resolution);
        }

        let first = resolutions[0].ok();
        prop_assert_eq!(&*seen.lock(), &vec![first]);
        prop_assert_eq!(request.is_succeeded(), first.is_some());
        prop_assert_eq!(request.is_failed(), first.is_none());
    }
}

// =============================================================================
// Level Properties
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(50))]

    /// Property: with manually completed fetches, the capper admits in FIFO
    /// order and the number started-but-unfinished never exceeds the cap.
    #[test]
    fn prop_capper_fifo_admission(
        cap in 1usize..6,
        fetches in 1usize..40,
        completion_seed in any::<u64>(),
    ) {
        let issued: Arc<Mutex<Vec<(usize, CacheRequest<usize>)>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&issued);
        let fetcher = BasicCache::fetcher(move |key: &usize| {
            let request = CacheRequest::new();
            sink.lock().push((*key, request.clone()));
            request
        });
        let capper = RequestCapper::new(fetcher, cap);

        let requests: Vec<_> = (0..fetches).map(|k| capper.fetch(&k)).collect();

        let mut completed = 0usize;
        let mut seed = completion_seed;
        while completed < fetches {
            let started = issued.lock().len();
            prop_assert!(started - completed <= cap);

            // Complete a pseudo-random in-flight fetch
            let pending: Vec<CacheRequest<usize>> = issued
                .lock()
                .iter()
                .filter(|(_, r)| r.is_pending())
                .map(|(_, r)| r.clone())
                .collect();
            seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            let pick = (seed >> 33) as usize % pending.len();
            pending[pick].succeed(pick);
            completed += 1;
        }

        let keys: Vec<usize> = issued.lock().iter().map(|(k, _)| *k).collect();
        prop_assert_eq!(keys, (0..fetches).collect::<Vec<_>>());
        prop_assert!(requests.iter().all(|r| r.is_succeeded()));
        prop_assert_eq!(capper.stats().running, 0);
    }

    /// Property: after a composed fetch that missed the primary and hit the
    /// secondary, the primary holds the value.
    #[test]
    fn prop_composed_writes_back(keys in prop::collection::vec(0u16..64, 1..32)) {
        let primary = Arc::new(MemoryLevel::<u16, u32>::new());
        let secondary = BasicCache::fetcher(|k: &u16| CacheRequest::succeeded(*k as u32 * 3));
        let cache = Composed::new(Arc::clone(&primary), secondary);

        for key in &keys {
            prop_assert!(cache.fetch(key).is_succeeded());
            prop_assert_eq!(primary.get(key), Some(*key as u32 * 3));
        }
    }
}
