//! Request Capper - Bounded Fetch Concurrency
//!
//! Wraps a level so that at most `request_cap` fetches run against it at the
//! same time. Fetches beyond the cap are queued in submission order and
//! started as running fetches complete.
//!
//! ```text
//!   fetch ──▶ running < cap ? ──yes──▶ inner.fetch ──complete──┐
//!                  │                                            │
//!                  no                                 free slot, resolve
//!                  ▼                                  caller, drain queue
//!            pending queue (FIFO) ◀─────────────────────────────┘
//! ```
//!
//! Only fetches are capped. `store`, `clear` and `on_memory_pressure` go
//! straight to the wrapped level.
//!
//! # Soft cap
//!
//! The cap bounds how many fetches this wrapper has started and not yet seen
//! complete. It is not a hard ceiling on work inside the wrapped level: a
//! level may keep working after it resolves a request, and other wrappers
//! around the same level are not counted. Callers that need a strict bound on
//! concurrent operations must enforce it with their own exclusion.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, trace, warn};

use super::level::CacheLevel;
use super::request::CacheRequest;
use super::DEFAULT_REQUEST_CAP;
use crate::error::{Error, Result};

// =============================================================================
// Configuration
// =============================================================================

/// Configuration for a request capper
#[derive(Debug, Clone)]
pub struct CapperConfig {
    /// Maximum concurrent fetches passed to the wrapped level
    pub request_cap: usize,
    /// Name used in log events
    pub name: String,
}

impl Default for CapperConfig {
    fn default() -> Self {
        Self {
            request_cap: DEFAULT_REQUEST_CAP,
            name: "capped".to_string(),
        }
    }
}

impl CapperConfig {
    /// Create a config with the given cap
    pub fn new(request_cap: usize) -> Self {
        Self {
            request_cap,
            ..Default::default()
        }
    }

    /// Set the name used in log events
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Check the configuration
    pub fn validate(&self) -> Result<()> {
        if self.request_cap == 0 {
            return Err(Error::Config("request cap must be at least 1".to_string()));
        }
        Ok(())
    }
}

// =============================================================================
// Capper State
// =============================================================================

/// A fetch waiting for a free slot
struct PendingFetch<K, V> {
    key: K,
    request: CacheRequest<V>,
}

struct CapperState<K, V> {
    running: usize,
    queue: VecDeque<PendingFetch<K, V>>,
    started: u64,
    enqueued: u64,
    draining: bool,
}

/// Point-in-time view of a capper
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CapperStats {
    /// Configured cap
    pub request_cap: usize,
    /// Fetches started and not yet completed
    pub running: usize,
    /// Fetches waiting for a slot
    pub queued: usize,
    /// Fetches started since creation
    pub started: u64,
    /// Fetches that had to wait since creation
    pub enqueued: u64,
}

struct Shared<L: CacheLevel> {
    inner: L,
    config: CapperConfig,
    state: Mutex<CapperState<L::Key, L::Value>>,
}

impl<L: CacheLevel> Shared<L> {
    /// Run a fetch that already holds a slot
    fn start(self: &Arc<Self>, job: PendingFetch<L::Key, L::Value>) {
        let PendingFetch { key, request } = job;
        let shared = Arc::clone(self);

        self.inner.fetch(&key).on_completion(move |value, error| {
            // Free the slot first so the counters are settled when the caller wakes
            shared.release();
            match value {
                Some(value) => request.succeed(value.clone()),
                None => request.fail(error.cloned()),
            }
            shared.drain();
        });
    }

    fn release(&self) {
        let mut state = self.state.lock();
        state.running = state.running.saturating_sub(1);
    }

    /// Start queued fetches while slots are free
    ///
    /// Only one caller drains at a time. A fetch that completes synchronously
    /// inside `start` finds the flag set and returns, and the owning loop
    /// picks up the slot it freed, so the stack stays flat however long the
    /// queue is.
    fn drain(self: &Arc<Self>) {
        {
            let mut state = self.state.lock();
            if state.draining {
                return;
            }
            state.draining = true;
        }

        loop {
            let next = {
                let mut state = self.state.lock();
                let job = if state.running < self.config.request_cap {
                    state.queue.pop_front()
                } else {
                    None
                };
                match job {
                    Some(job) => {
                        state.running += 1;
                        state.started += 1;
                        job
                    }
                    None => {
                        state.draining = false;
                        return;
                    }
                }
            };

            trace!(level = %self.config.name, "Starting request");
            self.start(next);
        }
    }
}

// =============================================================================
// Request Capper
// =============================================================================

/// A level that limits concurrent fetches against the level it wraps
pub struct RequestCapper<L: CacheLevel> {
    shared: Arc<Shared<L>>,
}

impl<L: CacheLevel> RequestCapper<L> {
    /// Cap `inner` at `request_cap` concurrent fetches
    ///
    /// A cap of zero would never admit a fetch and is raised to one.
    pub fn new(inner: L, request_cap: usize) -> Self {
        Self::with_config(inner, CapperConfig::new(request_cap))
    }

    /// Create with custom configuration
    pub fn with_config(inner: L, mut config: CapperConfig) -> Self {
        if let Err(e) = config.validate() {
            warn!(level = %config.name, "{}, using a cap of 1", e);
            config.request_cap = 1;
        }

        Self {
            shared: Arc::new(Shared {
                inner,
                config,
                state: Mutex::new(CapperState {
                    running: 0,
                    queue: VecDeque::new(),
                    started: 0,
                    enqueued: 0,
                    draining: false,
                }),
            }),
        }
    }

    /// Get the configured cap
    pub fn request_cap(&self) -> usize {
        self.shared.config.request_cap
    }

    /// Get reference to the wrapped level
    pub fn inner(&self) -> &L {
        &self.shared.inner
    }

    /// Get a snapshot of the capper's counters
    pub fn stats(&self) -> CapperStats {
        let state = self.shared.state.lock();
        CapperStats {
            request_cap: self.shared.config.request_cap,
            running: state.running,
            queued: state.queue.len(),
            started: state.started,
            enqueued: state.enqueued,
        }
    }
}

impl<L: CacheLevel> CacheLevel for RequestCapper<L> {
    type Key = L::Key;
    type Value = L::Value;

    fn fetch(&self, key: &Self::Key) -> CacheRequest<Self::Value> {
        let request = CacheRequest::new();
        let job = PendingFetch {
            key: key.clone(),
            request: request.clone(),
        };

        {
            let mut state = self.shared.state.lock();
            if state.running + state.queue.len() >= self.shared.config.request_cap {
                state.enqueued += 1;
                debug!(
                    level = %self.shared.config.name,
                    cap = self.shared.config.request_cap,
                    queued = state.queue.len() + 1,
                    "Reached request cap, enqueueing request"
                );
            }
            state.queue.push_back(job);
        }

        self.shared.drain();

        request
    }

    fn store(&self, value: Self::Value, key: &Self::Key) {
        self.shared.inner.store(value, key);
    }

    fn clear(&self) {
        self.shared.inner.clear();
    }

    fn on_memory_pressure(&self) {
        self.shared.inner.on_memory_pressure();
    }
}

/// Cap concurrent fetches against a level
pub fn cap_requests<L: CacheLevel>(level: L, request_cap: usize) -> RequestCapper<L> {
    RequestCapper::new(level, request_cap)
}

// =============================================================================
// Tests
// =============================================================================
