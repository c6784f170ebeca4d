//! Backend Level - Async Storage Tier
//!
//! Adapts an asynchronous [`StorageBackend`] to the callback-based
//! [`CacheLevel`] contract. Every operation is spawned on a tokio runtime
//! handle and the returned request is resolved from the spawned task.
//!
//! # Design
//!
//! - Pluggable backend (in-memory, filesystem, object store, ...)
//! - `get` returning `Ok(None)` is a miss and fails the fetch with
//!   [`Error::NotFound`]
//! - `store` and `clear` have no failure channel, so backend errors are
//!   logged and dropped

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;
use tokio::runtime::Handle;
use tracing::{debug, instrument, warn};

use super::level::CacheLevel;
use super::metrics::{LevelMetrics, LevelStats};
use super::request::CacheRequest;
use crate::error::{Error, Result};

// =============================================================================
// Storage Backend
// =============================================================================

/// Asynchronous key/value store used as a cache tier
#[async_trait]
pub trait StorageBackend: Send + Sync + 'static {
    /// Get an object from storage
    async fn get(&self, key: &str) -> Result<Option<Bytes>>;

    /// Put an object into storage
    async fn put(&self, key: &str, data: Bytes) -> Result<()>;

    /// Delete every object
    async fn clear(&self) -> Result<()>;

    /// Get storage statistics
    fn stats(&self) -> BackendStats;
}

/// Backend statistics
#[derive(Debug, Clone, Default)]
pub struct BackendStats {
    /// Total objects stored
    pub object_count: u64,
    /// Total bytes stored
    pub total_bytes: u64,
    /// Read operations
    pub reads: u64,
    /// Write operations
    pub writes: u64,
}

// =============================================================================
// In-Memory Backend
// =============================================================================

/// In-memory backend with optional artificial latency
#[derive(Default)]
pub struct InMemoryBackend {
    storage: DashMap<String, Bytes>,
    latency: Option<Duration>,
    total_bytes: AtomicU64,
    reads: AtomicU64,
    writes: AtomicU64,
}

impl InMemoryBackend {
    /// Create a new in-memory backend
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every operation by `latency`
    pub fn with_latency(latency: Duration) -> Self {
        Self {
            latency: Some(latency),
            ..Default::default()
        }
    }

    async fn simulate_latency(&self) {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }
}

#[async_trait]
impl StorageBackend for InMemoryBackend {
    #[instrument(skip(self))]
    async fn get(&self, key: &str) -> Result<Option<Bytes>> {
        self.simulate_latency().await;
        self.reads.fetch_add(1, Ordering::Relaxed);
        Ok(self.storage.get(key).map(|data| data.clone()))
    }

    #[instrument(skip(self, data), fields(size = data.len()))]
    async fn put(&self, key: &str, data: Bytes) -> Result<()> {
        self.simulate_latency().await;
        self.writes.fetch_add(1, Ordering::Relaxed);

        let size = data.len() as u64;
        if let Some(old) = self.storage.insert(key.to_string(), data) {
            self.total_bytes.fetch_sub(old.len() as u64, Ordering::Relaxed);
        }
        self.total_bytes.fetch_add(size, Ordering::Relaxed);
        Ok(())
    }

    #[instrument(skip(self))]
    async fn clear(&self) -> Result<()> {
        self.simulate_latency().await;
        self.storage.clear();
        self.total_bytes.store(0, Ordering::Relaxed);
        Ok(())
    }

    fn stats(&self) -> BackendStats {
        BackendStats {
            object_count: self.storage.len() as u64,
            total_bytes: self.total_bytes.load(Ordering::Relaxed),
            reads: self.reads.load(Ordering::Relaxed),
            writes: self.writes.load(Ordering::Relaxed),
        }
    }
}

// =============================================================================
// Backend Level
// =============================================================================

/// Backend level configuration
#[derive(Debug, Clone)]
pub struct BackendLevelConfig {
    /// Name used in stats and log events
    pub name: String,
}

impl Default for BackendLevelConfig {
    fn default() -> Self {
        Self {
            name: "backend".to_string(),
        }
    }
}

impl BackendLevelConfig {
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

/// Cache level backed by a [`StorageBackend`]
pub struct BackendLevel<B> {
    backend: Arc<B>,
    handle: Handle,
    config: BackendLevelConfig,
    metrics: Arc<LevelMetrics>,
}

impl<B: StorageBackend> BackendLevel<B> {
    /// Create a level that spawns on the current tokio runtime
    ///
    /// Fails with [`Error::Config`] when called outside a runtime.
    pub fn new(backend: B) -> Result<Self> {
        let handle = Handle::try_current()
            .map_err(|e| Error::Config(format!("backend level needs a tokio runtime: {}", e)))?;
        Ok(Self::with_handle(backend, handle, BackendLevelConfig::default()))
    }

    /// Create a level that spawns on the given runtime
    pub fn with_handle(backend: B, handle: Handle, config: BackendLevelConfig) -> Self {
        Self {
            backend: Arc::new(backend),
            handle,
            config,
            metrics: Arc::new(LevelMetrics::new()),
        }
    }

    /// Get reference to the backend
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Get configuration
    pub fn config(&self) -> &BackendLevelConfig {
        &self.config
    }

    /// Get level statistics
    pub fn stats(&self) -> LevelStats {
        let entries = self.backend.stats().object_count as usize;
        self.metrics.snapshot(&self.config.name, entries)
    }
}

impl<B: StorageBackend> CacheLevel for BackendLevel<B> {
    type Key = String;
    type Value = Bytes;

    fn fetch(&self, key: &String) -> CacheRequest<Bytes> {
        let request = CacheRequest::new();

        let producer = request.clone();
        let backend = Arc::clone(&self.backend);
        let metrics = Arc::clone(&self.metrics);
        let key = key.clone();

        self.handle.spawn(async move {
            match backend.get(&key).await {
                Ok(Some(data)) => {
                    metrics.record_hit();
                    producer.succeed(data);
                }
                Ok(None) => {
                    metrics.record_miss();
                    producer.fail(Some(Error::NotFound));
                }
                Err(e) => {
                    metrics.record_miss();
                    debug!(key = %key, "Backend read failed: {}", e);
                    producer.fail(Some(e));
                }
            }
        });

        request
    }

    fn store(&self, value: Bytes, key: &String) {
        let backend = Arc::clone(&self.backend);
        let metrics = Arc::clone(&self.metrics);
        let name = self.config.name.clone();
        let key = key.clone();

        self.handle.spawn(async move {
            match backend.put(&key, value).await {
                Ok(()) => metrics.record_write(),
                Err(e) => warn!(level = %name, key = %key, "Backend store failed: {}", e),
            }
        });
    }

    fn clear(&self) {
        let backend = Arc::clone(&self.backend);
        let metrics = Arc::clone(&self.metrics);
        let name = self.config.name.clone();

        self.handle.spawn(async move {
            match backend.clear().await {
                Ok(()) => metrics.record_clear(),
                Err(e) => warn!(level = %name, "Backend clear failed: {}", e),
            }
        });
    }

    fn on_memory_pressure(&self) {
        debug!(level = %self.config.name, "Memory pressure ignored by backend level");
    }
}
