//! Composable Cache Levels
//!
//! Building blocks for multi-tier caches. Every piece implements
//! [`CacheLevel`], and pipelines are assembled by wrapping one level in
//! another.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────────┐
//! │                        Composed Pipeline                              │
//! ├──────────────────────────────────────────────────────────────────────┤
//! │  MemoryLevel          │ ValueTransformed      │ RequestCapper         │
//! │  ┌────────────────┐   │ ┌─────────────────┐   │ ┌─────────────────┐   │
//! │  │ ShardedMap     │   │ │ Lz4Transformer  │   │ │ FIFO queue      │   │
//! │  │ (sync hit/miss)│   │ │ BackendLevel    │   │ │ origin fetcher  │   │
//! │  └────────────────┘   │ └─────────────────┘   │ └─────────────────┘   │
//! │         ▲             │         ▲             │          │            │
//! │         └── write-back┴─────────┴── write-back┴──────────┘            │
//! └──────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Building blocks
//!
//! - [`CacheRequest`]: resolve-once result with success, failure and
//!   completion observers
//! - [`Composed`]: primary/secondary fallback with write-back
//! - [`ValueTransformed`] and [`KeyTransformed`]: adapt value and key types
//! - [`RequestCapper`]: bound concurrent fetches with a FIFO queue
//! - [`MemoryLevel`] and [`BackendLevel`]: reference storage levels

mod backend;
mod basic;
mod capper;
mod composed;
mod key_transformation;
mod level;
mod memory;
mod metrics;
mod proptest;
mod request;
mod shard;
mod transformer;
mod value_transformation;
pub mod compression;
#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use backend::{BackendLevel, BackendLevelConfig, BackendStats, InMemoryBackend, StorageBackend};
pub use basic::BasicCache;
pub use capper::{cap_requests, CapperConfig, CapperStats, RequestCapper};
pub use composed::{compose, compose_fetchers, Composed};
pub use compression::{CompressionAlgorithm, CompressionConfig, Lz4Transformer};
pub use key_transformation::{transform_keys, KeyTransformed};
pub use level::{CacheLevel, CacheLevelExt, DynCacheLevel};
pub use memory::{MemoryLevel, MemoryLevelConfig};
pub use metrics::{LevelMetrics, LevelStats};
pub use request::CacheRequest;
pub use shard::{Shard, ShardedMap};
pub use transformer::{
    DisplayKeyTransformer, Inverted, JsonTransformer, OneWayTransformationBox, OneWayTransformer,
    TwoWayTransformationBox, TwoWayTransformer, Utf8Transformer,
};
pub use value_transformation::{transform_fetcher_values, transform_values, ValueTransformed};

/// Default number of concurrent fetches admitted by a request capper
pub const DEFAULT_REQUEST_CAP: usize = 8;

/// Default number of shards in a memory level
pub const DEFAULT_SHARD_COUNT: usize = 64;

// =============================================================================
// Tests
// =============================================================================
