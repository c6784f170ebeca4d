//! Tierstack - Composable Tiered Cache Levels
//!
//! Builds multi-tier caches out of small, interchangeable levels. A fast
//! level is composed with a slower one so that misses fall through and hits
//! from the slower tier are written back into the faster one.
//!
//! # Architecture
//!
//! ```text
//! fetch ──▶ Memory ──miss──▶ LZ4 ▸ Backend ──miss──▶ Capped Origin
//!             ▲                   │                     │
//!             └──── write-back ───┴──── write-back ─────┘
//! ```
//!
//! # Modules
//!
//! - [`cache`] - Cache levels, requests, composition and transformers
//! - [`error`] - Error types

pub mod cache;
pub mod error;

// Re-export commonly used types
pub use cache::{
    BackendLevel, BasicCache, CacheLevel, CacheLevelExt, CacheRequest, Composed, MemoryLevel,
    RequestCapper,
};
pub use error::{Error, ErrorKind, Result};
