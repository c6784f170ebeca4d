//! Tierstack Demo
//!
//! Assembles a three-tier pipeline and drives concurrent fetches through it.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        Tiered Pipeline                          │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  ┌──────────────┐    ┌──────────────┐    ┌──────────────┐       │
//! │  │    Memory    │───▶│ LZ4 Backend  │───▶│    Origin    │       │
//! │  │   (sharded)  │    │   (async)    │    │   (capped)   │       │
//! │  └──────────────┘    └──────────────┘    └──────────────┘       │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use clap::Parser;
use futures::future::join_all;
use tracing::{info, warn, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use tierstack::cache::{
    BackendLevel, BackendLevelConfig, BasicCache, CacheLevel, CacheLevelExt, CacheRequest,
    CapperConfig, InMemoryBackend, Lz4Transformer, MemoryLevel, MemoryLevelConfig, RequestCapper,
};
use tierstack::error::Result;

// =============================================================================
// CLI Arguments
// =============================================================================

/// Tierstack - tiered cache pipeline demo
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Maximum concurrent fetches against the origin
    #[arg(long, env = "REQUEST_CAP", default_value = "4")]
    request_cap: usize,

    /// Number of fetches per round
    #[arg(long, env = "REQUESTS", default_value = "64")]
    requests: usize,

    /// Number of distinct keys fetched
    #[arg(long, env = "DISTINCT_KEYS", default_value = "16")]
    distinct_keys: usize,

    /// Simulated origin latency in milliseconds
    #[arg(long, env = "LATENCY_MS", default_value = "20")]
    latency_ms: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Output logs as JSON
    #[arg(long, env = "LOG_JSON")]
    log_json: bool,
}

// =============================================================================
// Main
// =============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    init_logging(&args);

    info!("Starting tierstack demo");
    info!("  Request cap: {}", args.request_cap);
    info!("  Requests per round: {}", args.requests);
    info!("  Distinct keys: {}", args.distinct_keys);
    info!("  Origin latency: {} ms", args.latency_ms);

    let capper_config = CapperConfig::new(args.request_cap).with_name("origin");
    capper_config.validate()?;

    // Tier 1: in-process memory
    let memory = Arc::new(MemoryLevel::<String, Bytes>::with_config(
        MemoryLevelConfig::default().with_name("memory"),
    ));

    // Tier 2: compressed async backend
    let backend = Arc::new(BackendLevel::with_handle(
        InMemoryBackend::with_latency(Duration::from_millis(1)),
        tokio::runtime::Handle::current(),
        BackendLevelConfig::default().with_name("backend"),
    ));

    // Tier 3: slow origin, capped
    let origin_fetches = Arc::new(AtomicUsize::new(0));
    let origin = RequestCapper::with_config(
        slow_origin(Duration::from_millis(args.latency_ms), Arc::clone(&origin_fetches)),
        capper_config,
    );

    let pipeline = Arc::clone(&memory)
        .compose(Arc::clone(&backend).transform_values(Lz4Transformer::new()))
        .compose(origin);

    let keys: Vec<String> = (0..args.requests)
        .map(|i| format!("object-{}", i % args.distinct_keys.max(1)))
        .collect();

    for round in 1..=2 {
        let start = Instant::now();
        let outcomes = join_all(keys.iter().map(|key| pipeline.fetch(key).outcome())).await;
        let failures = outcomes.iter().filter(|o| o.is_err()).count();

        info!(
            round,
            elapsed_ms = start.elapsed().as_millis() as u64,
            failures,
            origin_fetches = origin_fetches.load(Ordering::Relaxed),
            "Round complete"
        );
    }

    // Simulate memory pressure, then read through the backend tier
    pipeline.on_memory_pressure();
    info!("Memory tier after pressure: {} entries", memory.len());

    // Give write-backs to the backend tier time to land
    tokio::time::sleep(Duration::from_millis(20)).await;
    let outcomes = join_all(keys.iter().map(|key| pipeline.fetch(key).outcome())).await;
    if outcomes.iter().any(|o| o.is_err()) {
        warn!("Some fetches failed after memory pressure");
    }

    info!("{}", memory.stats());
    info!("{}", backend.stats());
    info!(
        "origin: {} fetches ({} had to wait for a slot)",
        origin_fetches.load(Ordering::Relaxed),
        pipeline.secondary().stats().enqueued
    );

    Ok(())
}

/// Origin that answers every key after `latency`
fn slow_origin(latency: Duration, fetches: Arc<AtomicUsize>) -> BasicCache<String, Bytes> {
    BasicCache::fetcher(move |key: &String| {
        fetches.fetch_add(1, Ordering::Relaxed);

        let request = CacheRequest::new();
        let producer = request.clone();
        let payload = Bytes::from(format!("payload for {}; ", key).repeat(128));

        tokio::spawn(async move {
            tokio::time::sleep(latency).await;
            producer.succeed(payload);
        });
        request
    })
}

// =============================================================================
// Logging
// =============================================================================

fn init_logging(args: &Args) {
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    if args.log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true))
            .init();
    }
}
