//! Capped Cache - workload runner
//!
//! Builds a cache from the environment, drives a concurrent put/get load
//! against it and prints the resulting statistics as JSON.

use anyhow::Context;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use capped_cache::{run_workload, CacheConfig, CappedCache, WorkloadConfig};

/// Main entry point for the workload runner.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load cache and workload configuration from environment variables
/// 3. Create the cache with the configured policy and sizing
/// 4. Run the workload across the configured threads
/// 5. Print statistics as pretty JSON on stdout
fn main() -> anyhow::Result<()> {
    // Initialize tracing subscriber with env filter
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "capped_cache=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    info!("Starting Capped Cache workload");

    let config = CacheConfig::from_env();
    info!(
        "Configuration loaded: capacity={}, policy={:?}, initial_capacity={}, load_factor={}, concurrency_hint={}, grace_period={:?}",
        config.capacity,
        config.policy,
        config.initial_capacity,
        config.load_factor,
        config.concurrency_hint,
        config.grace_period
    );

    let cache = CappedCache::with_config(config).context("invalid cache configuration")?;
    let workload = WorkloadConfig::from_env();

    let report = run_workload(&cache, &workload);
    let json = serde_json::to_string_pretty(&report).context("failed to encode report")?;
    println!("{}", json);

    Ok(())
}
