//! TTL Map - standalone process
//!
//! Hosts a single map built from environment configuration, restores it from
//! a snapshot file when one exists and writes it back on shutdown.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use serde_json::Value;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ttl_map::{CacheConfig, TtlMap};

/// Interval between entry count reports
const REPORT_INTERVAL: Duration = Duration::from_secs(30);

/// Main entry point.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Create the map, restoring `TTL_MAP_SNAPSHOT` if present
/// 4. Report entry counts until SIGINT/SIGTERM
/// 5. Stop the sweeper and write the snapshot back
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ttl_map=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = CacheConfig::from_env();
    let snapshot_path = std::env::var_os("TTL_MAP_SNAPSHOT").map(PathBuf::from);
    info!(
        "Configuration loaded: initial_capacity={}, ttl={}s, snapshot={:?}",
        config.initial_capacity, config.ttl_seconds, snapshot_path
    );

    let map: TtlMap<Value> = TtlMap::from_config(&config);
    if let Some(path) = snapshot_path.as_ref().filter(|path| path.exists()) {
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("reading snapshot {}", path.display()))?;
        map.decode(&bytes)
            .with_context(|| format!("restoring snapshot {}", path.display()))?;
    }

    let mut report = tokio::time::interval(REPORT_INTERVAL);
    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);
    loop {
        tokio::select! {
            _ = report.tick() => {
                let stats = map.stats();
                info!(
                    "entries={} hit_rate={:.2} sweeps={} expirations={} per_sweep={:.1}",
                    stats.total_entries,
                    stats.hit_rate(),
                    stats.sweeps,
                    stats.expirations,
                    stats.expirations_per_sweep()
                );
            }
            _ = &mut shutdown => break,
        }
    }

    map.stop();
    if let Some(path) = snapshot_path {
        let bytes = map.encode()?;
        tokio::fs::write(&path, bytes)
            .await
            .with_context(|| format!("writing snapshot {}", path.display()))?;
        info!("Snapshot written to {}", path.display());
    }

    info!("Shutdown complete");
    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", err);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                warn!("Failed to install SIGTERM handler: {}", err);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }
}
