//! Offline Core server
//!
//! Runs the offline data layer behind its diagnostics API.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio::signal;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use offline_core::clock::system_clock;
use offline_core::durable::{LmdbEngine, MemoryEngine, StorageEngine};
use offline_core::network::NetworkMonitor;
use offline_core::sync::SimulatedReplayer;
use offline_core::{create_router, spawn_cleanup_task, spawn_sync_worker, AppState, Config};

/// Main entry point for the offline core server.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Open the LMDB store, falling back to memory if it cannot open
/// 4. Restore pending sync items from the previous run
/// 5. Start the durable cleanup task and the sync worker
/// 6. Serve the diagnostics API until SIGINT/SIGTERM
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "offline_core=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting offline core server");

    let config = Config::from_env();
    info!(
        max_entries = config.max_entries,
        default_ttl_ms = config.default_ttl_ms,
        data_dir = %config.data_dir.display(),
        port = config.server_port,
        cleanup_interval = config.cleanup_interval,
        "Configuration loaded"
    );

    let engine = open_engine(&config)?;
    let network = Arc::new(NetworkMonitor::default());
    let (state, events) = AppState::build(
        &config,
        engine,
        Arc::new(SimulatedReplayer::default()),
        network,
        system_clock(),
    )
    .await
    .context("failed to open durable store")?;

    state.sync.restore().await;

    let cleanup_handle = spawn_cleanup_task(state.store.clone(), config.cleanup_period());
    let sync_handle = spawn_sync_worker(state.sync.clone(), events);
    info!("Background tasks started");

    let app = create_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(vec![cleanup_handle, sync_handle]))
        .await
        .context("server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Opens LMDB under the configured directory. A store that cannot be opened
/// degrades to an in-memory engine so the server still starts.
fn open_engine(config: &Config) -> anyhow::Result<Arc<dyn StorageEngine>> {
    std::fs::create_dir_all(&config.data_dir)
        .with_context(|| format!("failed to create {}", config.data_dir.display()))?;

    let engine: Arc<dyn StorageEngine> =
        match LmdbEngine::open(&config.data_dir, config.store_map_size_mb) {
            Ok(engine) => {
                info!(path = %engine.path().display(), "LMDB store opened");
                Arc::new(engine)
            }
            Err(e) => {
                warn!(error = %e, "LMDB unavailable, data will not survive a restart");
                Arc::new(MemoryEngine::new())
            }
        };
    Ok(engine)
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM), then aborts the
/// background tasks.
async fn shutdown_signal(tasks: Vec<JoinHandle<()>>) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
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

    for task in &tasks {
        task.abort();
    }
    warn!(tasks = tasks.len(), "Background tasks aborted");
}
