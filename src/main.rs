//! Delivery Cache - admin service and background maintenance
//!
//! Connects the backing store, starts the maintenance loops and serves the
//! admin API until SIGINT/SIGTERM.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use delivery_cache::api::create_router;
use delivery_cache::backend::{MemoryBackend, RedisBackend, SharedBackend};
use delivery_cache::tasks::{ComputedWarmer, LogSink, SharedSink, SharedWarmer};
use delivery_cache::{
    AppState, CacheAdmin, CacheClient, Config, MaintenanceScheduler, Namespace, Telemetry,
};

/// Main entry point for the cache service.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Connect the backing store, or run without one if unreachable
/// 4. Start the maintenance scheduler
/// 5. Serve the admin API on the configured port
/// 6. On SIGINT/SIGTERM, stop the scheduler and drain the server
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "delivery_cache=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Delivery Cache");

    let config = Config::from_env();
    info!(
        "Configuration loaded: environment={}, prefix={}, port={}",
        config.environment, config.cache_prefix, config.server_port
    );

    let client = connect(&config).await;
    let telemetry = Telemetry::new(client.clone());

    // Keeps the latest health snapshot readable by other services
    let health_telemetry = telemetry.clone();
    let warmers: Vec<SharedWarmer> = vec![Arc::new(ComputedWarmer::new(
        "system-health",
        Namespace::SystemHealth,
        "snapshot",
        move || {
            let telemetry = health_telemetry.clone();
            async move { telemetry.health_check().await.map_err(anyhow::Error::from) }
        },
    ))];
    let sinks: Vec<SharedSink> = vec![Arc::new(LogSink)];

    let scheduler = Arc::new(MaintenanceScheduler::new(
        client.clone(),
        telemetry.clone(),
        warmers.clone(),
        sinks,
        config.schedule(),
    ));
    scheduler.start().await;

    let app = create_router(AppState::new(CacheAdmin::new(client, telemetry, warmers)));

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(scheduler))
        .await
        .context("server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Builds the cache client. An unreachable store leaves the client
/// disconnected so requests fall back to computing directly.
async fn connect(config: &Config) -> CacheClient {
    if config.uses_memory_backend() {
        info!("Using in-process memory backend");
        let backend: SharedBackend = Arc::new(MemoryBackend::new());
        return CacheClient::new(backend, config.policy());
    }

    match RedisBackend::connect(&config.redis()).await {
        Ok(redis) => {
            let backend: SharedBackend = Arc::new(redis);
            CacheClient::new(backend, config.policy())
        }
        Err(e) => {
            warn!("Cache backend unavailable, continuing without cache: {}", e);
            CacheClient::disconnected(config.policy())
        }
    }
}

/// Waits for Ctrl+C or SIGTERM, then stops the maintenance loops.
async fn shutdown_signal(scheduler: Arc<MaintenanceScheduler>) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
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
                warn!("Failed to install SIGTERM handler: {}", e);
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

    scheduler.stop().await;
}
