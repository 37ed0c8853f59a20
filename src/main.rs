//! Parley Server: presence and one-to-one chat coordination.
//!
//! Main entry point that wires all crates together and starts the server.

use std::future::IntoFuture;
use std::time::Duration;

use tokio::sync::oneshot;
use tracing_subscriber::{EnvFilter, fmt};

use parley_api::{AppState, build_router};
use parley_core::config::AppConfig;
use parley_core::error::AppError;
use parley_realtime::RealtimeEngine;

#[tokio::main]
async fn main() {
    let env = std::env::var("PARLEY_ENV").unwrap_or_else(|_| "development".to_string());

    let config = match AppConfig::load(&env) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    init_logging(&config);
    tracing::info!(env = %env, "Configuration loaded");

    if let Err(e) = run(config).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}

/// Initialize tracing/logging
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .init();
        }
        _ => {
            fmt()
                .pretty()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
    }
}

/// Main server run function
async fn run(config: AppConfig) -> Result<(), AppError> {
    tracing::info!("Starting Parley v{}", env!("CARGO_PKG_VERSION"));

    // ── Step 1: Realtime engine ──────────────────────────────────
    let engine = RealtimeEngine::new(config.realtime.clone());
    tracing::info!(
        grace_period = ?config.realtime.grace_period(),
        request_timeout = ?config.realtime.request_timeout(),
        "Realtime engine started"
    );

    // ── Step 2: HTTP server ──────────────────────────────────────
    let addr = config.server.bind_address();
    let drain_limit = Duration::from_secs(config.server.shutdown_grace_seconds);
    let app = build_router(AppState::new(config, engine.clone()));

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| AppError::internal(format!("Failed to bind {}: {}", addr, e)))?;

    tracing::info!("Parley server listening on {}", addr);

    // ── Step 3: Graceful shutdown ────────────────────────────────
    let (signalled_tx, signalled_rx) = oneshot::channel();
    let shutdown_engine = engine.clone();
    let server = axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            tracing::info!("Shutdown signal received, closing connections");
            let _ = signalled_tx.send(());
            shutdown_engine.shutdown().await;
        })
        .into_future();

    let drain_deadline = async move {
        if signalled_rx.await.is_ok() {
            tokio::time::sleep(drain_limit).await;
        } else {
            std::future::pending::<()>().await;
        }
    };

    tokio::select! {
        result = server => {
            result.map_err(|e| AppError::internal(format!("Server error: {}", e)))?;
        }
        _ = drain_deadline => {
            tracing::warn!(limit = ?drain_limit, "Connections did not drain in time, exiting");
        }
    }

    engine.shutdown().await;
    tracing::info!("Parley server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
