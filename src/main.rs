//! Application entry point and server initialization
//!
//! Loads configuration, opens the document store and serves the router
//! until SIGINT/SIGTERM.

use std::sync::Arc;

use dotenvy::dotenv;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::trace::TraceLayer;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use listings::config::{Config, DEFAULT_LOG_FILTER};
use listings::database::{AppState, RedbStore};
use listings::route::create_app;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if it exists
    dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .init();

    let config = Config::from_env();

    let store = match RedbStore::open(&config.database_path) {
        Ok(store) => store,
        Err(err) => {
            error!(error = %err, path = %config.database_path, "failed to open database");
            return Err(err.into());
        }
    };

    let mut state = AppState::new(Arc::new(store));
    if let Some(token) = &config.auth_token {
        state = state.with_auth_token(token.clone());
    }

    let app = create_app(state).layer(TraceLayer::new_for_http());

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = TcpListener::bind(&addr).await?;

    info!(port = config.port, database = %config.database_path, "server listening");
    if config.auth_token.is_none() {
        info!("AUTHORIZATION not set, dashboard token check disabled");
    }

    // Open connections are allowed to complete before the process exits
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// Resolves on Ctrl+C (SIGINT) or, on Unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            error!(error = %err, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                error!(error = %err, "failed to install SIGTERM handler");
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

    info!("shutdown signal received, stopping server");
}
