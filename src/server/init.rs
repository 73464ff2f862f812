//! Server initialization
//!
//! Contains the main `run()` function that starts all server components.

use super::config::AppConfig;
use super::init_stores::{init_stores, ServiceBundle};
use super::validation::validate_config;
use agentwatch_core::{shutdown_signal_with_controller, ShutdownController};
use anyhow::{Context, Result};
use axum::{routing::get, Extension, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Build the application router around a service bundle
pub fn build_router(services: &ServiceBundle, config: Arc<AppConfig>) -> Router {
    Router::new()
        .merge(crate::api::health_routes())
        .merge(crate::api::api_router())
        .merge(crate::websocket::websocket_router())
        .route("/", get(|| async { "Agentwatch" }))
        .layer(Extension(services.event_store.clone()))
        .layer(Extension(services.hub.clone()))
        .layer(Extension(services.bridge.clone()))
        .layer(Extension(services.aggregator.clone()))
        .layer(Extension(config))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Run the server
pub async fn run(config: AppConfig) -> Result<()> {
    info!(
        "Starting Agentwatch v{}",
        env!("CARGO_PKG_VERSION")
    );

    validate_config(&config)?;

    let data_dir = config
        .data_dir
        .clone()
        .map(std::path::PathBuf::from)
        .unwrap_or_else(agentwatch_store::default_data_dir);
    info!("Data directory: {}", data_dir.display());

    let shutdown_controller = ShutdownController::new();
    let services = init_stores(&config, &data_dir, shutdown_controller.token()).await?;

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid server address")?;

    let config = Arc::new(config);
    let app = build_router(&services, config);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;
    info!("HTTP server listening on http://{}", addr);

    // Relays end through the controller's token; push sockets are closed by
    // the hub before the server waits for in-flight requests.
    let hub = services.hub.clone();
    let signal = shutdown_signal_with_controller(shutdown_controller.clone());
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            signal.await;
            hub.close_all();
        })
        .await
        .context("HTTP server error")?;

    services.hub.close_all();
    services.event_store.close().await;
    shutdown_controller.complete();

    info!("Agentwatch shutdown complete");
    Ok(())
}
