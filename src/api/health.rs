//! Health check endpoints with component-level diagnostics.
//!
//! Provides:
//! - `/health` — simple "healthy" + version (for load balancers)
//! - `/health/detailed` — per-component status (database, redis, hub)

use axum::extract::Extension;
use axum::response::Json;
use axum::routing::get;
use axum::Router;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;

use agentwatch_core::{ConnectionManager, UnifiedAggregator};
use agentwatch_store::EventStore;

/// Simple health response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

/// Detailed health response with per-component checks
#[derive(Debug, Serialize)]
pub struct DetailedHealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub checks: HealthChecks,
}

/// All component health checks
#[derive(Debug, Serialize)]
pub struct HealthChecks {
    pub database: ComponentHealth,
    pub redis: ComponentHealth,
    pub hub: ComponentHealth,
}

/// Individual component health status
#[derive(Debug, Serialize)]
pub struct ComponentHealth {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ComponentHealth {
    fn healthy(latency_ms: Option<u64>, details: Option<serde_json::Value>) -> Self {
        Self {
            status: "healthy",
            latency_ms,
            error: None,
            details,
        }
    }

    fn unhealthy(error: String) -> Self {
        Self {
            status: "unhealthy",
            latency_ms: None,
            error: Some(error),
            details: None,
        }
    }

    fn is_healthy(&self) -> bool {
        self.status == "healthy"
    }
}

fn elapsed_ms(start: Instant) -> u64 {
    u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX)
}

/// Simple health check
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Detailed health check
pub async fn detailed_health_check(
    Extension(store): Extension<Arc<EventStore>>,
    Extension(aggregator): Extension<Arc<UnifiedAggregator>>,
    Extension(hub): Extension<Arc<ConnectionManager>>,
) -> Json<DetailedHealthResponse> {
    let start = Instant::now();
    let database = match store.count().await {
        Ok(count) => ComponentHealth::healthy(
            Some(elapsed_ms(start)),
            Some(serde_json::json!({ "events": count })),
        ),
        Err(e) => ComponentHealth::unhealthy(e.to_string()),
    };

    let start = Instant::now();
    let keyspace = aggregator.keyspace();
    let redis = match keyspace.ping().await {
        Ok(()) => ComponentHealth::healthy(
            Some(elapsed_ms(start)),
            Some(serde_json::json!({ "backend": keyspace.name() })),
        ),
        Err(e) => ComponentHealth::unhealthy(e.to_string()),
    };

    let hub = if hub.is_accepting() {
        ComponentHealth::healthy(
            None,
            Some(serde_json::json!({ "connections": hub.connection_count() })),
        )
    } else {
        ComponentHealth::unhealthy("shutting down".to_string())
    };

    let all_healthy = database.is_healthy() && redis.is_healthy() && hub.is_healthy();

    Json(DetailedHealthResponse {
        status: if all_healthy { "healthy" } else { "degraded" },
        version: env!("CARGO_PKG_VERSION"),
        checks: HealthChecks {
            database,
            redis,
            hub,
        },
    })
}

/// Create health routes
pub fn health_routes() -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/health/detailed", get(detailed_health_check))
}
