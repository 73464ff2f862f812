//! HTTP API
//!
//! - `events`: ingestion gateway and event log reads
//! - `logs`: unified activity feed
//! - `relay`: server-sent event relay of broker channels
//! - `health`: liveness and component checks

pub mod events;
pub mod health;
pub mod logs;
pub mod relay;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Json, Router};
use serde::Serialize;

pub use events::events_routes;
pub use health::health_routes;
pub use logs::logs_routes;
pub use relay::relay_routes;

/// Error envelope shared by every JSON endpoint
#[derive(Debug, Serialize)]
pub struct ApiResponse {
    pub success: bool,
    pub error: String,
}

impl ApiResponse {
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            error: message.into(),
        }
    }
}

/// `{success:false, error}` with the given status
pub(crate) fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(ApiResponse::error(message))).into_response()
}

/// Create the API router with all endpoints
pub fn api_router() -> Router {
    Router::new()
        .merge(events_routes())
        .merge(logs_routes())
        .merge(relay_routes())
}
