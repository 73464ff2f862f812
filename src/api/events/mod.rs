//! Ingestion gateway
//!
//! POST /events - Validate, persist and fan out one event
//! GET /events/recent - Most recent events, oldest first
//! GET /events/filter-options - Distinct values for filter controls
//! GET /events/session/:session_id - Events of one session
//! DELETE /events/clear - Wipe the log and reset every viewer

pub mod handlers;
pub mod types;

#[cfg(test)]
mod tests;

pub use handlers::{clear_events, filter_options, ingest_event, recent_events, session_events};
pub use types::{ClearResponse, RecentQuery, SessionQuery};

use axum::{
    routing::{delete, get, post},
    Router,
};

/// Create event routes
pub fn events_routes() -> Router {
    Router::new()
        .route("/events", post(ingest_event))
        .route("/events/recent", get(recent_events))
        .route("/events/filter-options", get(filter_options))
        .route("/events/session/:session_id", get(session_events))
        .route("/events/clear", delete(clear_events))
}
