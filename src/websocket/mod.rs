//! WebSocket module
//!
//! Provides the live push endpoint:
//! - /stream - catch-up batch, then every newly stored event

pub mod events;

pub use events::stream_handler;

use axum::{routing::get, Router};

/// Create the WebSocket router
pub fn websocket_router() -> Router {
    Router::new().route("/stream", get(stream_handler))
}
