use axum::{
    body::Bytes,
    extract::{Path, Query},
    http::StatusCode,
    response::{IntoResponse, Response},
    Extension, Json,
};
use std::sync::Arc;
use tracing::{debug, error, warn};

use agentwatch_core::ConnectionManager;
use agentwatch_store::{EventQuery, EventStore, NewEvent};

use super::super::error_response;
use super::types::{ClearResponse, RecentQuery, SessionQuery};
use crate::server::config::AppConfig;

/// Default page size for event reads
const DEFAULT_RECENT_LIMIT: i64 = 100;

/// Accept one event: validate, persist, then push to live viewers
///
/// The body is parsed by hand so malformed JSON and missing fields both
/// surface as `400` with the same error envelope.
pub async fn ingest_event(
    Extension(store): Extension<Arc<EventStore>>,
    Extension(hub): Extension<Arc<ConnectionManager>>,
    body: Bytes,
) -> Response {
    let event: NewEvent = match serde_json::from_slice(&body) {
        Ok(event) => event,
        Err(e) => {
            debug!(error = %e, "Rejected unparseable event body");
            return error_response(StatusCode::BAD_REQUEST, format!("Invalid event body: {e}"));
        }
    };

    let stored = match store.append(event).await {
        Ok(stored) => stored,
        Err(e) if e.is_validation() => {
            debug!(error = %e, "Rejected invalid event");
            return error_response(StatusCode::BAD_REQUEST, e.to_string());
        }
        Err(e) => {
            error!(error = %e, "Failed to store event");
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to store event: {e}"),
            );
        }
    };

    let delivered = hub.broadcast_event(&stored);
    debug!(event_id = stored.id, delivered, "Event broadcast");

    Json(stored).into_response()
}

/// Most recent events, oldest first
pub async fn recent_events(
    Extension(store): Extension<Arc<EventStore>>,
    Extension(config): Extension<Arc<AppConfig>>,
    Query(query): Query<RecentQuery>,
) -> Response {
    let limit = config
        .aggregator
        .clamp_limit(query.limit, DEFAULT_RECENT_LIMIT);

    let mut filter = EventQuery::new().paginate(limit);
    filter.source_app = query.source_app;
    filter.session_id = query.session_id;
    filter.hook_event_type = query.hook_event_type;

    match store.query(&filter).await {
        Ok(events) => Json(events).into_response(),
        Err(e) => {
            error!(error = %e, "Failed to read recent events");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to read events: {e}"),
            )
        }
    }
}

/// Events of one session, oldest first
pub async fn session_events(
    Extension(store): Extension<Arc<EventStore>>,
    Extension(config): Extension<Arc<AppConfig>>,
    Path(session_id): Path<String>,
    Query(query): Query<SessionQuery>,
) -> Response {
    let limit = config
        .aggregator
        .clamp_limit(query.limit, DEFAULT_RECENT_LIMIT);

    match store.by_session(&session_id, limit).await {
        Ok(events) => Json(events).into_response(),
        Err(e) => {
            error!(session_id = %session_id, error = %e, "Failed to read session events");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to read events: {e}"),
            )
        }
    }
}

/// Distinct apps, sessions and event types
pub async fn filter_options(Extension(store): Extension<Arc<EventStore>>) -> Response {
    match store.filter_options().await {
        Ok(options) => Json(options).into_response(),
        Err(e) => {
            error!(error = %e, "Failed to read filter options");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to read filter options: {e}"),
            )
        }
    }
}

/// Wipe the log, then tell every viewer to reset
pub async fn clear_events(
    Extension(store): Extension<Arc<EventStore>>,
    Extension(hub): Extension<Arc<ConnectionManager>>,
) -> Response {
    match store.clear().await {
        Ok(deleted) => {
            let notified = hub.broadcast_clear();
            warn!(deleted, notified, "Event log cleared");
            Json(ClearResponse {
                success: true,
                deleted,
            })
            .into_response()
        }
        Err(e) => {
            error!(error = %e, "Failed to clear events");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to clear events: {e}"),
            )
        }
    }
}
