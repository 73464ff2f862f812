//! Broker relay over server-sent events
//!
//! GET /relay?channels=a,b - one dedicated broker subscription per request.
//! Each broker message becomes one `data:` block; a `: ping` comment keeps
//! idle intermediaries from closing the stream. Dropping the connection drops
//! the relay stream, which unsubscribes from the broker.

use axum::{
    extract::Query,
    response::sse::{Event, KeepAlive, Sse},
    routing::get,
    Extension, Router,
};
use futures::{Stream, StreamExt};
use serde::Deserialize;
use std::borrow::Cow;
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use agentwatch_core::PubSubBridge;

use crate::server::config::AppConfig;

/// Query for the relay endpoint
#[derive(Debug, Default, Deserialize)]
pub struct RelayQuery {
    /// Comma-separated channel names
    #[serde(default)]
    pub channels: Option<String>,
}

/// Requested channels, or the configured defaults when none are named
pub fn parse_channels(requested: Option<&str>, defaults: &[String]) -> Vec<String> {
    let channels: Vec<String> = requested
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_string)
        .collect();

    if channels.is_empty() {
        defaults.to_vec()
    } else {
        channels
    }
}

/// Payload with every line ending as a bare `\n`
///
/// SSE treats CR, LF and CRLF alike as line ends, and `Event::data` emits one
/// `data:` field per `\n` but rejects `\r`. Clients rejoin the fields with
/// `\n`, so every line of the payload arrives unchanged.
fn sse_lines(payload: &str) -> Cow<'_, str> {
    if payload.contains('\r') {
        Cow::Owned(payload.replace("\r\n", "\n").replace('\r', "\n"))
    } else {
        Cow::Borrowed(payload)
    }
}

/// Open a relay and stream it as server-sent events
pub async fn relay_stream(
    Extension(bridge): Extension<Arc<PubSubBridge>>,
    Extension(config): Extension<Arc<AppConfig>>,
    Query(query): Query<RelayQuery>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let channels = parse_channels(query.channels.as_deref(), &config.bridge.default_channels);
    info!(channels = ?channels, "Relay requested");

    let stream = bridge
        .open(channels)
        .map(|frame| Ok(Event::default().data(sse_lines(&frame.data()))));

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(config.bridge.keepalive_secs))
            .text("ping"),
    )
}

/// Create relay routes
pub fn relay_routes() -> Router {
    Router::new().route("/relay", get(relay_stream))
}
