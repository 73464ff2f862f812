//! Push stream WebSocket handler
//!
//! On connect the viewer receives the catch-up batch as one `initial` frame,
//! then is registered with the broadcast hub for live frames.

use axum::{
    extract::ws::{Message, WebSocket, WebSocketUpgrade},
    response::IntoResponse,
    Extension,
};
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use agentwatch_core::ConnectionManager;
use agentwatch_store::EventStore;

use crate::server::config::AppConfig;

mod types;


pub use types::{ClientMessage, ControlNotice};

/// WebSocket upgrade handler
pub async fn stream_handler(
    ws: WebSocketUpgrade,
    Extension(store): Extension<Arc<EventStore>>,
    Extension(hub): Extension<Arc<ConnectionManager>>,
    Extension(config): Extension<Arc<AppConfig>>,
) -> impl IntoResponse {
    let catch_up_limit = config.hub.catch_up_limit;
    ws.on_upgrade(move |socket| handle_socket(socket, store, hub, catch_up_limit))
}

/// Handle WebSocket connection
async fn handle_socket(
    socket: WebSocket,
    store: Arc<EventStore>,
    hub: Arc<ConnectionManager>,
    catch_up_limit: i64,
) {
    let (mut sender, mut receiver) = socket.split();

    let backlog = match store.recent(catch_up_limit).await {
        Ok(events) => events,
        Err(e) => {
            error!(error = %e, "Failed to load catch-up batch");
            let _ = sender.send(Message::Close(None)).await;
            return;
        }
    };

    let mut connection = match hub.add(&backlog) {
        Ok(connection) => connection,
        Err(e) => {
            warn!(error = %e, "Push connection refused");
            let _ = sender.send(Message::Close(None)).await;
            return;
        }
    };
    let connection_id = connection.id;

    loop {
        tokio::select! {
            frame = connection.receiver.recv() => {
                match frame {
                    Some(frame) => {
                        if sender.send(Message::Text(frame.to_string())).await.is_err() {
                            break;
                        }
                    }
                    // Evicted or hub closed
                    None => {
                        let _ = sender.send(Message::Close(None)).await;
                        break;
                    }
                }
            }
            msg = receiver.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        let notice = match serde_json::from_str::<ClientMessage>(&text) {
                            Ok(ClientMessage::Ping) => ControlNotice::Pong,
                            Err(e) => ControlNotice::Error {
                                message: format!("Invalid message format: {e}"),
                            },
                        };
                        if let Ok(json) = serde_json::to_string(&notice) {
                            if sender.send(Message::Text(json)).await.is_err() {
                                break;
                            }
                        }
                    }
                    Some(Ok(Message::Ping(data))) => {
                        let _ = sender.send(Message::Pong(data)).await;
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(e)) => {
                        debug!(connection_id = %connection_id, error = %e, "WebSocket error");
                        break;
                    }
                    _ => {}
                }
            }
        }
    }

    hub.remove(connection_id);
    info!(connection_id = %connection_id, "Push connection ended");
}
