//! Client control messages for the push stream
//!
//! Data frames (`initial`, `event`, `clear`) are produced by the hub; these
//! types only cover the small control exchange a viewer may start.

use serde::{Deserialize, Serialize};

/// Message a viewer may send
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Application-level liveness check
    Ping,
}

/// Control reply sent to a viewer
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ControlNotice {
    /// Reply to [`ClientMessage::Ping`]
    Pong,
    /// The viewer sent something unintelligible
    Error { message: String },
}
