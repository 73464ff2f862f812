//! Push protocol frames

use agentwatch_store::StoredEvent;
use serde::Serialize;
use std::sync::Arc;

use crate::error::{Error, Result};

/// Frame sent to a push connection
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PushFrame<'a> {
    /// Catch-up batch, sent once at connect, oldest first
    Initial {
        /// Recent events
        data: &'a [StoredEvent],
    },
    /// A newly stored event
    Event {
        /// The event
        data: &'a StoredEvent,
    },
    /// The log was cleared; viewers reset their buffers
    Clear,
}

impl PushFrame<'_> {
    /// Serialize to the shared text form handed to every connection
    pub fn encode(&self) -> Result<Arc<str>> {
        serde_json::to_string(self)
            .map(Arc::from)
            .map_err(|e| Error::Serialization(e.to_string()))
    }
}
