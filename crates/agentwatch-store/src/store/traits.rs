//! Trait for event storage backends

use crate::error::Result;
use crate::event::{NewEvent, StoredEvent};

/// Trait for event storage backends
///
/// Lets consumers such as the unified log aggregator read the event log
/// without depending on SQLite.
#[async_trait::async_trait]
pub trait EventStoreTrait: Send + Sync {
    /// Validate and append an event, returning it with its assigned id
    async fn append(&self, event: NewEvent) -> Result<StoredEvent>;

    /// Most recent `limit` events, oldest first
    async fn recent(&self, limit: i64) -> Result<Vec<StoredEvent>>;

    /// Most recent `limit` events of one session, oldest first
    async fn by_session(&self, session_id: &str, limit: i64) -> Result<Vec<StoredEvent>>;

    /// Delete every event, returning the number removed
    async fn clear(&self) -> Result<u64>;

    /// Get the event store name (for logging)
    fn name(&self) -> &str;
}
