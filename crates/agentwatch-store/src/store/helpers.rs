//! Helper functions for store module

use crate::error::Error;
use crate::event::StoredEvent;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

/// Columns selected for every event query, in table order
pub(crate) const EVENT_COLUMNS: &str = "id, source_app, session_id, hook_event_type, \
     payload, chat, summary, timestamp, model_name";

/// Convert a SQLite row to a StoredEvent
pub(crate) fn row_to_event(row: SqliteRow) -> Result<StoredEvent, Error> {
    let payload_str: String = row.get("payload");
    let chat_str: Option<String> = row.get("chat");

    let payload: serde_json::Value = serde_json::from_str(&payload_str)
        .map_err(|e| Error::Serialization(format!("invalid payload json: {e}")))?;
    let chat = chat_str
        .map(|s| {
            serde_json::from_str(&s)
                .map_err(|e| Error::Serialization(format!("invalid chat json: {e}")))
        })
        .transpose()?;

    Ok(StoredEvent {
        id: row.get("id"),
        source_app: row.get("source_app"),
        session_id: row.get("session_id"),
        hook_event_type: row.get("hook_event_type"),
        payload,
        chat,
        summary: row.get("summary"),
        timestamp: row.get("timestamp"),
        model_name: row.get("model_name"),
    })
}

/// Get the default data directory for agentwatch
pub fn default_data_dir() -> std::path::PathBuf {
    dirs::home_dir()
        .map(|p| p.join(".agentwatch"))
        .unwrap_or_else(|| std::path::PathBuf::from(".agentwatch"))
}

/// Get the default database path
pub fn default_db_path() -> std::path::PathBuf {
    default_data_dir().join("events.db")
}
