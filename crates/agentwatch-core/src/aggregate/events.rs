//! Stored events as feed entries

use agentwatch_store::StoredEvent;
use chrono::DateTime;
use serde_json::{json, Value};

use super::decode::str_member;
use super::entry::{LogType, UnifiedLogEntry};

/// Classify a hook event type
pub(crate) fn event_log_type(hook_event_type: &str) -> LogType {
    match hook_event_type {
        "SessionStart" | "SubagentStart" => LogType::Spawn,
        "Stop" | "SubagentStop" | "SessionEnd" => LogType::Complete,
        t if t.contains("Error") || t.contains("Failure") => LogType::Error,
        t if t.contains("Tool") || t == "Notification" => LogType::Output,
        _ => LogType::Status,
    }
}

/// Convert a stored event; `None` when its timestamp is out of range
pub(crate) fn event_entry(event: &StoredEvent) -> Option<UnifiedLogEntry> {
    let timestamp = DateTime::from_timestamp_millis(event.timestamp)?;

    let message = match (&event.summary, str_member(&event.payload, &["tool_name"])) {
        (Some(summary), _) => summary.clone(),
        (None, Some(tool)) => format!("{}: {tool}", event.hook_event_type),
        (None, None) => event.hook_event_type.clone(),
    };

    let mut details = json!({
        "event_id": event.id,
        "hook_event_type": event.hook_event_type,
    });
    if let Some(model) = &event.model_name {
        details["model_name"] = Value::String(model.clone());
    }

    Some(
        UnifiedLogEntry::new(
            timestamp,
            event.source_app.clone(),
            event_log_type(&event.hook_event_type),
            message,
        )
        .with_session(Some(event.session_id.clone()))
        .with_details(details),
    )
}
