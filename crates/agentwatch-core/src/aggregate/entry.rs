//! Unified log entry

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Kind of a unified log entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogType {
    /// A task or agent started
    Spawn,
    /// Intermediate output
    Output,
    /// Finished successfully
    Complete,
    /// Finished with a failure
    Error,
    /// Anything else worth showing
    Status,
}

impl LogType {
    /// Parse a producer-supplied type name
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "spawn" => Some(Self::Spawn),
            "output" => Some(Self::Output),
            "complete" => Some(Self::Complete),
            "error" => Some(Self::Error),
            "status" => Some(Self::Status),
            _ => None,
        }
    }

    /// Wire name
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Spawn => "spawn",
            Self::Output => "output",
            Self::Complete => "complete",
            Self::Error => "error",
            Self::Status => "status",
        }
    }
}

impl std::fmt::Display for LogType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One line of the unified activity feed; derived on every request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnifiedLogEntry {
    /// When it happened
    pub timestamp: DateTime<Utc>,
    /// Agent role or producing application
    pub agent: String,
    /// Entry kind
    #[serde(rename = "type")]
    pub log_type: LogType,
    /// Display text
    pub message: String,
    /// Related task
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
    /// Related session
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    /// Family-specific extras
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl UnifiedLogEntry {
    /// Create an entry without task, session or details
    pub fn new(
        timestamp: DateTime<Utc>,
        agent: impl Into<String>,
        log_type: LogType,
        message: impl Into<String>,
    ) -> Self {
        Self {
            timestamp,
            agent: agent.into(),
            log_type,
            message: message.into(),
            task_id: None,
            session_id: None,
            details: None,
        }
    }

    /// Attach a task id
    #[must_use]
    pub fn with_task(mut self, task_id: Option<String>) -> Self {
        self.task_id = task_id;
        self
    }

    /// Attach a session id
    #[must_use]
    pub fn with_session(mut self, session_id: Option<String>) -> Self {
        self.session_id = session_id;
        self
    }

    /// Attach details; empty objects are dropped
    #[must_use]
    pub fn with_details(mut self, details: Value) -> Self {
        self.details = match details {
            Value::Null => None,
            Value::Object(ref map) if map.is_empty() => None,
            other => Some(other),
        };
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_entry_serialization() {
        let ts = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let entry = UnifiedLogEntry::new(ts, "IM", LogType::Spawn, "Started")
            .with_task(Some("t1".to_string()))
            .with_details(json!({}));

        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(value["type"], "spawn");
        assert_eq!(value["task_id"], "t1");
        assert_eq!(value["timestamp"], "2023-11-14T22:13:20Z");
        assert!(value.get("session_id").is_none());
        assert!(value.get("details").is_none());
    }

    #[test]
    fn test_log_type_parse() {
        assert_eq!(LogType::parse("Complete"), Some(LogType::Complete));
        assert_eq!(LogType::parse("progress"), None);
    }
}
