//! Event - ingestion and storage schemas
//!
//! Producers (agent hooks, orchestrators) post loosely-shaped JSON. `NewEvent`
//! accepts anything that parses and leaves field checks to [`NewEvent::validate`],
//! so a missing field is reported as a validation error rather than a parse error.
//! Once stored, an event is immutable and carries a store-assigned `id`.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};

/// Event as posted by a producer, before validation
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewEvent {
    /// Producing application (e.g. "claude-code", "orchestrator")
    #[serde(default)]
    pub source_app: Option<String>,
    /// Producer session identifier
    #[serde(default)]
    pub session_id: Option<String>,
    /// Open-ended event kind (e.g. "SessionStart", "PreToolUse")
    #[serde(default, alias = "event_type")]
    pub hook_event_type: Option<String>,
    /// Opaque event body
    #[serde(default)]
    pub payload: Option<Value>,
    /// Optional chat transcript
    #[serde(default)]
    pub chat: Option<Value>,
    /// Optional human-readable summary
    #[serde(default)]
    pub summary: Option<String>,
    /// Producer timestamp in epoch milliseconds
    #[serde(default)]
    pub timestamp: Option<i64>,
    /// Model that produced the event, when known
    #[serde(default)]
    pub model_name: Option<String>,
}

/// A validated event ready to be inserted
#[derive(Debug, Clone)]
pub(crate) struct ValidatedEvent {
    pub source_app: String,
    pub session_id: String,
    pub hook_event_type: String,
    pub payload: Value,
    pub chat: Option<Value>,
    pub summary: Option<String>,
    pub timestamp: i64,
    pub model_name: Option<String>,
}

fn required(field: &str, value: Option<String>) -> Result<String> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(Error::Validation(format!("missing required field: {field}"))),
    }
}

impl NewEvent {
    /// Create an event with the required fields set
    #[must_use]
    pub fn new(
        source_app: impl Into<String>,
        session_id: impl Into<String>,
        hook_event_type: impl Into<String>,
        payload: Value,
    ) -> Self {
        Self {
            source_app: Some(source_app.into()),
            session_id: Some(session_id.into()),
            hook_event_type: Some(hook_event_type.into()),
            payload: Some(payload),
            ..Default::default()
        }
    }

    /// Set the summary
    #[must_use]
    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }

    /// Set the producer timestamp (epoch ms)
    #[must_use]
    pub fn with_timestamp(mut self, timestamp_ms: i64) -> Self {
        self.timestamp = Some(timestamp_ms);
        self
    }

    /// Set the model name
    #[must_use]
    pub fn with_model(mut self, model_name: impl Into<String>) -> Self {
        self.model_name = Some(model_name.into());
        self
    }

    /// Check required fields and fill in the storage timestamp
    pub(crate) fn validate(self) -> Result<ValidatedEvent> {
        let source_app = required("source_app", self.source_app)?;
        let session_id = required("session_id", self.session_id)?;
        let hook_event_type = required("hook_event_type", self.hook_event_type)?;
        let payload = match self.payload {
            Some(Value::Null) | None => {
                return Err(Error::Validation(
                    "missing required field: payload".to_string(),
                ))
            }
            Some(p) => p,
        };

        Ok(ValidatedEvent {
            source_app,
            session_id,
            hook_event_type,
            payload,
            chat: self.chat.filter(|c| !c.is_null()),
            summary: self.summary.filter(|s| !s.is_empty()),
            timestamp: self
                .timestamp
                .unwrap_or_else(|| Utc::now().timestamp_millis()),
            model_name: self.model_name.filter(|m| !m.is_empty()),
        })
    }
}

/// An event as persisted in the log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredEvent {
    /// Store-assigned, strictly increasing identifier
    pub id: i64,
    /// Producing application
    pub source_app: String,
    /// Producer session identifier
    pub session_id: String,
    /// Event kind
    pub hook_event_type: String,
    /// Opaque event body
    pub payload: Value,
    /// Chat transcript
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chat: Option<Value>,
    /// Summary
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    /// Epoch milliseconds
    pub timestamp: i64,
    /// Model name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_name: Option<String>,
}

/// Distinct values used to populate dashboard filter controls
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterOptions {
    /// Distinct source applications
    pub source_apps: Vec<String>,
    /// Most recently active session ids (at most 100)
    pub session_ids: Vec<String>,
    /// Distinct event kinds
    pub hook_event_types: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_validate_requires_session_id() {
        let event = NewEvent {
            session_id: None,
            ..NewEvent::new("agent", "s1", "SessionStart", json!({}))
        };
        let err = event.validate().unwrap_err();
        assert!(err.is_validation());
        assert!(err.to_string().contains("session_id"));
    }

    #[test]
    fn test_validate_rejects_blank_and_null() {
        let blank = NewEvent::new("  ", "s1", "Stop", json!({}));
        assert!(blank.validate().is_err());

        let null_payload = NewEvent::new("agent", "s1", "Stop", Value::Null);
        let err = null_payload.validate().unwrap_err();
        assert!(err.to_string().contains("payload"));
    }

    #[test]
    fn test_validate_assigns_timestamp() {
        let before = Utc::now().timestamp_millis();
        let validated = NewEvent::new("agent", "s1", "Stop", json!({}))
            .validate()
            .unwrap();
        assert!(validated.timestamp >= before);

        let explicit = NewEvent::new("agent", "s1", "Stop", json!({}))
            .with_timestamp(1_700_000_000_000)
            .validate()
            .unwrap();
        assert_eq!(explicit.timestamp, 1_700_000_000_000);
    }

    #[test]
    fn test_event_type_alias() {
        let event: NewEvent = serde_json::from_str(
            r#"{"source_app":"a","session_id":"s","event_type":"Stop","payload":{}}"#,
        )
        .unwrap();
        assert_eq!(event.hook_event_type.as_deref(), Some("Stop"));
    }

    #[test]
    fn test_stored_event_skips_empty_optionals() {
        let stored = StoredEvent {
            id: 1,
            source_app: "agent".to_string(),
            session_id: "s1".to_string(),
            hook_event_type: "SessionStart".to_string(),
            payload: json!({}),
            chat: None,
            summary: None,
            timestamp: 1,
            model_name: None,
        };
        let json = serde_json::to_string(&stored).unwrap();
        assert!(json.contains("\"hook_event_type\":\"SessionStart\""));
        assert!(!json.contains("summary"));
    }
}
