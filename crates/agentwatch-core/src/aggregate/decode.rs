//! Tolerant decoding helpers
//!
//! Decoders never fail a request. A record that cannot be used becomes
//! [`Decoded::Skip`] and a counter in [`AggregateDiagnostics`] records it.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;

/// Epoch values above this are milliseconds, below it seconds
const EPOCH_MS_THRESHOLD: f64 = 100_000_000_000.0;

/// Outcome of decoding one record
#[derive(Debug)]
pub enum Decoded<T> {
    /// Usable record
    Ok(T),
    /// Record excluded from the feed
    Skip(String),
}

/// Counters for everything aggregation had to leave out
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AggregateDiagnostics {
    /// Whole records excluded (bad identifier, unreadable, no timestamps)
    pub skipped_records: u64,
    /// Individual list items excluded
    pub skipped_entries: u64,
    /// Secondary fields dropped because their JSON was malformed
    pub dropped_fields: u64,
    /// Keys skipped because their storage kind did not match the family
    pub type_mismatches: u64,
}

impl AggregateDiagnostics {
    /// Whether anything was left out
    #[must_use]
    pub fn is_clean(&self) -> bool {
        *self == Self::default()
    }
}

/// How strictly a secondary field must be JSON
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum JsonField {
    /// Must be JSON; anything else is dropped
    Strict,
    /// JSON when it looks like JSON, plain text otherwise
    Lenient,
}

/// Parse a producer timestamp
///
/// Accepts RFC 3339, naive ISO-8601 (read as UTC) and epoch seconds or
/// milliseconds.
pub(crate) fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc());
        }
    }
    raw.parse::<f64>().ok().and_then(from_epoch)
}

/// Timestamp carried in a JSON value (string or number)
pub(crate) fn timestamp_from_json(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => parse_timestamp(s),
        Value::Number(n) => n.as_f64().and_then(from_epoch),
        _ => None,
    }
}

fn from_epoch(value: f64) -> Option<DateTime<Utc>> {
    if !value.is_finite() || value < 0.0 {
        return None;
    }
    let millis = if value >= EPOCH_MS_THRESHOLD {
        value
    } else {
        value * 1000.0
    };
    DateTime::from_timestamp_millis(millis as i64)
}

/// Read a non-blank string field
pub(crate) fn text_field(fields: &HashMap<String, String>, name: &str) -> Option<String> {
    fields
        .get(name)
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Read a timestamp field
pub(crate) fn time_field(fields: &HashMap<String, String>, name: &str) -> Option<DateTime<Utc>> {
    fields.get(name).and_then(|v| parse_timestamp(v))
}

/// Decode a secondary JSON field, dropping it when malformed
///
/// `null` and blank values are treated as absent and are not counted.
pub(crate) fn json_field(
    fields: &HashMap<String, String>,
    name: &str,
    mode: JsonField,
    diagnostics: &mut AggregateDiagnostics,
) -> Option<Value> {
    let raw = fields.get(name)?.trim();
    if raw.is_empty() || raw == "null" {
        return None;
    }

    let looks_like_json = raw.starts_with('{') || raw.starts_with('[');
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Null) => None,
        Ok(value) if mode == JsonField::Strict || looks_like_json => Some(value),
        Ok(_) | Err(_) if mode == JsonField::Lenient && !looks_like_json => {
            Some(Value::String(raw.to_string()))
        }
        _ => {
            diagnostics.dropped_fields += 1;
            tracing::debug!(field = name, "Dropped malformed JSON field");
            None
        }
    }
}

/// String member of a JSON object
pub(crate) fn str_member<'a>(value: &'a Value, names: &[&str]) -> Option<&'a str> {
    names
        .iter()
        .find_map(|name| value.get(name).and_then(Value::as_str))
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    fn fields(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_parse_timestamp_formats() {
        let rfc = parse_timestamp("2024-03-01T10:00:00+02:00").unwrap();
        assert_eq!(rfc.hour(), 8);

        let naive = parse_timestamp("2024-03-01T10:00:00.123456").unwrap();
        assert_eq!(naive.hour(), 10);
        assert_eq!(naive.day(), 1);

        let spaced = parse_timestamp("2024-03-01 10:00:00").unwrap();
        assert_eq!(spaced, parse_timestamp("2024-03-01T10:00:00Z").unwrap());

        let millis = parse_timestamp("1700000000000").unwrap();
        let seconds = parse_timestamp("1700000000").unwrap();
        assert_eq!(millis, seconds);
        assert_eq!(parse_timestamp("1700000000.5").unwrap().timestamp_millis(), 1_700_000_000_500);

        assert!(parse_timestamp("").is_none());
        assert!(parse_timestamp("yesterday").is_none());
        assert!(parse_timestamp("-5").is_none());
    }

    #[test]
    fn test_timestamp_from_json() {
        assert!(timestamp_from_json(&serde_json::json!(1_700_000_000_000_i64)).is_some());
        assert!(timestamp_from_json(&serde_json::json!("2024-01-01T00:00:00")).is_some());
        assert!(timestamp_from_json(&serde_json::json!(true)).is_none());
    }

    #[test]
    fn test_strict_json_field() {
        let mut diag = AggregateDiagnostics::default();
        let f = fields(&[("plan", r#"{"steps":[1]}"#), ("bad", "{not json"), ("text", "hello")]);

        assert!(json_field(&f, "plan", JsonField::Strict, &mut diag).is_some());
        assert!(json_field(&f, "bad", JsonField::Strict, &mut diag).is_none());
        assert!(json_field(&f, "text", JsonField::Strict, &mut diag).is_none());
        assert!(json_field(&f, "missing", JsonField::Strict, &mut diag).is_none());
        assert_eq!(diag.dropped_fields, 2);
    }

    #[test]
    fn test_lenient_json_field() {
        let mut diag = AggregateDiagnostics::default();
        let f = fields(&[
            ("result", "plain output\nline two"),
            ("error", r#"{"message":"boom"}"#),
            ("broken", "[1, 2"),
            ("empty", "null"),
        ]);

        assert_eq!(
            json_field(&f, "result", JsonField::Lenient, &mut diag),
            Some(Value::String("plain output\nline two".to_string()))
        );
        assert_eq!(
            json_field(&f, "error", JsonField::Lenient, &mut diag).unwrap()["message"],
            "boom"
        );
        assert!(json_field(&f, "broken", JsonField::Lenient, &mut diag).is_none());
        assert!(json_field(&f, "empty", JsonField::Lenient, &mut diag).is_none());
        assert_eq!(diag.dropped_fields, 1);
    }
}
