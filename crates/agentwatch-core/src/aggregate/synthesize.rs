//! Decode and synthesize steps for every record family

use chrono::{DateTime, Utc};
use serde_json::{json, Map, Value};

use super::decode::{
    json_field, str_member, text_field, time_field, timestamp_from_json, AggregateDiagnostics,
    Decoded, JsonField,
};
use super::entry::{LogType, UnifiedLogEntry};
use super::family::{RawRecord, Record, RecordContext, RecordFamily, SynthesisOptions};

/// Latest snapshot of a task hash
///
/// Producers overwrite the hash in place, so only the current status is
/// known; there is no history of earlier transitions.
#[derive(Debug, Clone)]
pub struct TaskRecord {
    /// Source family
    pub family: RecordFamily,
    /// Task id
    pub id: String,
    /// Agent role
    pub agent: String,
    /// Current status, as written by the producer
    pub status: Option<String>,
    /// Creation time
    pub created_at: Option<DateTime<Utc>>,
    /// Last update time
    pub updated_at: Option<DateTime<Utc>>,
    /// What the task was asked to do
    pub description: Option<String>,
    /// Related session
    pub session_id: Option<String>,
    /// Result; text output or structured JSON
    pub result: Option<Value>,
    /// Error; text or structured JSON
    pub error: Option<Value>,
    /// Short outcome summary
    pub summary: Option<String>,
    /// Accumulated output text from the sidecar
    pub output: Option<String>,
    /// When the sidecar output was last written
    pub output_updated_at: Option<DateTime<Utc>>,
    /// Remaining decoded fields (plan, stage, duration, ...)
    pub extra: Map<String, Value>,
}

impl TaskRecord {
    fn started_at(&self) -> Option<DateTime<Utc>> {
        self.created_at.or(self.updated_at)
    }

    fn last_seen_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at.or(self.created_at)
    }
}

/// Terminal classification of a status string
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StatusClass {
    Complete,
    Failed,
    Open,
}

fn classify(status: Option<&str>) -> StatusClass {
    let Some(status) = status else {
        return StatusClass::Open;
    };
    match status.trim().to_ascii_lowercase().as_str() {
        "completed" | "complete" | "success" | "succeeded" | "done" => StatusClass::Complete,
        "failed" | "failure" | "error" | "cancelled" | "canceled" | "timeout" | "timed_out" => {
            StatusClass::Failed
        }
        _ => StatusClass::Open,
    }
}

/// Last `lines` non-blank lines of `text`
pub(crate) fn preview(text: &str, lines: usize) -> Option<String> {
    let kept: Vec<&str> = text
        .lines()
        .map(str::trim_end)
        .filter(|line| !line.trim().is_empty())
        .collect();
    if kept.is_empty() || lines == 0 {
        return None;
    }
    Some(kept[kept.len().saturating_sub(lines)..].join("\n"))
}

// =========================================================================
// Task hashes
// =========================================================================

/// Decode a task hash and its optional output sidecar
pub(crate) fn decode_task(
    ctx: &RecordContext,
    raw: RawRecord,
    diagnostics: &mut AggregateDiagnostics,
) -> Decoded<Record> {
    let RawRecord::Hash { fields, sidecar } = raw else {
        return Decoded::Skip("task family expects a hash".to_string());
    };

    let created_at = time_field(&fields, "created_at");
    let updated_at = time_field(&fields, "updated_at");
    if created_at.is_none() && updated_at.is_none() {
        return Decoded::Skip(format!("task {} has no usable timestamps", ctx.id));
    }

    let mut extra = Map::new();
    for (name, mode) in [
        ("plan", JsonField::Strict),
        ("execution_result", JsonField::Strict),
        ("current_stage", JsonField::Lenient),
        ("context", JsonField::Strict),
    ] {
        if let Some(value) = json_field(&fields, name, mode, diagnostics) {
            extra.insert(name.to_string(), value);
        }
    }
    if let Some(duration) = text_field(&fields, "duration") {
        let value = duration
            .parse::<f64>()
            .ok()
            .and_then(|d| serde_json::Number::from_f64(d).map(Value::Number))
            .unwrap_or(Value::String(duration));
        extra.insert("duration".to_string(), value);
    }

    let (output, output_updated_at) = match sidecar {
        Some(sidecar) => (
            text_field(&sidecar, "stdout"),
            time_field(&sidecar, "last_update"),
        ),
        None => (None, None),
    };

    Decoded::Ok(Record::Task(TaskRecord {
        family: ctx.family,
        id: ctx.id.clone(),
        agent: text_field(&fields, "agent")
            .or_else(|| text_field(&fields, "role"))
            .unwrap_or_else(|| ctx.default_agent.clone()),
        status: text_field(&fields, "status"),
        created_at,
        updated_at,
        description: ["description", "task", "goal"]
            .iter()
            .find_map(|name| text_field(&fields, name)),
        session_id: text_field(&fields, "session_id"),
        result: json_field(&fields, "result", JsonField::Lenient, diagnostics),
        error: json_field(&fields, "error", JsonField::Lenient, diagnostics),
        summary: text_field(&fields, "summary"),
        output,
        output_updated_at,
        extra,
    }))
}

fn error_message(error: Option<&Value>) -> Option<String> {
    match error? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::String(_) => None,
        value @ Value::Object(_) => str_member(value, &["message", "error"])
            .map(str::to_string)
            .or_else(|| Some(value.to_string())),
        value => Some(value.to_string()),
    }
}

/// One spawn entry, zero or more output previews, one closing entry
pub(crate) fn synthesize_task(record: Record, options: &SynthesisOptions) -> Vec<UnifiedLogEntry> {
    let Record::Task(task) = record else {
        return Vec::new();
    };
    let (Some(started_at), Some(last_seen_at)) = (task.started_at(), task.last_seen_at()) else {
        return Vec::new();
    };

    let entry = |timestamp, log_type, message: String| {
        UnifiedLogEntry::new(timestamp, task.agent.clone(), log_type, message)
            .with_task(Some(task.id.clone()))
            .with_session(task.session_id.clone())
    };

    let mut entries = Vec::with_capacity(4);

    let spawn_message = match &task.description {
        Some(description) => format!("Started task: {description}"),
        None => format!("Started task {}", task.id),
    };
    let mut spawn_details = json!({ "family": task.family });
    if let Some(plan) = task.extra.get("plan") {
        spawn_details["plan"] = plan.clone();
    }
    entries.push(entry(started_at, LogType::Spawn, spawn_message).with_details(spawn_details));

    let stdout_preview = task
        .output
        .as_deref()
        .and_then(|text| preview(text, options.output_preview_lines));
    if let Some(text) = &stdout_preview {
        let at = task.output_updated_at.unwrap_or(last_seen_at);
        entries.push(
            entry(at, LogType::Output, text.clone()).with_details(json!({"source": "stdout"})),
        );
    }

    let result_preview = match &task.result {
        Some(Value::String(text)) => preview(text, options.output_preview_lines),
        _ => None,
    };
    if let Some(text) = result_preview.filter(|text| Some(text) != stdout_preview.as_ref()) {
        entries.push(
            entry(last_seen_at, LogType::Output, text).with_details(json!({"source": "result"})),
        );
    }

    let mut closing_details = Map::new();
    if let Some(status) = &task.status {
        closing_details.insert("status".to_string(), Value::String(status.clone()));
    }
    for (name, value) in &task.extra {
        if name != "plan" {
            closing_details.insert(name.clone(), value.clone());
        }
    }
    if let Some(result) = task.result.as_ref().filter(|r| !r.is_string()) {
        closing_details.insert("result".to_string(), result.clone());
    }

    let closing = match classify(task.status.as_deref()) {
        StatusClass::Complete => entry(
            last_seen_at,
            LogType::Complete,
            task.summary
                .clone()
                .unwrap_or_else(|| "Task completed".to_string()),
        ),
        StatusClass::Failed => entry(
            last_seen_at,
            LogType::Error,
            error_message(task.error.as_ref()).unwrap_or_else(|| {
                format!("Task {}", task.status.as_deref().unwrap_or("failed"))
            }),
        ),
        StatusClass::Open => entry(
            last_seen_at,
            LogType::Status,
            match &task.status {
                Some(status) => format!("Status: {status}"),
                None => "Status unknown".to_string(),
            },
        ),
    };
    entries.push(closing.with_details(Value::Object(closing_details)));

    entries
}

// =========================================================================
// Log lists
// =========================================================================

fn decode_items(
    raw: RawRecord,
    diagnostics: &mut AggregateDiagnostics,
    mut decode_item: impl FnMut(&Value) -> Option<UnifiedLogEntry>,
) -> Decoded<Record> {
    let RawRecord::List(items) = raw else {
        return Decoded::Skip("log family expects a list".to_string());
    };

    let mut entries = Vec::with_capacity(items.len());
    for item in &items {
        let decoded = serde_json::from_str::<Value>(item)
            .ok()
            .filter(Value::is_object)
            .and_then(|value| decode_item(&value));
        match decoded {
            Some(entry) => entries.push(entry),
            None => diagnostics.skipped_entries += 1,
        }
    }
    Decoded::Ok(Record::Entries(entries))
}

/// Decode an agent activity list; items are already discrete entries
pub(crate) fn decode_agent_log(
    ctx: &RecordContext,
    raw: RawRecord,
    diagnostics: &mut AggregateDiagnostics,
) -> Decoded<Record> {
    decode_items(raw, diagnostics, |item| {
        let timestamp = item.get("timestamp").and_then(timestamp_from_json)?;
        let raw_type = str_member(item, &["type"]);
        let log_type = raw_type.and_then(LogType::parse).unwrap_or(LogType::Status);
        let message = str_member(item, &["message"])
            .or(raw_type)
            .unwrap_or(log_type.as_str())
            .to_string();
        let agent = str_member(item, &["role", "agent"])
            .map_or_else(|| ctx.default_agent.clone(), str::to_string);

        let metadata = item.get("metadata").filter(|m| m.is_object());
        let task_id = metadata
            .and_then(|m| str_member(m, &["taskId", "task_id"]))
            .map(str::to_string);
        let session_id = metadata
            .and_then(|m| str_member(m, &["sessionId", "session_id"]))
            .map(str::to_string);

        Some(
            UnifiedLogEntry::new(timestamp, agent, log_type, message)
                .with_task(task_id)
                .with_session(session_id)
                .with_details(metadata.cloned().unwrap_or(Value::Null)),
        )
    })
}

fn step_type(status: Option<&str>) -> LogType {
    match status.map(str::to_ascii_lowercase).as_deref() {
        Some("delegating" | "started" | "spawned") => LogType::Spawn,
        Some("completed" | "complete" | "success") => LogType::Complete,
        Some("failed" | "error") => LogType::Error,
        Some("output") => LogType::Output,
        _ => LogType::Status,
    }
}

/// Decode an orchestrator step list
pub(crate) fn decode_step_log(
    ctx: &RecordContext,
    raw: RawRecord,
    diagnostics: &mut AggregateDiagnostics,
) -> Decoded<Record> {
    decode_items(raw, diagnostics, |item| {
        let timestamp = item.get("timestamp").and_then(timestamp_from_json)?;
        let status = str_member(item, &["status"]);
        let step_id = item.get("step_id").cloned().unwrap_or(Value::Null);
        let message = str_member(item, &["action", "message"])
            .map(str::to_string)
            .unwrap_or_else(|| format!("Step {step_id} {}", status.unwrap_or("updated")));
        let agent = str_member(item, &["agent"])
            .map_or_else(|| ctx.default_agent.clone(), str::to_string);
        let task_id = str_member(item, &["task_id"]).map_or_else(|| ctx.id.clone(), str::to_string);

        let mut details = Map::new();
        if !step_id.is_null() {
            details.insert("step_id".to_string(), step_id);
        }
        if let Some(status) = status {
            details.insert("status".to_string(), Value::String(status.to_string()));
        }

        Some(
            UnifiedLogEntry::new(timestamp, agent, step_type(status), message)
                .with_task(Some(task_id))
                .with_details(Value::Object(details)),
        )
    })
}

/// Log lists need no synthesis
pub(crate) fn pass_through(record: Record, _options: &SynthesisOptions) -> Vec<UnifiedLogEntry> {
    match record {
        Record::Entries(entries) => entries,
        Record::Task(_) => Vec::new(),
    }
}
