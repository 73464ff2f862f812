//! Record families
//!
//! Each family of external records is described by a static descriptor that
//! pairs key identification with a decode function and a synthesize function.
//! The aggregator composes descriptors and never branches on the family itself.

use serde::Serialize;
use std::collections::HashMap;

use super::decode::{AggregateDiagnostics, Decoded};
use super::entry::UnifiedLogEntry;
use super::keyspace::KeyKind;
use super::synthesize::{self, TaskRecord};

/// Closed set of external record families
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordFamily {
    /// Single-agent task hashes written by the direct runner
    DirectTask,
    /// Task hashes written by the hybrid planner/executor pipeline
    HybridTask,
    /// Task hashes written by the orchestrator
    OrchestratorTask,
    /// Per-role agent activity lists
    AgentLog,
    /// Per-task orchestrator step lists
    OrchestratorStepLog,
}

impl RecordFamily {
    /// Every family, in aggregation order
    pub const ALL: [Self; 5] = [
        Self::DirectTask,
        Self::HybridTask,
        Self::OrchestratorTask,
        Self::AgentLog,
        Self::OrchestratorStepLog,
    ];

    /// Static descriptor for this family
    #[must_use]
    pub fn descriptor(self) -> &'static FamilyDescriptor {
        match self {
            Self::DirectTask => &DIRECT_TASK,
            Self::HybridTask => &HYBRID_TASK,
            Self::OrchestratorTask => &ORCHESTRATOR_TASK,
            Self::AgentLog => &AGENT_LOG,
            Self::OrchestratorStepLog => &ORCHESTRATOR_STEP_LOG,
        }
    }

    /// Wire name
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DirectTask => "direct_task",
            Self::HybridTask => "hybrid_task",
            Self::OrchestratorTask => "orchestrator_task",
            Self::AgentLog => "agent_log",
            Self::OrchestratorStepLog => "orchestrator_step_log",
        }
    }
}

impl std::fmt::Display for RecordFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw data fetched for one key
#[derive(Debug, Clone)]
pub enum RawRecord {
    /// Hash fields, plus the sidecar hash when the family has one
    Hash {
        /// Main hash
        fields: HashMap<String, String>,
        /// Sidecar hash
        sidecar: Option<HashMap<String, String>>,
    },
    /// List items, head first
    List(Vec<String>),
}

/// Decoded record, ready for synthesis
#[derive(Debug, Clone)]
pub enum Record {
    /// Latest snapshot of one task
    Task(TaskRecord),
    /// Already-discrete log entries
    Entries(Vec<UnifiedLogEntry>),
}

/// Identity of the key being decoded
#[derive(Debug, Clone)]
pub struct RecordContext {
    /// Owning family
    pub family: RecordFamily,
    /// Identifier segment of the key (task id or role)
    pub id: String,
    /// Agent used when the record names none
    pub default_agent: String,
}

/// Options that shape synthesized entries
#[derive(Debug, Clone)]
pub struct SynthesisOptions {
    /// Lines kept in an output preview
    pub output_preview_lines: usize,
}

impl Default for SynthesisOptions {
    fn default() -> Self {
        Self {
            output_preview_lines: 5,
        }
    }
}

/// Decodes raw key data into a record
pub type DecodeFn = fn(&RecordContext, RawRecord, &mut AggregateDiagnostics) -> Decoded<Record>;

/// Turns a decoded record into feed entries
pub type SynthesizeFn = fn(Record, &SynthesisOptions) -> Vec<UnifiedLogEntry>;

/// How a key relates to a family
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identity {
    /// Key belongs to the family; carries the identifier segment
    Record(String),
    /// Key shares the prefix but is not part of the family
    Ignore,
    /// Key looks like a family member but its identifier is unusable
    Malformed,
}

/// Static description of a record family
pub struct FamilyDescriptor {
    /// Family tag
    pub family: RecordFamily,
    /// Key prefix used for scanning
    pub prefix: &'static str,
    /// Required key suffix, if the family uses one
    pub suffix: Option<&'static str>,
    /// Expected storage kind
    pub expects: KeyKind,
    /// Sidecar hash suffix appended to the record key
    pub sidecar: Option<&'static str>,
    /// Agent for records that name none; `None` uses the identifier
    pub default_agent: Option<&'static str>,
    /// Decode step
    pub decode: DecodeFn,
    /// Synthesize step
    pub synthesize: SynthesizeFn,
}

impl FamilyDescriptor {
    /// Classify a scanned key
    #[must_use]
    pub fn identify(&self, key: &str) -> Identity {
        let Some(rest) = key.strip_prefix(self.prefix) else {
            return Identity::Ignore;
        };

        let id = match self.suffix {
            Some(suffix) => match rest.strip_suffix(suffix) {
                Some(id) => id,
                None => return Identity::Ignore,
            },
            // Sub-keys such as sidecars or log lists belong elsewhere
            None if rest.contains('.') => return Identity::Ignore,
            None => rest,
        };

        if id.is_empty() || id.contains('.') || id.chars().any(|c| c.is_whitespace() || c.is_control())
        {
            return Identity::Malformed;
        }
        Identity::Record(id.to_string())
    }

    /// Build the decode context for an identified key
    #[must_use]
    pub fn context(&self, id: String) -> RecordContext {
        let default_agent = self.default_agent.map_or_else(|| id.clone(), str::to_string);
        RecordContext {
            family: self.family,
            id,
            default_agent,
        }
    }

    /// Sidecar key for `key`, when the family has one
    #[must_use]
    pub fn sidecar_key(&self, key: &str) -> Option<String> {
        self.sidecar.map(|suffix| format!("{key}{suffix}"))
    }
}

static DIRECT_TASK: FamilyDescriptor = FamilyDescriptor {
    family: RecordFamily::DirectTask,
    prefix: "algomind.direct.claude.",
    suffix: None,
    expects: KeyKind::Hash,
    sidecar: Some(".output"),
    default_agent: Some("CLAUDE"),
    decode: synthesize::decode_task,
    synthesize: synthesize::synthesize_task,
};

static HYBRID_TASK: FamilyDescriptor = FamilyDescriptor {
    family: RecordFamily::HybridTask,
    prefix: "algomind.hybrid.task.",
    suffix: None,
    expects: KeyKind::Hash,
    sidecar: None,
    default_agent: Some("HYBRID"),
    decode: synthesize::decode_task,
    synthesize: synthesize::synthesize_task,
};

static ORCHESTRATOR_TASK: FamilyDescriptor = FamilyDescriptor {
    family: RecordFamily::OrchestratorTask,
    prefix: "algomind.orchestrator.",
    suffix: None,
    expects: KeyKind::Hash,
    sidecar: None,
    default_agent: Some("ORCHESTRATOR"),
    decode: synthesize::decode_task,
    synthesize: synthesize::synthesize_task,
};

static AGENT_LOG: FamilyDescriptor = FamilyDescriptor {
    family: RecordFamily::AgentLog,
    prefix: "algomind.agent.",
    suffix: Some(".logs"),
    expects: KeyKind::List,
    sidecar: None,
    default_agent: None,
    decode: synthesize::decode_agent_log,
    synthesize: synthesize::pass_through,
};

static ORCHESTRATOR_STEP_LOG: FamilyDescriptor = FamilyDescriptor {
    family: RecordFamily::OrchestratorStepLog,
    prefix: "algomind.orchestrator.",
    suffix: Some(".logs"),
    expects: KeyKind::List,
    sidecar: None,
    default_agent: Some("ORCHESTRATOR"),
    decode: synthesize::decode_step_log,
    synthesize: synthesize::pass_through,
};
