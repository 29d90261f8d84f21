//! Step Model
//!
//! The closed vocabulary of evidence and reasoning units that make up an answer's
//! audit trail. Every step carries a stable `id`, a `timestamp`, and a kind-specific
//! payload. The reducer pattern-matches `StepKind` exhaustively, so adding a kind
//! forces the merge rules to be updated.
//!
//! Wire names follow the camelCase convention the UI layer consumes
//! (`logSearch`, `codePostprocessing`, ...).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// ============================================================================
// Retrieval queries
// ============================================================================

/// A log search issued by the log sub-agent (or requested by the reviewer).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogSearchInput {
    /// Query text in the observability platform's search syntax
    pub query: String,
    /// Inclusive start of the time range
    pub start: DateTime<Utc>,
    /// Exclusive end of the time range
    pub end: DateTime<Utc>,
    /// Maximum number of records to return
    pub limit: u32,
    /// Opaque cursor from a previous page of results
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_cursor: Option<String>,
    /// Why the model issued this query
    pub reasoning: String,
}

/// A code search issued by the code sub-agent (or requested by the reviewer).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeSearchInput {
    /// Free-text or symbol query
    pub query: String,
    /// Restrict the search to one repository
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repository: Option<String>,
    /// Restrict the search to paths matching this glob
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path_glob: Option<String>,
    /// Maximum number of matches to return
    #[serde(default = "default_code_limit")]
    pub limit: u32,
    /// Opaque cursor from a previous page of results
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_cursor: Option<String>,
    /// Why the model issued this query
    pub reasoning: String,
}

fn default_code_limit() -> u32 {
    20
}

// ============================================================================
// Retrieval results
// ============================================================================

/// A single log line returned by the observability platform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogRecord {
    pub timestamp: DateTime<Utc>,
    pub service: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
    pub message: String,
    /// Remaining structured fields (trace ids, http status, ...)
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub attributes: Map<String, Value>,
}

/// A code location returned by code search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeMatch {
    pub repository: String,
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
    pub snippet: String,
}

/// Outcome of executing a retrieval query.
///
/// A failed retrieval is recorded as its error message so the next prompt can
/// show the model what went wrong.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RetrievalResults<R> {
    Records(Vec<R>),
    Failed(String),
}

impl<R> RetrievalResults<R> {
    /// Returns the error message if this retrieval failed.
    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Failed(message) => Some(message),
            Self::Records(_) => None,
        }
    }

    /// Returns the records if this retrieval succeeded.
    pub fn records(&self) -> Option<&[R]> {
        match self {
            Self::Records(records) => Some(records),
            Self::Failed(_) => None,
        }
    }
}

/// One executed retrieval: the query as issued and what came back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolCallResult<I, R> {
    pub timestamp: DateTime<Utc>,
    pub input: I,
    pub results: RetrievalResults<R>,
}

/// An executed log search.
pub type LogToolCall = ToolCallResult<LogSearchInput, LogRecord>;

/// An executed code search.
pub type CodeToolCall = ToolCallResult<CodeSearchInput, CodeMatch>;

/// A structured fact extracted during postprocessing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Fact {
    pub fact: String,
    /// Identifiers of the evidence the fact was drawn from
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub citations: Vec<String>,
}

// ============================================================================
// Step
// ============================================================================

/// Kind-specific payload of a step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum StepKind {
    /// Free-text reasoning, grows by append
    Reasoning { data: String },
    /// Log retrieval: streamed reasoning plus the executed searches
    LogSearch {
        reasoning: String,
        data: Vec<LogToolCall>,
    },
    /// Code retrieval: streamed reasoning plus the executed searches
    CodeSearch {
        reasoning: String,
        data: Vec<CodeToolCall>,
    },
    /// Facts extracted from log evidence
    LogPostprocessing { data: Vec<Fact> },
    /// Facts extracted from code evidence
    CodePostprocessing { data: Vec<Fact> },
    /// Reviewer critique of a draft answer
    Review { content: String },
}

impl StepKind {
    /// The wire discriminator of this kind.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Reasoning { .. } => "reasoning",
            Self::LogSearch { .. } => "logSearch",
            Self::CodeSearch { .. } => "codeSearch",
            Self::LogPostprocessing { .. } => "logPostprocessing",
            Self::CodePostprocessing { .. } => "codePostprocessing",
            Self::Review { .. } => "review",
        }
    }
}

/// A unit of evidence or reasoning in an answer's audit trail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    /// Stable for the lifetime of the step; unique within one answer
    pub id: String,
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub kind: StepKind,
}

impl Step {
    pub fn new(id: impl Into<String>, timestamp: DateTime<Utc>, kind: StepKind) -> Self {
        Self {
            id: id.into(),
            timestamp,
            kind,
        }
    }
}
