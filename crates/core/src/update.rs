//! Stream Update Protocol
//!
//! The envelope used to push partial model output from the retrieval and review
//! engines to any listener. Updates are transient: only their effect on the
//! materialized answer (see `reducer`) is persisted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::step::{CodeToolCall, Fact, LogToolCall};

/// Wire discriminators the reducer understands, in declaration order.
pub const UPDATE_KINDS: [&str; 8] = [
    "reasoning-chunk",
    "logSearch-chunk",
    "codeSearch-chunk",
    "logSearch-tools",
    "codeSearch-tools",
    "logPostprocessing",
    "codePostprocessing",
    "review",
];

/// Kind-specific body of a stream update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum UpdatePayload {
    /// Appended to a reasoning step's `data`
    #[serde(rename = "reasoning-chunk")]
    ReasoningChunk { chunk: String },

    /// Appended to a log search step's `reasoning`
    #[serde(rename = "logSearch-chunk")]
    LogSearchChunk { chunk: String },

    /// Appended to a code search step's `reasoning`
    #[serde(rename = "codeSearch-chunk")]
    CodeSearchChunk { chunk: String },

    /// Complete snapshot of a log search step's executed queries
    #[serde(rename = "logSearch-tools")]
    LogSearchTools { tools: Vec<LogToolCall> },

    /// Complete snapshot of a code search step's executed queries
    #[serde(rename = "codeSearch-tools")]
    CodeSearchTools { tools: Vec<CodeToolCall> },

    /// Fully-formed log postprocessing step
    #[serde(rename = "logPostprocessing")]
    LogPostprocessing { data: Vec<Fact> },

    /// Fully-formed code postprocessing step
    #[serde(rename = "codePostprocessing")]
    CodePostprocessing { data: Vec<Fact> },

    /// Review text delta, appended to the review step's `content`
    #[serde(rename = "review")]
    Review { chunk: String },
}

impl UpdatePayload {
    /// The wire discriminator of this payload.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ReasoningChunk { .. } => "reasoning-chunk",
            Self::LogSearchChunk { .. } => "logSearch-chunk",
            Self::CodeSearchChunk { .. } => "codeSearch-chunk",
            Self::LogSearchTools { .. } => "logSearch-tools",
            Self::CodeSearchTools { .. } => "codeSearch-tools",
            Self::LogPostprocessing { .. } => "logPostprocessing",
            Self::CodePostprocessing { .. } => "codePostprocessing",
            Self::Review { .. } => "review",
        }
    }
}

/// A single update addressed to one step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamUpdate {
    /// The step being created or updated
    pub id: String,
    /// The step or stage that spawned this update
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    /// Emission time; becomes the step's timestamp when the update creates it
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub payload: UpdatePayload,
}

impl StreamUpdate {
    /// Create an update stamped with the current time.
    pub fn new(id: impl Into<String>, payload: UpdatePayload) -> Self {
        Self {
            id: id.into(),
            parent_id: None,
            timestamp: Utc::now(),
            payload,
        }
    }

    /// Attribute this update to a parent step or stage.
    pub fn with_parent(mut self, parent_id: Option<String>) -> Self {
        self.parent_id = parent_id;
        self
    }

    /// Override the emission timestamp.
    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn kind(&self) -> &'static str {
        self.payload.kind()
    }
}
