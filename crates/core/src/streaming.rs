//! Model Stream Event Types
//!
//! Provider-agnostic events emitted by a language model while it generates.
//! Provider implementations push these through a channel; the retrieval and
//! review engines translate them into `StreamUpdate`s addressed to steps.

use serde::{Deserialize, Serialize};

/// Streaming event that all provider implementations convert to.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ModelStreamEvent {
    /// Text content delta from the model
    TextDelta { content: String },

    /// Error reported by the provider mid-stream
    Error {
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        code: Option<String>,
    },

    /// Stream complete
    Complete {
        #[serde(skip_serializing_if = "Option::is_none")]
        stop_reason: Option<String>,
    },
}
