//! Core Error Types
//!
//! Defines the foundational error types used across the Incident Triage workspace.
//! These error types are dependency-free (only thiserror + std) to keep the core
//! crate lightweight.
//!
//! Contract violations get their own typed enum: they mean the model or the update
//! protocol drifted from the expected schema, and callers must treat them as fatal
//! for the current answer.

use thiserror::Error;

/// A breach of the tool-call or stream-update contract.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ContractViolation {
    /// The model emitted more tool calls than the caller accepts.
    #[error("expected at most {expected} tool call(s), model emitted {actual}")]
    TooManyToolCalls { expected: usize, actual: usize },

    /// The model invoked a tool that was not offered.
    #[error("unrecognized tool '{name}' (allowed: {})", allowed.join(", "))]
    UnknownTool { name: String, allowed: Vec<String> },

    /// Tool arguments did not match the tool's schema.
    #[error("invalid arguments for tool '{tool}': {reason}")]
    InvalidToolArguments { tool: String, reason: String },

    /// A stream update carried a discriminator the reducer does not know.
    #[error("unrecognized stream update kind: {kind}")]
    UnknownUpdateKind { kind: String },

    /// A stream update targeted an existing step of a different kind.
    #[error("update '{update_kind}' cannot be applied to {step_kind} step '{step_id}'")]
    StepKindMismatch {
        step_id: String,
        step_kind: String,
        update_kind: String,
    },
}

/// Core error type for the Incident Triage workspace.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Tool-call or update protocol drift
    #[error("Contract violation: {0}")]
    ContractViolation(#[from] ContractViolation),

    /// The operation was cancelled before it started
    #[error("Cancelled: {0}")]
    Cancelled(String),

    /// Generic internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for core errors
pub type CoreResult<T> = Result<T, CoreError>;

impl CoreError {
    /// Create a config error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a cancellation error
    pub fn cancelled(msg: impl Into<String>) -> Self {
        Self::Cancelled(msg.into())
    }

    /// Create an internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Whether this error is a contract violation.
    pub fn is_contract_violation(&self) -> bool {
        matches!(self, Self::ContractViolation(_))
    }
}

/// Convert CoreError to a string
impl From<CoreError> for String {
    fn from(err: CoreError) -> String {
        err.to_string()
    }
}
