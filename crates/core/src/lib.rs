//! Incident Triage Core
//!
//! Foundational types for the incident-triage workspace. This crate has no
//! dependency on model providers, retrieval backends, or async runtimes.
//!
//! ## Module Organization
//!
//! - `error` - Core error types (`CoreError`, `CoreResult`, `ContractViolation`)
//! - `step` - The step vocabulary of an answer's audit trail
//! - `update` - Stream update envelope emitted while the model generates
//! - `reducer` - Pure fold of stream updates into a materialized `Answer`
//! - `streaming` - Provider-agnostic model stream events

pub mod error;
pub mod reducer;
pub mod step;
pub mod streaming;
pub mod update;

// ── Error Types ────────────────────────────────────────────────────────
pub use error::{ContractViolation, CoreError, CoreResult};

// ── Step Model ─────────────────────────────────────────────────────────
pub use step::{
    CodeMatch, CodeSearchInput, CodeToolCall, Fact, LogRecord, LogSearchInput, LogToolCall,
    RetrievalResults, Step, StepKind, ToolCallResult,
};

// ── Stream Updates & Reducer ───────────────────────────────────────────
pub use reducer::{reduce, reduce_all, reduce_json, Answer};
pub use update::{StreamUpdate, UpdatePayload, UPDATE_KINDS};

// ── Model Streaming ────────────────────────────────────────────────────
pub use streaming::ModelStreamEvent;
