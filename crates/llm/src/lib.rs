//! Incident Triage LLM
//!
//! The language-model collaborator contract: conversation and tool-schema types,
//! request options, and the `LlmProvider` trait the retrieval and review engines
//! drive. Provider implementations are supplied by the host application.

pub mod provider;
pub mod types;

// Re-export main types
pub use provider::LlmProvider;
pub use types::*;
