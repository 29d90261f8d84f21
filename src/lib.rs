//! Incident Triage
//!
//! Core of an agentic incident-triage assistant: retrieval sub-agents that
//! iteratively query logs and code, a reviewer that critiques draft answers,
//! and the stream update protocol that materializes an answer's audit trail.
//!
//! The step model, update protocol, and reducer live in `incident-triage-core`;
//! the model contract in `incident-triage-llm`; the retrieval contract in
//! `incident-triage-retrieval`. This crate holds the engines and configuration.

pub mod models;
pub mod services;
pub mod utils;

pub use models::settings::{TriageConfig, TriageConfigBuilder};
pub use utils::error::{AppError, AppResult};
