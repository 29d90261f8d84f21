//! Data Models
//!
//! Configuration types for the triage services.

pub mod settings;

pub use settings::{AgentSettings, FallbackSettings, PromptSettings, TriageConfig, TriageConfigBuilder};
