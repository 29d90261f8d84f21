//! Retrieval Sub-Agents
//!
//! The generic retrieval loop and its log and code search specialisations.

pub mod domain;
pub mod engine;
mod prompts;

pub use domain::{CodeSearchDomain, FallbackContext, LogSearchDomain, SearchDomain, SearchStep};
pub use engine::{
    CodeSearchAgent, LogSearchAgent, RetrievalSubAgent, SubAgentOutcome, SubAgentRequest,
    SubAgentResponse, Termination,
};
