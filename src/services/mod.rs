//! Services
//!
//! The retrieval sub-agents, the reviewer, review follow-up dispatch, and the
//! update emitter they all report through.

pub mod dispatch;
mod model_stream;
pub mod reviewer;
pub mod subagent;
pub mod updates;

pub use dispatch::{DispatchTable, FollowUp, RetrievalRoute};
pub use reviewer::{ReviewRequest, Reviewer, ReviewerResponse};
pub use subagent::{
    CodeSearchAgent, CodeSearchDomain, LogSearchAgent, LogSearchDomain, RetrievalSubAgent,
    SearchDomain, SubAgentOutcome, SubAgentRequest, Termination,
};
pub use updates::UpdateEmitter;
