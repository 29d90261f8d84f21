//! Review Follow-up Dispatch
//!
//! Routes the reviewer's requested tool calls back to the sub-agent that owns
//! each tool, with the per-review iteration budget.

use std::collections::HashMap;

use tracing::debug;

use incident_triage_core::error::{ContractViolation, CoreResult};
use incident_triage_retrieval::{RetrievalRequest, SEARCH_CODE, SEARCH_LOGS};

use crate::services::subagent::{
    CodeSearchDomain, LogSearchDomain, SearchDomain, SubAgentRequest,
};

/// Which sub-agent handles a follow-up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RetrievalRoute {
    LogSearch,
    CodeSearch,
}

/// One follow-up retrieval run derived from a reviewer request.
#[derive(Debug, Clone, PartialEq)]
pub struct FollowUp {
    pub route: RetrievalRoute,
    /// Retrieval objective handed to the sub-agent
    pub objective: String,
    /// The query the reviewer suggested
    pub request: RetrievalRequest,
    pub max_iterations: u32,
}

impl FollowUp {
    /// Sub-agent input for this follow-up, to be extended with history and labels.
    pub fn subagent_request<D: SearchDomain>(&self, user_query: &str) -> SubAgentRequest<D> {
        SubAgentRequest::new(user_query, self.objective.clone(), self.max_iterations)
    }
}

/// Tool name to sub-agent routing.
#[derive(Debug, Clone)]
pub struct DispatchTable {
    routes: HashMap<String, RetrievalRoute>,
    max_iterations: u32,
}

impl DispatchTable {
    /// An empty table; follow-ups get `max_iterations` model calls each.
    pub fn new(max_iterations: u32) -> Self {
        Self {
            routes: HashMap::new(),
            max_iterations,
        }
    }

    /// `search_logs` to the log agent, `search_code` to the code agent.
    pub fn standard(max_iterations: u32) -> Self {
        Self::new(max_iterations)
            .register(SEARCH_LOGS, RetrievalRoute::LogSearch)
            .register(SEARCH_CODE, RetrievalRoute::CodeSearch)
    }

    pub fn register(mut self, tool_name: impl Into<String>, route: RetrievalRoute) -> Self {
        self.routes.insert(tool_name.into(), route);
        self
    }

    pub fn route_for(&self, tool_name: &str) -> Option<RetrievalRoute> {
        self.routes.get(tool_name).copied()
    }

    /// Turn reviewer requests into follow-ups, in request order.
    ///
    /// A request whose tool has no route is a contract violation.
    pub fn route(&self, requests: &[RetrievalRequest]) -> CoreResult<Vec<FollowUp>> {
        requests
            .iter()
            .map(|request| -> CoreResult<FollowUp> {
                let tool = request.tool_name();
                let route = self.route_for(tool).ok_or_else(|| {
                    let mut allowed: Vec<String> = self.routes.keys().cloned().collect();
                    allowed.sort();
                    ContractViolation::UnknownTool {
                        name: tool.to_string(),
                        allowed,
                    }
                })?;
                debug!(tool, ?route, "routing review follow-up");
                Ok(FollowUp {
                    route,
                    objective: objective_for(request),
                    request: request.clone(),
                    max_iterations: self.max_iterations,
                })
            })
            .collect()
    }
}

fn objective_for(request: &RetrievalRequest) -> String {
    let suggested = match request {
        RetrievalRequest::SearchLogs(input) => LogSearchDomain::describe_query(input),
        RetrievalRequest::SearchCode(input) => CodeSearchDomain::describe_query(input),
    };
    format!(
        "A reviewer found a gap in the draft answer: {}\nSuggested starting query: {}",
        request.reasoning(),
        suggested
    )
}
