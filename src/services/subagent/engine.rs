//! Retrieval Sub-Agent Engine
//!
//! Iterative query-execute-evaluate loop shared by the log and code search
//! agents. Each iteration asks the model for at most one query, runs it, and
//! feeds the outcome into the next prompt until the model stops calling the
//! tool, the budget runs out, or the run is cancelled.

use std::fmt;
use std::sync::Arc;

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use incident_triage_core::error::CoreResult;
use incident_triage_core::step::{RetrievalResults, ToolCallResult};
use incident_triage_llm::provider::LlmProvider;
use incident_triage_retrieval::{at_most_one_call, parse_arguments, FacetLabels};

use super::domain::{CodeSearchDomain, FallbackContext, LogSearchDomain, SearchDomain, SearchStep};
use super::prompts::{build_system_prompt, build_user_prompt, PromptContext};
use crate::models::settings::PromptSettings;
use crate::services::model_stream::{stream_model, ModelRequest};
use crate::services::updates::UpdateEmitter;

/// Log search specialisation of the engine.
pub type LogSearchAgent = RetrievalSubAgent<LogSearchDomain>;

/// Code search specialisation of the engine.
pub type CodeSearchAgent = RetrievalSubAgent<CodeSearchDomain>;

/// What the model decided on one iteration.
#[derive(Debug, Clone, PartialEq)]
pub enum SubAgentResponse<I> {
    /// Run this query next
    Query(I),
    /// Evidence is sufficient; no tool was called
    TaskComplete { reasoning: String },
}

/// Why a run stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Termination {
    /// The model stopped calling the tool
    TaskComplete { reasoning: String },
    /// The iteration budget was used up
    MaxIterations,
    /// Cancellation was observed at an iteration boundary
    Cancelled,
}

/// Input of one sub-agent run.
pub struct SubAgentRequest<D: SearchDomain> {
    /// The user's question
    pub query: String,
    /// The specific evidence this run should gather
    pub objective: String,
    /// Steps from earlier runs, shown to the model but not returned again
    pub prior_history: Vec<SearchStep<D>>,
    /// Facet labels shown to the model; discovered from the domain when empty
    pub labels: FacetLabels,
    pub system_overview: String,
    pub max_iterations: u32,
    /// Step the run's updates are addressed to; a fresh id when `None`
    pub step_id: Option<String>,
}

impl<D: SearchDomain> SubAgentRequest<D> {
    pub fn new(query: impl Into<String>, objective: impl Into<String>, max_iterations: u32) -> Self {
        Self {
            query: query.into(),
            objective: objective.into(),
            prior_history: Vec::new(),
            labels: FacetLabels::new(),
            system_overview: String::new(),
            max_iterations,
            step_id: None,
        }
    }

    pub fn with_step_id(mut self, step_id: impl Into<String>) -> Self {
        self.step_id = Some(step_id.into());
        self
    }

    pub fn with_history(mut self, history: Vec<SearchStep<D>>) -> Self {
        self.prior_history = history;
        self
    }

    pub fn with_labels(mut self, labels: FacetLabels) -> Self {
        self.labels = labels;
        self
    }

    pub fn with_system_overview(mut self, overview: impl Into<String>) -> Self {
        self.system_overview = overview.into();
        self
    }
}

/// Result of one sub-agent run.
pub struct SubAgentOutcome<D: SearchDomain> {
    /// Step this run's updates were addressed to
    pub step_id: String,
    /// Steps executed by this run, in order
    pub new_steps: Vec<SearchStep<D>>,
    pub termination: Termination,
}

impl<D: SearchDomain> fmt::Debug for SubAgentOutcome<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubAgentOutcome")
            .field("step_id", &self.step_id)
            .field("new_steps", &self.new_steps)
            .field("termination", &self.termination)
            .finish()
    }
}

/// The generic retrieval loop, parameterised by its search domain.
pub struct RetrievalSubAgent<D: SearchDomain> {
    domain: D,
    provider: Arc<dyn LlmProvider>,
    prompt: PromptSettings,
    cancel: CancellationToken,
}

impl<D: SearchDomain> RetrievalSubAgent<D> {
    pub fn new(domain: D, provider: Arc<dyn LlmProvider>) -> Self {
        Self {
            domain,
            provider,
            prompt: PromptSettings::default(),
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_prompt_settings(mut self, prompt: PromptSettings) -> Self {
        self.prompt = prompt;
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn domain(&self) -> &D {
        &self.domain
    }

    /// Run the loop.
    ///
    /// Every run reports to its own step, so one agent can serve several runs
    /// on the same update stream. Retrieval failures and model failures are
    /// recovered inside the loop. Only contract violations are returned as
    /// errors.
    pub async fn run(
        &self,
        request: SubAgentRequest<D>,
        emitter: &UpdateEmitter,
    ) -> CoreResult<SubAgentOutcome<D>> {
        let SubAgentRequest {
            query,
            objective,
            prior_history,
            labels,
            system_overview,
            max_iterations,
            step_id,
        } = request;
        let step_id = step_id.unwrap_or_else(|| Uuid::new_v4().to_string());
        let labels = if labels.is_empty() {
            self.domain.discover_labels(Utc::now()).await
        } else {
            labels
        };

        let tool = self.domain.tool();
        let system = build_system_prompt(&self.domain);
        let mut previous = prior_history;
        let mut new_steps: Vec<SearchStep<D>> = Vec::new();

        for iteration in 1..=max_iterations {
            if self.cancel.is_cancelled() {
                info!(
                    agent = self.domain.label(),
                    step_id = %step_id,
                    iteration,
                    "retrieval cancelled"
                );
                return Ok(SubAgentOutcome {
                    step_id,
                    new_steps,
                    termination: Termination::Cancelled,
                });
            }

            let last = if new_steps.is_empty() {
                None
            } else {
                previous.last()
            };
            let user = build_user_prompt(&PromptContext::<D> {
                user_query: &query,
                objective: &objective,
                system_overview: &system_overview,
                labels: &labels,
                previous: &previous,
                last,
                iteration,
                max_iterations,
                settings: &self.prompt,
            });

            let request = ModelRequest {
                system: system.clone(),
                user,
                tools: vec![tool.clone()],
            };
            let input = match self.decide(request, &step_id, &query, &labels, emitter).await? {
                SubAgentResponse::Query(input) => input,
                SubAgentResponse::TaskComplete { reasoning } => {
                    info!(
                        agent = self.domain.label(),
                        step_id = %step_id,
                        iteration,
                        steps = new_steps.len(),
                        "retrieval task complete"
                    );
                    return Ok(SubAgentOutcome {
                        step_id,
                        new_steps,
                        termination: Termination::TaskComplete { reasoning },
                    });
                }
            };

            let step = self.execute(input).await;
            previous.push(step.clone());
            new_steps.push(step);
            emitter
                .emit(&step_id, D::tools_payload(new_steps.clone()))
                .await;
        }

        info!(
            agent = self.domain.label(),
            step_id = %step_id,
            max_iterations,
            reason = "reached maximum iterations",
            "retrieval finished"
        );
        Ok(SubAgentOutcome {
            step_id,
            new_steps,
            termination: Termination::MaxIterations,
        })
    }

    /// One model call: stream its text into the step, then validate the tool
    /// call. An inference failure yields the domain's fallback query.
    async fn decide(
        &self,
        request: ModelRequest,
        step_id: &str,
        user_query: &str,
        labels: &FacetLabels,
        emitter: &UpdateEmitter,
    ) -> CoreResult<SubAgentResponse<D::Input>> {
        let streamed = stream_model(
            self.provider.as_ref(),
            request,
            emitter,
            step_id,
            D::chunk_payload,
        )
        .await;

        let response = match streamed.result {
            Ok(response) => response,
            Err(e) => {
                let error = e.to_string();
                warn!(
                    agent = self.domain.label(),
                    provider = self.provider.name(),
                    error = %error,
                    "model call failed; using fallback query"
                );
                let input = self.domain.fallback_query(&FallbackContext {
                    user_query,
                    labels,
                    now: Utc::now(),
                    error: &error,
                });
                return Ok(SubAgentResponse::Query(input));
            }
        };

        let tool_name = self.domain.tool().name;
        match at_most_one_call(&response.tool_calls, &tool_name)? {
            Some(call) => Ok(SubAgentResponse::Query(parse_arguments(call)?)),
            None => {
                let reasoning = if streamed.streamed_text.is_empty() {
                    response.text().to_string()
                } else {
                    streamed.streamed_text
                };
                Ok(SubAgentResponse::TaskComplete { reasoning })
            }
        }
    }

    /// Run a query; a retrieval error becomes the step's result text.
    async fn execute(&self, input: D::Input) -> SearchStep<D> {
        let results = match self.domain.execute(&input).await {
            Ok(records) => {
                debug!(
                    agent = self.domain.label(),
                    query = %D::describe_query(&input),
                    results = records.len(),
                    "retrieval succeeded"
                );
                RetrievalResults::Records(records)
            }
            Err(e) => {
                warn!(
                    agent = self.domain.label(),
                    query = %D::describe_query(&input),
                    error = %e,
                    "retrieval failed"
                );
                RetrievalResults::Failed(e.to_string())
            }
        };
        ToolCallResult {
            timestamp: Utc::now(),
            input,
            results,
        }
    }
}
