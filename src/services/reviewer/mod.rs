//! Reviewer
//!
//! A single streamed model call that critiques a draft answer against the
//! gathered evidence. The critique text is streamed as `review` updates while it
//! is generated; any tool calls become typed follow-up retrieval requests.

mod prompts;

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use uuid::Uuid;

use incident_triage_core::error::{CoreError, CoreResult};
use incident_triage_core::step::Step;
use incident_triage_core::update::UpdatePayload;
use incident_triage_llm::provider::LlmProvider;
use incident_triage_llm::types::{Message, ToolDefinition};
use incident_triage_retrieval::{
    parse_retrieval_requests, search_code_tool, search_logs_tool, FacetLabels, RetrievalRequest,
};

use crate::models::settings::PromptSettings;
use crate::services::model_stream::{stream_model, ModelRequest};
use crate::services::updates::UpdateEmitter;
use prompts::{build_review_prompt, ReviewPromptContext, REVIEWER_SYSTEM_PROMPT};

/// Prefix of the note appended to the review step when the model call fails.
pub const REVIEW_UNAVAILABLE_PREFIX: &str = "[review unavailable] ";

/// Everything the reviewer looks at.
#[derive(Debug, Clone, Default)]
pub struct ReviewRequest {
    pub query: String,
    pub chat_history: Vec<Message>,
    /// Steps accumulated for the answer so far
    pub steps: Vec<Step>,
    pub draft_answer: String,
    pub labels: FacetLabels,
    /// Stage the review updates are attributed to
    pub parent_id: Option<String>,
}

/// Outcome of a review.
#[derive(Debug, Clone, PartialEq)]
pub enum ReviewerResponse {
    /// The draft stands; `content` is the streamed critique
    Review { step_id: String, content: String },
    /// More evidence is needed before the draft can be finalized
    RequestToolCalls(Vec<RetrievalRequest>),
    /// The model call failed; the draft goes out unreviewed. `content` holds
    /// whatever critique streamed before the failure.
    Degraded {
        step_id: String,
        content: String,
        error: String,
    },
}

pub struct Reviewer {
    provider: Arc<dyn LlmProvider>,
    tools: Vec<ToolDefinition>,
    prompt: PromptSettings,
    cancel: CancellationToken,
}

impl Reviewer {
    /// A reviewer offered both `search_logs` and `search_code`.
    pub fn new(provider: Arc<dyn LlmProvider>) -> Self {
        Self {
            provider,
            tools: vec![search_logs_tool(), search_code_tool()],
            prompt: PromptSettings::default(),
            cancel: CancellationToken::new(),
        }
    }

    /// Restrict or replace the tools offered to the model.
    pub fn with_tools(mut self, tools: Vec<ToolDefinition>) -> Self {
        self.tools = tools;
        self
    }

    pub fn with_prompt_settings(mut self, prompt: PromptSettings) -> Self {
        self.prompt = prompt;
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Names of the tools the model may call.
    pub fn allowed_tools(&self) -> Vec<String> {
        self.tools.iter().map(|t| t.name.clone()).collect()
    }

    /// Review a draft answer.
    ///
    /// Text deltas are emitted as `review` updates addressed to a fresh step id
    /// and attributed to `request.parent_id`. A tool call outside the offered
    /// set fails the review with a contract violation.
    pub async fn review(
        &self,
        request: ReviewRequest,
        emitter: &UpdateEmitter,
    ) -> CoreResult<ReviewerResponse> {
        if self.cancel.is_cancelled() {
            info!("review cancelled before model call");
            return Err(CoreError::cancelled("review"));
        }

        let step_id = Uuid::new_v4().to_string();
        let emitter = match &request.parent_id {
            Some(parent) => emitter.clone().with_parent(parent.clone()),
            None => emitter.clone(),
        };

        let user = build_review_prompt(&ReviewPromptContext {
            query: &request.query,
            chat_history: &request.chat_history,
            steps: &request.steps,
            draft_answer: &request.draft_answer,
            labels: &request.labels,
            settings: &self.prompt,
        });

        let streamed = stream_model(
            self.provider.as_ref(),
            ModelRequest {
                system: REVIEWER_SYSTEM_PROMPT.to_string(),
                user,
                tools: self.tools.clone(),
            },
            &emitter,
            &step_id,
            |chunk| UpdatePayload::Review { chunk },
        )
        .await;

        let response = match streamed.result {
            Ok(response) => response,
            Err(e) => {
                let error = e.to_string();
                warn!(
                    provider = self.provider.name(),
                    step_id = %step_id,
                    error = %error,
                    "review model call failed; keeping draft"
                );
                let separator = if streamed.streamed_text.is_empty() { "" } else { "\n" };
                let chunk = format!("{}{}{}", separator, REVIEW_UNAVAILABLE_PREFIX, error);
                emitter
                    .emit(&step_id, UpdatePayload::Review { chunk })
                    .await;
                return Ok(ReviewerResponse::Degraded {
                    step_id,
                    content: streamed.streamed_text,
                    error,
                });
            }
        };

        if response.tool_calls.is_empty() {
            let content = if streamed.streamed_text.is_empty() {
                response.text().to_string()
            } else {
                streamed.streamed_text
            };
            info!(step_id = %step_id, chars = content.len(), "review finalized");
            return Ok(ReviewerResponse::Review { step_id, content });
        }

        let requests = parse_retrieval_requests(&response.tool_calls, &self.allowed_tools())?;
        info!(
            requests = requests.len(),
            "review requested additional retrieval"
        );
        Ok(ReviewerResponse::RequestToolCalls(requests))
    }
}
