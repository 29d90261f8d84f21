//! Streaming Model Calls
//!
//! Drives `LlmProvider::stream_message` while forwarding each text delta to the
//! update emitter as it arrives. Both the provider call and the forwarder run on
//! the current task; the forwarder ends when the provider drops its sender.

use tokio::sync::mpsc;
use tracing::{debug, warn};

use incident_triage_core::streaming::ModelStreamEvent;
use incident_triage_core::update::UpdatePayload;
use incident_triage_llm::provider::LlmProvider;
use incident_triage_llm::types::{LlmResponse, LlmResult, Message, ToolDefinition};

use super::updates::UpdateEmitter;

const STREAM_BUFFER: usize = 64;

/// A single model invocation.
#[derive(Debug, Clone)]
pub(crate) struct ModelRequest {
    pub system: String,
    pub user: String,
    pub tools: Vec<ToolDefinition>,
}

/// Outcome of a streamed call: the provider's result plus every text delta
/// that was forwarded before it returned.
pub(crate) struct StreamedResponse {
    pub result: LlmResult<LlmResponse>,
    pub streamed_text: String,
}

/// Stream `request`, emitting each text delta to `step_id` as `to_payload(delta)`.
pub(crate) async fn stream_model(
    provider: &dyn LlmProvider,
    request: ModelRequest,
    emitter: &UpdateEmitter,
    step_id: &str,
    to_payload: fn(String) -> UpdatePayload,
) -> StreamedResponse {
    let (tx, mut rx) = mpsc::channel::<ModelStreamEvent>(STREAM_BUFFER);

    let call = provider.stream_message(
        vec![Message::user(request.user)],
        Some(request.system),
        request.tools,
        tx,
    );

    let forward = async {
        let mut text = String::new();
        while let Some(event) = rx.recv().await {
            match event {
                ModelStreamEvent::TextDelta { content } => {
                    text.push_str(&content);
                    emitter.emit(step_id, to_payload(content)).await;
                }
                ModelStreamEvent::Error { message, code } => {
                    warn!(
                        provider = provider.name(),
                        step_id,
                        error = %message,
                        code = ?code,
                        "model stream reported an error"
                    );
                }
                ModelStreamEvent::Complete { stop_reason } => {
                    debug!(step_id, stop_reason = ?stop_reason, "model stream complete");
                }
            }
        }
        text
    };

    let (result, streamed_text) = tokio::join!(call, forward);
    if let Ok(response) = &result {
        debug!(
            provider = provider.name(),
            model = %response.model,
            step_id,
            stop_reason = ?response.stop_reason,
            input_tokens = response.usage.input_tokens,
            output_tokens = response.usage.output_tokens,
            tool_calls = response.tool_calls.len(),
            "model call finished"
        );
    }
    StreamedResponse {
        result,
        streamed_text,
    }
}
