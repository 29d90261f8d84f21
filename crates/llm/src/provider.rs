//! LLM Provider Trait
//!
//! Defines the interface the triage engines consume. Concrete providers (hosted
//! APIs, local inference) live outside this workspace.

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::types::{LlmResponse, LlmResult, Message, ToolDefinition};
use incident_triage_core::streaming::ModelStreamEvent;

/// Trait that all LLM providers must implement.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Returns the provider name for identification.
    fn name(&self) -> &'static str;

    /// Returns the current model being used.
    fn model(&self) -> &str;

    /// Stream a message response via a channel.
    ///
    /// Tool choice is automatic: the model may call any of `tools` or answer in
    /// plain text. Text deltas are pushed through `tx` as they are generated.
    /// The returned response carries the full text and the finalized tool
    /// calls. `tx` is dropped when the call returns, which closes the receiving
    /// side.
    async fn stream_message(
        &self,
        messages: Vec<Message>,
        system: Option<String>,
        tools: Vec<ToolDefinition>,
        tx: mpsc::Sender<ModelStreamEvent>,
    ) -> LlmResult<LlmResponse>;
}
