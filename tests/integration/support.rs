//! Shared test doubles: a scripted model provider and in-memory retrieval
//! sources that record every call.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use incident_triage_core::step::{CodeMatch, CodeSearchInput, LogRecord, LogSearchInput};
use incident_triage_core::streaming::ModelStreamEvent;
use incident_triage_core::update::StreamUpdate;
use incident_triage_llm::provider::LlmProvider;
use incident_triage_llm::types::{
    LlmError, LlmResponse, LlmResult, Message, StopReason, ToolCall, ToolDefinition, UsageStats,
};
use incident_triage_retrieval::{CodeSource, FacetLabels, LogSource, RetrievalResult};

pub fn ts(hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, hour, 0, 0).unwrap()
}

// ============================================================================
// Scripted provider
// ============================================================================

/// One scripted model turn: text deltas streamed first, then the final result.
pub struct Turn {
    pub deltas: Vec<String>,
    pub result: LlmResult<LlmResponse>,
}

impl Turn {
    /// Plain-text answer with no tool calls.
    pub fn text(text: &str) -> Self {
        Self {
            deltas: vec![text.to_string()],
            result: Ok(response(Some(text), vec![])),
        }
    }

    /// Text streamed in several deltas, no tool calls.
    pub fn streamed(deltas: &[&str]) -> Self {
        let full: String = deltas.concat();
        Self {
            deltas: deltas.iter().map(|d| d.to_string()).collect(),
            result: Ok(response(Some(&full), vec![])),
        }
    }

    /// Tool calls with no text.
    pub fn calls(calls: Vec<ToolCall>) -> Self {
        Self {
            deltas: vec![],
            result: Ok(response(None, calls)),
        }
    }

    /// A short rationale followed by tool calls.
    pub fn thinking_then_calls(delta: &str, calls: Vec<ToolCall>) -> Self {
        Self {
            deltas: vec![delta.to_string()],
            result: Ok(response(Some(delta), calls)),
        }
    }

    pub fn failure(error: LlmError) -> Self {
        Self {
            deltas: vec![],
            result: Err(error),
        }
    }
}

pub fn response(text: Option<&str>, tool_calls: Vec<ToolCall>) -> LlmResponse {
    let stop_reason = if tool_calls.is_empty() {
        StopReason::EndTurn
    } else {
        StopReason::ToolUse
    };
    LlmResponse {
        content: text.map(str::to_string),
        tool_calls,
        stop_reason,
        usage: UsageStats::default(),
        model: "scripted".to_string(),
    }
}

pub fn tool_call(name: &str, arguments: Value) -> ToolCall {
    ToolCall {
        id: format!("call-{}", name),
        name: name.to_string(),
        arguments,
    }
}

pub fn log_query_args(query: &str) -> Value {
    json!({
        "query": query,
        "start": "2024-05-01T10:00:00Z",
        "end": "2024-05-01T12:00:00Z",
        "limit": 50,
        "reasoning": format!("look for {}", query)
    })
}

pub fn code_query_args(query: &str) -> Value {
    json!({
        "query": query,
        "repository": "payments",
        "reasoning": format!("find {}", query)
    })
}

/// A request as the provider saw it.
#[derive(Debug, Clone)]
pub struct SeenRequest {
    pub system: Option<String>,
    pub user: String,
    pub tools: Vec<String>,
}

/// Replays scripted turns in order. Once the script runs out every call
/// answers with plain text, which ends a retrieval loop.
#[derive(Default)]
pub struct ScriptedProvider {
    turns: Mutex<VecDeque<Turn>>,
    seen: Mutex<Vec<SeenRequest>>,
    repeat: Option<Value>,
}

impl ScriptedProvider {
    pub fn new(turns: Vec<Turn>) -> Self {
        Self {
            turns: Mutex::new(turns.into()),
            ..Self::default()
        }
    }

    /// Always answer with one `search_logs` call using `arguments`.
    pub fn always_searching(arguments: Value) -> Self {
        Self {
            repeat: Some(arguments),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.seen.lock().unwrap().len()
    }

    pub fn seen(&self) -> Vec<SeenRequest> {
        self.seen.lock().unwrap().clone()
    }

    fn next_turn(&self) -> Turn {
        if let Some(arguments) = &self.repeat {
            return Turn::calls(vec![tool_call("search_logs", arguments.clone())]);
        }
        self.turns
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Turn::text("script exhausted"))
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn model(&self) -> &str {
        "scripted"
    }

    async fn stream_message(
        &self,
        messages: Vec<Message>,
        system: Option<String>,
        tools: Vec<ToolDefinition>,
        tx: mpsc::Sender<ModelStreamEvent>,
    ) -> LlmResult<LlmResponse> {
        self.seen.lock().unwrap().push(SeenRequest {
            system,
            user: messages
                .iter()
                .map(|m| m.content.as_str())
                .collect::<Vec<_>>()
                .join("\n"),
            tools: tools.iter().map(|t| t.name.clone()).collect(),
        });
        let turn = self.next_turn();
        for delta in turn.deltas {
            let _ = tx.send(ModelStreamEvent::TextDelta { content: delta }).await;
        }
        let last = match &turn.result {
            Ok(response) => ModelStreamEvent::Complete {
                stop_reason: Some(format!("{:?}", response.stop_reason)),
            },
            Err(e) => ModelStreamEvent::Error {
                message: e.to_string(),
                code: None,
            },
        };
        let _ = tx.send(last).await;
        turn.result
    }
}

// ============================================================================
// Retrieval sources
// ============================================================================

pub fn log_record(service: &str, message: &str) -> LogRecord {
    LogRecord {
        timestamp: ts(11),
        service: service.to_string(),
        level: Some("error".to_string()),
        message: message.to_string(),
        attributes: serde_json::Map::new(),
    }
}

/// Returns scripted results in order, then empty result sets.
#[derive(Default)]
pub struct MockLogSource {
    results: Mutex<VecDeque<RetrievalResult<Vec<LogRecord>>>>,
    queries: Mutex<Vec<LogSearchInput>>,
    labels: FacetLabels,
    cancel_on_search: Option<CancellationToken>,
}

impl MockLogSource {
    pub fn new(results: Vec<RetrievalResult<Vec<LogRecord>>>) -> Self {
        Self {
            results: Mutex::new(results.into()),
            ..Self::default()
        }
    }

    pub fn with_labels(mut self, labels: FacetLabels) -> Self {
        self.labels = labels;
        self
    }

    /// Cancel `token` while the first search is in flight.
    pub fn cancelling(mut self, token: CancellationToken) -> Self {
        self.cancel_on_search = Some(token);
        self
    }

    pub fn queries(&self) -> Vec<LogSearchInput> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl LogSource for MockLogSource {
    async fn search_logs(&self, input: &LogSearchInput) -> RetrievalResult<Vec<LogRecord>> {
        self.queries.lock().unwrap().push(input.clone());
        if let Some(token) = &self.cancel_on_search {
            token.cancel();
        }
        self.results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(vec![]))
    }

    async fn list_facets(
        &self,
        _start: DateTime<Utc>,
        _end: DateTime<Utc>,
    ) -> RetrievalResult<FacetLabels> {
        Ok(self.labels.clone())
    }
}

#[derive(Default)]
pub struct MockCodeSource {
    matches: Vec<CodeMatch>,
    queries: Mutex<Vec<CodeSearchInput>>,
}

impl MockCodeSource {
    pub fn new(matches: Vec<CodeMatch>) -> Self {
        Self {
            matches,
            ..Self::default()
        }
    }

    pub fn queries(&self) -> Vec<CodeSearchInput> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl CodeSource for MockCodeSource {
    async fn search_code(&self, input: &CodeSearchInput) -> RetrievalResult<Vec<CodeMatch>> {
        self.queries.lock().unwrap().push(input.clone());
        Ok(self.matches.clone())
    }
}

/// Drain every update currently buffered in `rx`.
pub fn drain(rx: &mut mpsc::Receiver<StreamUpdate>) -> Vec<StreamUpdate> {
    let mut updates = Vec::new();
    while let Ok(update) = rx.try_recv() {
        updates.push(update);
    }
    updates
}
