//! Search Domains
//!
//! A `SearchDomain` specialises the retrieval engine for one kind of evidence:
//! which tool the model is offered, how a query is executed, how results are
//! shown back to the model, and which stream updates carry its progress.

use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::warn;

use incident_triage_core::step::{
    CodeMatch, CodeSearchInput, CodeToolCall, LogRecord, LogSearchInput, LogToolCall,
    ToolCallResult,
};
use incident_triage_core::update::UpdatePayload;
use incident_triage_llm::types::ToolDefinition;
use incident_triage_retrieval::{
    search_code_tool, search_logs_tool, CodeSource, FacetLabels, LogSource, RetrievalResult,
};

use crate::models::settings::FallbackSettings;

/// One executed query of domain `D`.
pub type SearchStep<D> = ToolCallResult<<D as SearchDomain>::Input, <D as SearchDomain>::Record>;

/// What the engine knows when it has to invent a query itself.
#[derive(Debug, Clone, Copy)]
pub struct FallbackContext<'a> {
    pub user_query: &'a str,
    pub labels: &'a FacetLabels,
    pub now: DateTime<Utc>,
    /// Display form of the inference error that triggered the fallback
    pub error: &'a str,
}

#[async_trait]
pub trait SearchDomain: Send + Sync + Sized {
    type Input: Debug + Clone + Serialize + DeserializeOwned + Send + Sync + 'static;
    type Record: Debug + Clone + Serialize + Send + Sync + 'static;

    /// Human-readable name used in prompts and logs, e.g. "log search".
    fn label(&self) -> &'static str;

    /// The single tool offered to the model.
    fn tool(&self) -> ToolDefinition;

    /// Run the query against the retrieval collaborator.
    async fn execute(&self, input: &Self::Input) -> RetrievalResult<Vec<Self::Record>>;

    /// A broad query used when the model call fails.
    fn fallback_query(&self, ctx: &FallbackContext<'_>) -> Self::Input;

    /// Facet labels to show the model when the caller supplied none.
    async fn discover_labels(&self, _now: DateTime<Utc>) -> FacetLabels {
        FacetLabels::new()
    }

    /// Model reasoning text streamed into this domain's step.
    fn chunk_payload(chunk: String) -> UpdatePayload;

    /// Snapshot of every query executed so far in this run.
    fn tools_payload(calls: Vec<SearchStep<Self>>) -> UpdatePayload;

    /// One-line rendering of a query for prompts.
    fn describe_query(input: &Self::Input) -> String;

    /// One-line rendering of a result record for prompts.
    fn describe_record(record: &Self::Record) -> String;

    /// The model's stated reason for a query.
    fn query_reasoning(input: &Self::Input) -> &str;
}

// ============================================================================
// Log search
// ============================================================================

/// Log and trace search over the observability platform.
pub struct LogSearchDomain {
    source: Arc<dyn LogSource>,
    fallback: FallbackSettings,
}

impl LogSearchDomain {
    pub fn new(source: Arc<dyn LogSource>, fallback: FallbackSettings) -> Self {
        Self { source, fallback }
    }
}

#[async_trait]
impl SearchDomain for LogSearchDomain {
    type Input = LogSearchInput;
    type Record = LogRecord;

    fn label(&self) -> &'static str {
        "log search"
    }

    fn tool(&self) -> ToolDefinition {
        search_logs_tool()
    }

    async fn execute(&self, input: &LogSearchInput) -> RetrievalResult<Vec<LogRecord>> {
        self.source.search_logs(input).await
    }

    async fn discover_labels(&self, now: DateTime<Utc>) -> FacetLabels {
        let start = now - Duration::hours(self.fallback.window_hours);
        match self.source.list_facets(start, now).await {
            Ok(labels) => labels,
            Err(e) => {
                warn!(error = %e, "listing log facets failed; prompting without labels");
                FacetLabels::new()
            }
        }
    }

    fn fallback_query(&self, ctx: &FallbackContext<'_>) -> LogSearchInput {
        let services: &[String] = if self.fallback.services.is_empty() {
            ctx.labels.services()
        } else {
            &self.fallback.services
        };
        let query = if services.is_empty() {
            "*".to_string()
        } else {
            services
                .iter()
                .map(|s| format!("service:{}", s))
                .collect::<Vec<_>>()
                .join(" OR ")
        };
        LogSearchInput {
            query,
            start: ctx.now - Duration::hours(self.fallback.window_hours),
            end: ctx.now,
            limit: self.fallback.limit,
            page_cursor: None,
            reasoning: format!(
                "Model call failed ({}); falling back to an unfiltered search across known \
                 services over the last {} hours.",
                ctx.error, self.fallback.window_hours
            ),
        }
    }

    fn chunk_payload(chunk: String) -> UpdatePayload {
        UpdatePayload::LogSearchChunk { chunk }
    }

    fn tools_payload(calls: Vec<LogToolCall>) -> UpdatePayload {
        UpdatePayload::LogSearchTools { tools: calls }
    }

    fn describe_query(input: &LogSearchInput) -> String {
        let mut line = format!(
            "query=\"{}\" start={} end={} limit={}",
            input.query,
            input.start.to_rfc3339(),
            input.end.to_rfc3339(),
            input.limit
        );
        if let Some(cursor) = &input.page_cursor {
            line.push_str(&format!(" cursor={}", cursor));
        }
        line
    }

    fn describe_record(record: &LogRecord) -> String {
        let mut line = format!(
            "[{}] {} {}: {}",
            record.timestamp.to_rfc3339(),
            record.service,
            record.level.as_deref().unwrap_or("-"),
            record.message
        );
        if !record.attributes.is_empty() {
            line.push(' ');
            line.push_str(&serde_json::Value::Object(record.attributes.clone()).to_string());
        }
        line
    }

    fn query_reasoning(input: &LogSearchInput) -> &str {
        &input.reasoning
    }
}

// ============================================================================
// Code search
// ============================================================================

/// Search over the system's repositories.
pub struct CodeSearchDomain {
    source: Arc<dyn CodeSource>,
    fallback: FallbackSettings,
}

impl CodeSearchDomain {
    pub fn new(source: Arc<dyn CodeSource>, fallback: FallbackSettings) -> Self {
        Self { source, fallback }
    }
}

#[async_trait]
impl SearchDomain for CodeSearchDomain {
    type Input = CodeSearchInput;
    type Record = CodeMatch;

    fn label(&self) -> &'static str {
        "code search"
    }

    fn tool(&self) -> ToolDefinition {
        search_code_tool()
    }

    async fn execute(&self, input: &CodeSearchInput) -> RetrievalResult<Vec<CodeMatch>> {
        self.source.search_code(input).await
    }

    fn fallback_query(&self, ctx: &FallbackContext<'_>) -> CodeSearchInput {
        let repository = match self.fallback.repositories.as_slice() {
            [only] => Some(only.clone()),
            _ => None,
        };
        CodeSearchInput {
            query: ctx.user_query.to_string(),
            repository,
            path_glob: None,
            limit: self.fallback.limit,
            page_cursor: None,
            reasoning: format!(
                "Model call failed ({}); falling back to an unfiltered search for the \
                 question text.",
                ctx.error
            ),
        }
    }

    fn chunk_payload(chunk: String) -> UpdatePayload {
        UpdatePayload::CodeSearchChunk { chunk }
    }

    fn tools_payload(calls: Vec<CodeToolCall>) -> UpdatePayload {
        UpdatePayload::CodeSearchTools { tools: calls }
    }

    fn describe_query(input: &CodeSearchInput) -> String {
        let mut line = format!("query=\"{}\" limit={}", input.query, input.limit);
        if let Some(repo) = &input.repository {
            line.push_str(&format!(" repository={}", repo));
        }
        if let Some(glob) = &input.path_glob {
            line.push_str(&format!(" path={}", glob));
        }
        if let Some(cursor) = &input.page_cursor {
            line.push_str(&format!(" cursor={}", cursor));
        }
        line
    }

    fn describe_record(record: &CodeMatch) -> String {
        let location = match record.line {
            Some(line) => format!("{}/{}:{}", record.repository, record.path, line),
            None => format!("{}/{}", record.repository, record.path),
        };
        format!("{}\n{}", location, record.snippet)
    }

    fn query_reasoning(input: &CodeSearchInput) -> &str {
        &input.reasoning
    }
}
