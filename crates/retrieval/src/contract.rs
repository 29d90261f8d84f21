//! Tool-Call Contract
//!
//! Validates tool invocations emitted by the model against the tools that were
//! offered. Anything off-contract (too many calls, an unknown tool name,
//! arguments that do not fit the query schema) is reported as a
//! `ContractViolation`, never silently dropped.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::error;

use incident_triage_core::error::{ContractViolation, CoreResult};
use incident_triage_core::step::{CodeSearchInput, LogSearchInput};
use incident_triage_llm::types::ToolCall;

use crate::tools::{SEARCH_CODE, SEARCH_LOGS};

/// Deserialize a tool call's arguments into the tool's input type.
///
/// Providers that hand back arguments as a JSON-encoded string are accepted.
pub fn parse_arguments<T: DeserializeOwned>(call: &ToolCall) -> CoreResult<T> {
    let arguments = match &call.arguments {
        Value::String(raw) => serde_json::from_str::<Value>(raw).map_err(|e| {
            ContractViolation::InvalidToolArguments {
                tool: call.name.clone(),
                reason: e.to_string(),
            }
        })?,
        other => other.clone(),
    };
    serde_json::from_value(arguments).map_err(|e| {
        error!(tool = %call.name, error = %e, "tool arguments do not match schema");
        ContractViolation::InvalidToolArguments {
            tool: call.name.clone(),
            reason: e.to_string(),
        }
        .into()
    })
}

/// Accept zero or one call to `tool_name`.
///
/// More than one call, or a call to any other tool, is a contract violation.
pub fn at_most_one_call<'a>(
    calls: &'a [ToolCall],
    tool_name: &str,
) -> CoreResult<Option<&'a ToolCall>> {
    match calls {
        [] => Ok(None),
        [call] if call.name == tool_name => Ok(Some(call)),
        [call] => Err(ContractViolation::UnknownTool {
            name: call.name.clone(),
            allowed: vec![tool_name.to_string()],
        }
        .into()),
        _ => {
            error!(
                expected = 1,
                actual = calls.len(),
                "model emitted more than one tool call"
            );
            Err(ContractViolation::TooManyToolCalls {
                expected: 1,
                actual: calls.len(),
            }
            .into())
        }
    }
}

/// A typed retrieval invocation requested by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "tool", content = "input", rename_all = "snake_case")]
pub enum RetrievalRequest {
    SearchLogs(LogSearchInput),
    SearchCode(CodeSearchInput),
}

impl RetrievalRequest {
    pub fn tool_name(&self) -> &'static str {
        match self {
            Self::SearchLogs(_) => SEARCH_LOGS,
            Self::SearchCode(_) => SEARCH_CODE,
        }
    }

    /// The model's stated reason for this request.
    pub fn reasoning(&self) -> &str {
        match self {
            Self::SearchLogs(input) => &input.reasoning,
            Self::SearchCode(input) => &input.reasoning,
        }
    }

    /// Build a request from a tool call, accepting only whitelisted tool names.
    pub fn from_tool_call(call: &ToolCall, allowed: &[String]) -> CoreResult<Self> {
        if !allowed.iter().any(|name| name == &call.name) {
            error!(tool = %call.name, "model invoked a tool that was not offered");
            return Err(ContractViolation::UnknownTool {
                name: call.name.clone(),
                allowed: allowed.to_vec(),
            }
            .into());
        }
        match call.name.as_str() {
            SEARCH_LOGS => Ok(Self::SearchLogs(parse_arguments(call)?)),
            SEARCH_CODE => Ok(Self::SearchCode(parse_arguments(call)?)),
            other => Err(ContractViolation::UnknownTool {
                name: other.to_string(),
                allowed: vec![SEARCH_LOGS.to_string(), SEARCH_CODE.to_string()],
            }
            .into()),
        }
    }
}

/// Convert every tool call into a typed request, failing on the first violation.
pub fn parse_retrieval_requests(
    calls: &[ToolCall],
    allowed: &[String],
) -> CoreResult<Vec<RetrievalRequest>> {
    calls
        .iter()
        .map(|call| RetrievalRequest::from_tool_call(call, allowed))
        .collect()
}
