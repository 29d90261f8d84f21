//! Retrieval Tool Definitions
//!
//! The tool schemas offered to the model. Argument names match the camelCase
//! fields of `LogSearchInput` / `CodeSearchInput`, so a validated call
//! deserializes straight into the query type.

use std::collections::HashMap;

use incident_triage_llm::types::{ParameterSchema, ToolDefinition};

/// Tool name for log search.
pub const SEARCH_LOGS: &str = "search_logs";

/// Tool name for code search.
pub const SEARCH_CODE: &str = "search_code";

/// Definition of the `search_logs` tool.
pub fn search_logs_tool() -> ToolDefinition {
    let mut properties = HashMap::new();
    properties.insert(
        "query".to_string(),
        ParameterSchema::string(Some(
            "Search expression in the observability platform's query syntax",
        )),
    );
    properties.insert(
        "start".to_string(),
        ParameterSchema::date_time(Some("Start of the time range (RFC 3339)")),
    );
    properties.insert(
        "end".to_string(),
        ParameterSchema::date_time(Some("End of the time range (RFC 3339)")),
    );
    properties.insert(
        "limit".to_string(),
        ParameterSchema::integer(Some("Maximum number of log records to return")),
    );
    properties.insert(
        "pageCursor".to_string(),
        ParameterSchema::string(Some("Cursor from a previous page of results")),
    );
    properties.insert(
        "reasoning".to_string(),
        ParameterSchema::string(Some("Why this query helps answer the question")),
    );

    ToolDefinition {
        name: SEARCH_LOGS.to_string(),
        description: "Search logs and traces over a time range. Use the available labels to \
                      filter by service, level, or environment."
            .to_string(),
        input_schema: ParameterSchema::object(
            None,
            properties,
            vec![
                "query".to_string(),
                "start".to_string(),
                "end".to_string(),
                "limit".to_string(),
                "reasoning".to_string(),
            ],
        ),
    }
}

/// Definition of the `search_code` tool.
pub fn search_code_tool() -> ToolDefinition {
    let mut properties = HashMap::new();
    properties.insert(
        "query".to_string(),
        ParameterSchema::string(Some("Text, identifier, or error message to search for")),
    );
    properties.insert(
        "repository".to_string(),
        ParameterSchema::string(Some("Restrict the search to one repository")),
    );
    properties.insert(
        "pathGlob".to_string(),
        ParameterSchema::string(Some("Restrict the search to paths matching this glob")),
    );
    properties.insert(
        "limit".to_string(),
        ParameterSchema::integer(Some("Maximum number of matches to return")),
    );
    properties.insert(
        "pageCursor".to_string(),
        ParameterSchema::string(Some("Cursor from a previous page of results")),
    );
    properties.insert(
        "reasoning".to_string(),
        ParameterSchema::string(Some("Why this search helps answer the question")),
    );

    ToolDefinition {
        name: SEARCH_CODE.to_string(),
        description: "Search the system's source code for identifiers, error strings, or \
                      configuration."
            .to_string(),
        input_schema: ParameterSchema::object(
            None,
            properties,
            vec!["query".to_string(), "reasoning".to_string()],
        ),
    }
}
