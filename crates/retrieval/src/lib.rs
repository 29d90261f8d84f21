//! Incident Triage Retrieval
//!
//! Retrieval collaborator contracts and the tool-call contract:
//! - `LogSource` / `CodeSource` - capability traits for the observability platform and code search
//! - `FacetLabels` - filter labels enumerated for a time range
//! - `search_logs_tool` / `search_code_tool` - tool schemas offered to the model
//! - `RetrievalRequest` - validated, typed tool invocations

pub mod contract;
pub mod error;
pub mod labels;
pub mod source;
pub mod tools;

pub use contract::{at_most_one_call, parse_arguments, parse_retrieval_requests, RetrievalRequest};
pub use error::{RetrievalError, RetrievalResult};
pub use labels::{FacetLabels, SERVICE_FACET};
pub use source::{CodeSource, LogSource};
pub use tools::{search_code_tool, search_logs_tool, SEARCH_CODE, SEARCH_LOGS};
