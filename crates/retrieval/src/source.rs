//! Retrieval Source Traits
//!
//! Capability interfaces for the observability platform and code search. The
//! triage engines only depend on these traits; clients for specific platforms
//! are supplied by the host.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use incident_triage_core::step::{CodeMatch, CodeSearchInput, LogRecord, LogSearchInput};

use crate::error::RetrievalResult;
use crate::labels::FacetLabels;

/// Log and trace search over an observability platform.
#[async_trait]
pub trait LogSource: Send + Sync {
    /// Run a structured log query.
    async fn search_logs(&self, input: &LogSearchInput) -> RetrievalResult<Vec<LogRecord>>;

    /// Enumerate filterable facet values (services, levels, ...) seen in a time range.
    async fn list_facets(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> RetrievalResult<FacetLabels>;
}

/// Search over the system's source code.
#[async_trait]
pub trait CodeSource: Send + Sync {
    async fn search_code(&self, input: &CodeSearchInput) -> RetrievalResult<Vec<CodeMatch>>;
}
