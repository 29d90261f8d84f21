//! Retrieval Error Types
//!
//! Errors raised by the observability platform or code search backends. The
//! retrieval loop records them as step results instead of propagating them, so
//! the `Display` output is what the model sees in its next prompt.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RetrievalError {
    /// The backend did not answer in time
    #[error("timeout")]
    Timeout,

    /// The backend rejected the query
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    /// The backend throttled the request
    #[error("rate limited: {0}")]
    RateLimited(String),

    /// Any other backend failure, reported verbatim
    #[error("{0}")]
    Backend(String),
}

/// Result type for retrieval operations
pub type RetrievalResult<T> = Result<T, RetrievalError>;

impl RetrievalError {
    /// Create a backend error
    pub fn backend(msg: impl Into<String>) -> Self {
        Self::Backend(msg.into())
    }

    /// Create an invalid query error
    pub fn invalid_query(msg: impl Into<String>) -> Self {
        Self::InvalidQuery(msg.into())
    }
}
