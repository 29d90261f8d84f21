//! Error Handling
//!
//! Unified error type for the triage services. Engine-level failures arrive as
//! `CoreError` (contract violations, cancellation); configuration loading adds
//! I/O and TOML errors.

use thiserror::Error;

use incident_triage_core::error::CoreError;

/// Application-wide error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// File I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parse errors
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Errors from the core engine layer
    #[error(transparent)]
    Core(#[from] CoreError),
}

/// Result type alias for application errors
pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    /// Create a config error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Whether this error aborts the current answer because the model or update
    /// protocol broke its contract.
    pub fn is_contract_violation(&self) -> bool {
        matches!(self, Self::Core(core) if core.is_contract_violation())
    }
}

/// Convert AppError to a string for hosts that surface plain messages
impl From<AppError> for String {
    fn from(err: AppError) -> String {
        err.to_string()
    }
}
