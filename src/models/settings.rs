//! Triage Settings
//!
//! Tunables for the retrieval loop, the inference fallback, and prompt sizing.
//! Loaded from TOML; every section and field is optional and falls back to the
//! defaults below.
//!
//! ```toml
//! [agent]
//! max_iterations = 5
//! review_iterations = 3
//!
//! [fallback]
//! window_hours = 24
//! limit = 100
//! services = ["checkout", "payments"]
//!
//! [prompt]
//! max_result_chars = 4000
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::utils::error::{AppError, AppResult};

/// Upper bound on any iteration budget.
pub const MAX_ITERATION_LIMIT: u32 = 50;

/// Retrieval loop budgets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentSettings {
    /// Model calls allowed per sub-agent run
    pub max_iterations: u32,
    /// Model calls allowed per sub-agent run triggered by a review follow-up
    pub review_iterations: u32,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            max_iterations: 5,
            review_iterations: 3,
        }
    }
}

/// Query synthesized when the model call itself fails.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FallbackSettings {
    /// Look-back window of the fallback log query
    pub window_hours: i64,
    /// Result limit of the fallback query
    pub limit: u32,
    /// Known services; when empty the `service` facet labels are used
    pub services: Vec<String>,
    /// Known repositories for the code search fallback
    pub repositories: Vec<String>,
}

impl Default for FallbackSettings {
    fn default() -> Self {
        Self {
            window_hours: 24,
            limit: 100,
            services: Vec::new(),
            repositories: Vec::new(),
        }
    }
}

/// Prompt sizing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptSettings {
    /// Characters of a single result body embedded in a prompt
    pub max_result_chars: usize,
    /// Previous queries listed in a prompt (most recent kept)
    pub max_history_entries: usize,
    /// Values listed per label facet
    pub max_labels_per_facet: usize,
}

impl Default for PromptSettings {
    fn default() -> Self {
        Self {
            max_result_chars: 4000,
            max_history_entries: 20,
            max_labels_per_facet: 50,
        }
    }
}

/// Top-level triage configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TriageConfig {
    pub agent: AgentSettings,
    pub fallback: FallbackSettings,
    pub prompt: PromptSettings,
}

impl TriageConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(content: &str) -> AppResult<Self> {
        let config: TriageConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse, and validate a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> AppResult<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&content)
    }

    /// Check value ranges.
    pub fn validate(&self) -> AppResult<()> {
        for (name, value) in [
            ("agent.max_iterations", self.agent.max_iterations),
            ("agent.review_iterations", self.agent.review_iterations),
        ] {
            if value == 0 {
                return Err(AppError::config(format!("{} must be > 0", name)));
            }
            if value > MAX_ITERATION_LIMIT {
                return Err(AppError::config(format!(
                    "{} must be <= {}",
                    name, MAX_ITERATION_LIMIT
                )));
            }
        }
        if self.fallback.window_hours <= 0 {
            return Err(AppError::config("fallback.window_hours must be > 0"));
        }
        if self.fallback.limit == 0 {
            return Err(AppError::config("fallback.limit must be > 0"));
        }
        if self.prompt.max_result_chars == 0 {
            return Err(AppError::config("prompt.max_result_chars must be > 0"));
        }
        Ok(())
    }
}

/// Builder for `TriageConfig` with validation at build time.
///
/// # Example
/// ```ignore
/// let config = TriageConfigBuilder::new()
///     .max_iterations(8)
///     .services(["checkout", "payments"])
///     .build()?;
/// ```
#[derive(Debug, Default)]
pub struct TriageConfigBuilder {
    config: TriageConfig,
}

impl TriageConfigBuilder {
    /// Create a new builder with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set model calls per sub-agent run.
    pub fn max_iterations(mut self, n: u32) -> Self {
        self.config.agent.max_iterations = n;
        self
    }

    /// Set model calls per review follow-up run.
    pub fn review_iterations(mut self, n: u32) -> Self {
        self.config.agent.review_iterations = n;
        self
    }

    /// Set the fallback query's look-back window.
    pub fn fallback_window_hours(mut self, hours: i64) -> Self {
        self.config.fallback.window_hours = hours;
        self
    }

    /// Set the known services used by the fallback query.
    pub fn services(mut self, services: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.config.fallback.services = services.into_iter().map(Into::into).collect();
        self
    }

    /// Set the known repositories used by the code search fallback.
    pub fn repositories(mut self, repos: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.config.fallback.repositories = repos.into_iter().map(Into::into).collect();
        self
    }

    /// Set how many characters of a result body a prompt may embed.
    pub fn max_result_chars(mut self, n: usize) -> Self {
        self.config.prompt.max_result_chars = n;
        self
    }

    /// Build and validate the configuration.
    pub fn build(self) -> AppResult<TriageConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
