//! Facet Labels
//!
//! Filter labels available in a time range, grouped by facet (`service`,
//! `level`, `env`, ...). Rendered into prompts so the model only filters on
//! values that actually exist.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Facet name used for service labels.
pub const SERVICE_FACET: &str = "service";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FacetLabels(BTreeMap<String, Vec<String>>);

impl FacetLabels {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a facet with its values, replacing any previous values.
    pub fn with_facet(
        mut self,
        facet: impl Into<String>,
        values: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        self.0
            .insert(facet.into(), values.into_iter().map(Into::into).collect());
        self
    }

    pub fn values(&self, facet: &str) -> &[String] {
        self.0.get(facet).map(Vec::as_slice).unwrap_or_default()
    }

    /// Known service names.
    pub fn services(&self) -> &[String] {
        self.values(SERVICE_FACET)
    }

    pub fn is_empty(&self) -> bool {
        self.0.values().all(Vec::is_empty)
    }

    /// Render as one `facet: a, b, c` line per facet, truncating long value lists.
    pub fn render(&self, max_values_per_facet: usize) -> String {
        if self.is_empty() {
            return "(no labels available)".to_string();
        }
        self.0
            .iter()
            .filter(|(_, values)| !values.is_empty())
            .map(|(facet, values)| {
                let shown: Vec<&str> = values
                    .iter()
                    .take(max_values_per_facet)
                    .map(String::as_str)
                    .collect();
                let hidden = values.len().saturating_sub(shown.len());
                if hidden > 0 {
                    format!("- {}: {} (+{} more)", facet, shown.join(", "), hidden)
                } else {
                    format!("- {}: {}", facet, shown.join(", "))
                }
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}
