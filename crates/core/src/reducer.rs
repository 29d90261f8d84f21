//! Update Reducer
//!
//! Folds stream updates into a materialized `Answer`. `reduce` is pure: it never
//! mutates the answer it is given and always returns a new value. Steps are held
//! behind `Arc`, so a new answer shares every untouched step with the previous one
//! and readers holding an older answer never observe a half-applied update.
//!
//! Merge rules, keyed on the update kind:
//!
//! | update                | new id                         | existing id               |
//! |-----------------------|--------------------------------|---------------------------|
//! | `reasoning-chunk`     | reasoning step, `data = chunk` | append to `data`          |
//! | `*Search-chunk`       | search step, `reasoning=chunk` | append to `reasoning`     |
//! | `*Search-tools`       | search step, `data = tools`    | replace `data`            |
//! | `*Postprocessing`     | insert as-is                   | replace `data`            |
//! | `review`              | review step, `content = chunk` | append to `content`       |
//!
//! A step keeps the position of its first update for the rest of the answer.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ContractViolation, CoreResult};
use crate::step::{Step, StepKind};
use crate::update::{StreamUpdate, UpdatePayload, UPDATE_KINDS};

/// The materialized answer: an ordered list of steps.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Answer {
    steps: Vec<Arc<Step>>,
}

impl Answer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Steps in order of first appearance.
    pub fn steps(&self) -> impl Iterator<Item = &Step> {
        self.steps.iter().map(|s| s.as_ref())
    }

    /// Look up a step by id.
    pub fn step(&self, id: &str) -> Option<&Step> {
        self.steps.iter().find(|s| s.id == id).map(|s| s.as_ref())
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.steps.iter().position(|s| s.id == id)
    }
}

/// Apply one update, producing the next answer.
pub fn reduce(answer: &Answer, update: &StreamUpdate) -> CoreResult<Answer> {
    let mut steps = answer.steps.clone();
    match answer.position(&update.id) {
        Some(idx) => {
            let merged = merge(&steps[idx], update)?;
            steps[idx] = Arc::new(merged);
        }
        None => steps.push(Arc::new(create(update))),
    }
    Ok(Answer { steps })
}

/// Apply a sequence of updates left to right.
pub fn reduce_all<'a, I>(answer: &Answer, updates: I) -> CoreResult<Answer>
where
    I: IntoIterator<Item = &'a StreamUpdate>,
{
    let mut current = answer.clone();
    for update in updates {
        current = reduce(&current, update)?;
    }
    Ok(current)
}

/// Apply an update received as JSON.
///
/// A discriminator outside the known set is a contract violation rather than a
/// plain parse failure.
pub fn reduce_json(answer: &Answer, raw: &str) -> CoreResult<Answer> {
    let value: Value = serde_json::from_str(raw)?;
    let kind = value
        .get("type")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    if !UPDATE_KINDS.contains(&kind.as_str()) {
        return Err(ContractViolation::UnknownUpdateKind { kind }.into());
    }
    let update: StreamUpdate = serde_json::from_value(value)?;
    reduce(answer, &update)
}

fn create(update: &StreamUpdate) -> Step {
    let kind = match &update.payload {
        UpdatePayload::ReasoningChunk { chunk } => StepKind::Reasoning { data: chunk.clone() },
        UpdatePayload::LogSearchChunk { chunk } => StepKind::LogSearch {
            reasoning: chunk.clone(),
            data: Vec::new(),
        },
        UpdatePayload::CodeSearchChunk { chunk } => StepKind::CodeSearch {
            reasoning: chunk.clone(),
            data: Vec::new(),
        },
        UpdatePayload::LogSearchTools { tools } => StepKind::LogSearch {
            reasoning: String::new(),
            data: tools.clone(),
        },
        UpdatePayload::CodeSearchTools { tools } => StepKind::CodeSearch {
            reasoning: String::new(),
            data: tools.clone(),
        },
        UpdatePayload::LogPostprocessing { data } => {
            StepKind::LogPostprocessing { data: data.clone() }
        }
        UpdatePayload::CodePostprocessing { data } => {
            StepKind::CodePostprocessing { data: data.clone() }
        }
        UpdatePayload::Review { chunk } => StepKind::Review {
            content: chunk.clone(),
        },
    };
    Step::new(update.id.clone(), update.timestamp, kind)
}

fn merge(existing: &Step, update: &StreamUpdate) -> CoreResult<Step> {
    let kind = match (&existing.kind, &update.payload) {
        (StepKind::Reasoning { data }, UpdatePayload::ReasoningChunk { chunk }) => {
            StepKind::Reasoning {
                data: concat(data, chunk),
            }
        }
        (StepKind::LogSearch { reasoning, data }, UpdatePayload::LogSearchChunk { chunk }) => {
            StepKind::LogSearch {
                reasoning: concat(reasoning, chunk),
                data: data.clone(),
            }
        }
        (StepKind::LogSearch { reasoning, .. }, UpdatePayload::LogSearchTools { tools }) => {
            StepKind::LogSearch {
                reasoning: reasoning.clone(),
                data: tools.clone(),
            }
        }
        (StepKind::CodeSearch { reasoning, data }, UpdatePayload::CodeSearchChunk { chunk }) => {
            StepKind::CodeSearch {
                reasoning: concat(reasoning, chunk),
                data: data.clone(),
            }
        }
        (StepKind::CodeSearch { reasoning, .. }, UpdatePayload::CodeSearchTools { tools }) => {
            StepKind::CodeSearch {
                reasoning: reasoning.clone(),
                data: tools.clone(),
            }
        }
        (StepKind::LogPostprocessing { .. }, UpdatePayload::LogPostprocessing { data }) => {
            StepKind::LogPostprocessing { data: data.clone() }
        }
        (StepKind::CodePostprocessing { .. }, UpdatePayload::CodePostprocessing { data }) => {
            StepKind::CodePostprocessing { data: data.clone() }
        }
        (StepKind::Review { content }, UpdatePayload::Review { chunk }) => StepKind::Review {
            content: concat(content, chunk),
        },
        (kind, payload) => {
            return Err(ContractViolation::StepKindMismatch {
                step_id: existing.id.clone(),
                step_kind: kind.name().to_string(),
                update_kind: payload.kind().to_string(),
            }
            .into())
        }
    };
    Ok(Step::new(existing.id.clone(), existing.timestamp, kind))
}

fn concat(existing: &str, chunk: &str) -> String {
    let mut out = String::with_capacity(existing.len() + chunk.len());
    out.push_str(existing);
    out.push_str(chunk);
    out
}
