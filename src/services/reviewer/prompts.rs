//! Reviewer prompts.

use incident_triage_core::step::{Fact, RetrievalResults, Step, StepKind, ToolCallResult};
use incident_triage_llm::types::{Message, MessageRole};
use incident_triage_retrieval::FacetLabels;

use crate::models::settings::PromptSettings;
use crate::services::subagent::{CodeSearchDomain, LogSearchDomain, SearchDomain};
use crate::utils::text::truncate_chars;

pub(crate) const REVIEWER_SYSTEM_PROMPT: &str = "\
You review draft answers produced by an incident-triage assistant before they reach the engineer.

Check the draft against the evidence gathered so far:
- Every claim must be supported by a retrieved log, trace, or code result.
- Root-cause statements must not go beyond what the evidence shows.
- Obvious gaps (a service, time range, or code path the question depends on) must be covered.

If the draft is well supported, reply with a short critique in plain text and call no tools.
If more evidence is needed, call the retrieval tools with precise queries, one call per piece \
of missing evidence, each with a `reasoning` that states which gap it closes.";

/// Inputs rendered into the reviewer's user prompt.
pub(crate) struct ReviewPromptContext<'a> {
    pub query: &'a str,
    pub chat_history: &'a [Message],
    pub steps: &'a [Step],
    pub draft_answer: &'a str,
    pub labels: &'a FacetLabels,
    pub settings: &'a PromptSettings,
}

pub(crate) fn build_review_prompt(ctx: &ReviewPromptContext<'_>) -> String {
    let mut sections = Vec::new();

    if !ctx.chat_history.is_empty() {
        let history = ctx
            .chat_history
            .iter()
            .map(|message| {
                let role = match message.role {
                    MessageRole::User => "user",
                    MessageRole::Assistant => "assistant",
                };
                format!("{}: {}", role, message.content)
            })
            .collect::<Vec<_>>()
            .join("\n");
        sections.push(format!("## Conversation so far\n{}", history));
    }

    sections.push(format!("## User question\n{}", ctx.query));

    let evidence = if ctx.steps.is_empty() {
        "(no evidence gathered)".to_string()
    } else {
        ctx.steps
            .iter()
            .map(|step| render_step(step, ctx.settings.max_result_chars))
            .collect::<Vec<_>>()
            .join("\n\n")
    };
    sections.push(format!("## Evidence\n{}", evidence));

    sections.push(format!(
        "## Available labels\n{}",
        ctx.labels.render(ctx.settings.max_labels_per_facet)
    ));

    sections.push(format!("## Draft answer\n{}", ctx.draft_answer));

    sections.join("\n\n")
}

fn render_step(step: &Step, max_chars: usize) -> String {
    let body = match &step.kind {
        StepKind::Reasoning { data } => data.clone(),
        StepKind::LogSearch { reasoning, data } => {
            render_search::<LogSearchDomain>(reasoning, data, max_chars)
        }
        StepKind::CodeSearch { reasoning, data } => {
            render_search::<CodeSearchDomain>(reasoning, data, max_chars)
        }
        StepKind::LogPostprocessing { data } | StepKind::CodePostprocessing { data } => {
            render_facts(data)
        }
        StepKind::Review { content } => content.clone(),
    };
    format!("### {} ({})\n{}", step.kind.name(), step.id, body)
}

fn render_search<D: SearchDomain>(
    reasoning: &str,
    calls: &[ToolCallResult<D::Input, D::Record>],
    max_chars: usize,
) -> String {
    let mut lines = Vec::new();
    if !reasoning.is_empty() {
        lines.push(reasoning.to_string());
    }
    for call in calls {
        lines.push(format!("- {}", D::describe_query(&call.input)));
        match &call.results {
            RetrievalResults::Failed(error) => lines.push(format!("  failed: {}", error)),
            RetrievalResults::Records(records) => {
                let body = records
                    .iter()
                    .map(D::describe_record)
                    .collect::<Vec<_>>()
                    .join("\n");
                lines.push(format!(
                    "  {} results\n{}",
                    records.len(),
                    truncate_chars(&body, max_chars)
                ));
            }
        }
    }
    lines.join("\n")
}

fn render_facts(facts: &[Fact]) -> String {
    facts
        .iter()
        .map(|f| {
            if f.citations.is_empty() {
                format!("- {}", f.fact)
            } else {
                format!("- {} [{}]", f.fact, f.citations.join(", "))
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}
