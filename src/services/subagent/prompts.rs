//! Retrieval Sub-Agent Prompts
//!
//! Each iteration sends the model the question, the retrieval objective, every
//! query issued so far (so it does not repeat itself), the full body of the most
//! recent result, the available labels, and the remaining query budget.

use incident_triage_core::step::RetrievalResults;
use incident_triage_retrieval::FacetLabels;

use super::domain::{SearchDomain, SearchStep};
use crate::models::settings::PromptSettings;
use crate::utils::text::truncate_chars;

/// Everything needed to render one iteration's prompt.
pub(crate) struct PromptContext<'a, D: SearchDomain> {
    pub user_query: &'a str,
    pub objective: &'a str,
    pub system_overview: &'a str,
    pub labels: &'a FacetLabels,
    pub previous: &'a [SearchStep<D>],
    pub last: Option<&'a SearchStep<D>>,
    /// 1-based number of the query about to be chosen
    pub iteration: u32,
    pub max_iterations: u32,
    pub settings: &'a PromptSettings,
}

impl<D: SearchDomain> PromptContext<'_, D> {
    /// Queries left including the one about to be chosen.
    pub fn remaining(&self) -> u32 {
        self.max_iterations.saturating_sub(self.iteration - 1)
    }
}

pub(crate) fn build_system_prompt<D: SearchDomain>(domain: &D) -> String {
    let tool = domain.tool();
    format!(
        "You are the {label} specialist of an incident-triage assistant. You gather evidence \
         for an engineer investigating a production issue.\n\n\
         On each turn, either call the `{tool}` tool exactly once with the next query to run, \
         or, if the evidence gathered so far is sufficient for the objective, reply in plain \
         text with a short summary of what was found and do not call any tool.\n\n\
         Rules:\n\
         1. Never repeat a query that was already issued; refine it instead.\n\
         2. Only filter on labels that appear in the available labels list.\n\
         3. If a query failed, read the error and adjust the next query accordingly.\n\
         4. Always explain in `reasoning` why the query helps.\n\
         5. Pace yourself against the remaining query budget.",
        label = domain.label(),
        tool = tool.name,
    )
}

pub(crate) fn build_user_prompt<D: SearchDomain>(ctx: &PromptContext<'_, D>) -> String {
    let mut sections = Vec::new();

    sections.push(format!("## User question\n{}", ctx.user_query));
    sections.push(format!("## Retrieval objective\n{}", ctx.objective));

    if !ctx.system_overview.trim().is_empty() {
        sections.push(format!("## System overview\n{}", ctx.system_overview.trim()));
    }

    sections.push(format!(
        "## Available labels\n{}",
        ctx.labels.render(ctx.settings.max_labels_per_facet)
    ));

    sections.push(format!(
        "## Previously issued queries\n{}",
        render_history::<D>(ctx.previous, ctx.settings.max_history_entries)
    ));

    if let Some(last) = ctx.last {
        sections.push(format!(
            "## Most recent result\nQuery: {}\n{}",
            D::describe_query(&last.input),
            render_results::<D>(&last.results, ctx.settings.max_result_chars)
        ));
    }

    sections.push(format!(
        "## Budget\nThis is query {} of {}. You have {} queries remaining.",
        ctx.iteration,
        ctx.max_iterations,
        ctx.remaining()
    ));

    sections.join("\n\n")
}

/// Numbered list of prior queries with a one-line outcome each, most recent last.
fn render_history<D: SearchDomain>(previous: &[SearchStep<D>], max_entries: usize) -> String {
    if previous.is_empty() {
        return "(none yet)".to_string();
    }
    let skip = previous.len().saturating_sub(max_entries);
    let mut lines = Vec::new();
    if skip > 0 {
        lines.push(format!("({} earlier queries omitted)", skip));
    }
    for (idx, step) in previous.iter().enumerate().skip(skip) {
        let outcome = match &step.results {
            RetrievalResults::Records(records) => format!("{} results", records.len()),
            RetrievalResults::Failed(error) => format!("failed: {}", error),
        };
        lines.push(format!(
            "{}. {}\n   reasoning: {}\n   outcome: {}",
            idx + 1,
            D::describe_query(&step.input),
            D::query_reasoning(&step.input),
            outcome
        ));
    }
    lines.join("\n")
}

fn render_results<D: SearchDomain>(
    results: &RetrievalResults<D::Record>,
    max_chars: usize,
) -> String {
    match results {
        RetrievalResults::Failed(error) => format!("Retrieval failed: {}", error),
        RetrievalResults::Records(records) if records.is_empty() => "No results.".to_string(),
        RetrievalResults::Records(records) => {
            let body = records
                .iter()
                .map(D::describe_record)
                .collect::<Vec<_>>()
                .join("\n");
            format!(
                "{} results:\n{}",
                records.len(),
                truncate_chars(&body, max_chars)
            )
        }
    }
}
