//! Retrieval Sub-Agent Integration Tests
//!
//! Drives the log and code search agents against a scripted model and
//! in-memory retrieval sources.

use std::sync::Arc;

use chrono::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use incident_triage::models::settings::FallbackSettings;
use incident_triage::services::subagent::{
    CodeSearchAgent, CodeSearchDomain, LogSearchAgent, LogSearchDomain, SubAgentRequest,
    Termination,
};
use incident_triage::services::UpdateEmitter;
use incident_triage_core::error::{ContractViolation, CoreError};
use incident_triage_core::reducer::{reduce_all, Answer};
use incident_triage_core::step::{CodeMatch, RetrievalResults, StepKind};
use incident_triage_core::update::UpdatePayload;
use incident_triage_llm::types::LlmError;
use incident_triage_retrieval::{FacetLabels, RetrievalError};

use crate::support::{
    code_query_args, drain, log_query_args, log_record, tool_call, MockCodeSource,
    MockLogSource, ScriptedProvider, Turn,
};

fn log_agent(provider: &Arc<ScriptedProvider>, source: &Arc<MockLogSource>) -> LogSearchAgent {
    let domain = LogSearchDomain::new(source.clone(), FallbackSettings::default());
    LogSearchAgent::new(domain, provider.clone())
}

fn request(max_iterations: u32) -> SubAgentRequest<LogSearchDomain> {
    SubAgentRequest::new(
        "Why did checkout fail at 11:00?",
        "Find errors in checkout around 11:00",
        max_iterations,
    )
}

// ============================================================================
// Budget and termination
// ============================================================================

#[tokio::test]
async fn test_single_iteration_budget_runs_one_retrieval() {
    let provider = Arc::new(ScriptedProvider::always_searching(log_query_args(
        "service:checkout level:error",
    )));
    let source = Arc::new(MockLogSource::new(vec![Ok(vec![log_record(
        "checkout",
        "payment declined",
    )])]));

    let outcome = log_agent(&provider, &source)
        .run(request(1), &UpdateEmitter::disabled())
        .await
        .unwrap();

    assert_eq!(outcome.new_steps.len(), 1);
    assert_eq!(outcome.termination, Termination::MaxIterations);
    assert_eq!(provider.calls(), 1);
    assert_eq!(source.queries().len(), 1);
    assert_eq!(
        outcome.new_steps[0].input.query,
        "service:checkout level:error"
    );
    assert_eq!(outcome.new_steps[0].results.records().map(|r| r.len()), Some(1));
}

#[tokio::test]
async fn test_no_tool_call_on_first_iteration_completes_without_retrieval() {
    let provider = Arc::new(ScriptedProvider::new(vec![Turn::streamed(&[
        "Nothing ",
        "to search.",
    ])]));
    let source = Arc::new(MockLogSource::default());

    let outcome = log_agent(&provider, &source)
        .run(request(5), &UpdateEmitter::disabled())
        .await
        .unwrap();

    assert!(outcome.new_steps.is_empty());
    assert_eq!(
        outcome.termination,
        Termination::TaskComplete {
            reasoning: "Nothing to search.".to_string()
        }
    );
    assert!(source.queries().is_empty());
    assert_eq!(provider.calls(), 1);
}

#[tokio::test]
async fn test_model_calls_never_exceed_budget_when_retrieval_keeps_failing() {
    let provider = Arc::new(ScriptedProvider::always_searching(log_query_args("x")));
    let source = Arc::new(MockLogSource::new(vec![
        Err(RetrievalError::Timeout),
        Err(RetrievalError::backend("connection reset")),
        Err(RetrievalError::Timeout),
        Err(RetrievalError::RateLimited("slow down".to_string())),
        Err(RetrievalError::Timeout),
        Err(RetrievalError::Timeout),
    ]));

    let outcome = log_agent(&provider, &source)
        .run(request(4), &UpdateEmitter::disabled())
        .await
        .unwrap();

    assert_eq!(provider.calls(), 4);
    assert_eq!(source.queries().len(), 4);
    assert_eq!(outcome.new_steps.len(), 4);
    assert_eq!(outcome.termination, Termination::MaxIterations);
    assert_eq!(
        outcome.new_steps[1].results,
        RetrievalResults::Failed("connection reset".to_string())
    );
}

// ============================================================================
// Retrieval failure recovery
// ============================================================================

#[tokio::test]
async fn test_timeout_is_recorded_and_visible_to_next_prompt() {
    let provider = Arc::new(ScriptedProvider::new(vec![
        Turn::calls(vec![tool_call("search_logs", log_query_args("level:error"))]),
        Turn::calls(vec![tool_call(
            "search_logs",
            log_query_args("service:checkout level:error"),
        )]),
        Turn::text("Found the declines."),
    ]));
    let source = Arc::new(MockLogSource::new(vec![
        Err(RetrievalError::Timeout),
        Ok(vec![log_record("checkout", "payment declined")]),
    ]));

    let outcome = log_agent(&provider, &source)
        .run(request(3), &UpdateEmitter::disabled())
        .await
        .unwrap();

    assert_eq!(outcome.new_steps.len(), 2);
    assert_eq!(
        outcome.new_steps[0].results,
        RetrievalResults::Failed("timeout".to_string())
    );
    assert!(matches!(
        outcome.termination,
        Termination::TaskComplete { .. }
    ));

    let seen = provider.seen();
    assert_eq!(seen.len(), 3);
    assert!(!seen[0].user.contains("## Most recent result"));
    assert!(seen[1].user.contains("Retrieval failed: timeout"));
    assert!(seen[1].user.contains("outcome: failed: timeout"));
    assert!(seen[1].user.contains("You have 2 queries remaining."));
    assert!(seen[2].user.contains("1 results:"));
    assert!(seen[2].user.contains("payment declined"));
}

// ============================================================================
// Model inference failure
// ============================================================================

#[tokio::test]
async fn test_inference_failure_uses_fallback_query() {
    let provider = Arc::new(ScriptedProvider::new(vec![
        Turn::failure(LlmError::NetworkError {
            message: "connection refused".to_string(),
        }),
        Turn::text("done"),
    ]));
    let labels = FacetLabels::new().with_facet("service", ["checkout", "payments"]);
    let source = Arc::new(MockLogSource::new(vec![Ok(vec![])]).with_labels(labels.clone()));

    let outcome = log_agent(&provider, &source)
        .run(request(3).with_labels(labels), &UpdateEmitter::disabled())
        .await
        .unwrap();

    assert_eq!(outcome.new_steps.len(), 1);
    let fallback = &outcome.new_steps[0].input;
    assert_eq!(fallback.query, "service:checkout OR service:payments");
    assert_eq!(fallback.end - fallback.start, Duration::hours(24));
    assert!(fallback.reasoning.contains("connection refused"));
    assert_eq!(source.queries()[0].query, fallback.query);
}

// ============================================================================
// Contract violations
// ============================================================================

#[tokio::test]
async fn test_multiple_tool_calls_fail_fast() {
    let provider = Arc::new(ScriptedProvider::new(vec![Turn::calls(vec![
        tool_call("search_logs", log_query_args("a")),
        tool_call("search_logs", log_query_args("b")),
    ])]));
    let source = Arc::new(MockLogSource::default());

    let err = log_agent(&provider, &source)
        .run(request(3), &UpdateEmitter::disabled())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        CoreError::ContractViolation(ContractViolation::TooManyToolCalls {
            expected: 1,
            actual: 2
        })
    ));
    assert!(source.queries().is_empty());
}

#[tokio::test]
async fn test_wrong_tool_is_contract_violation() {
    let provider = Arc::new(ScriptedProvider::new(vec![Turn::calls(vec![tool_call(
        "search_code",
        code_query_args("x"),
    )])]));
    let source = Arc::new(MockLogSource::default());

    let err = log_agent(&provider, &source)
        .run(request(3), &UpdateEmitter::disabled())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        CoreError::ContractViolation(ContractViolation::UnknownTool { .. })
    ));
}

#[tokio::test]
async fn test_malformed_arguments_are_contract_violation() {
    let provider = Arc::new(ScriptedProvider::new(vec![Turn::calls(vec![tool_call(
        "search_logs",
        serde_json::json!({ "query": "x" }),
    )])]));
    let source = Arc::new(MockLogSource::default());

    let err = log_agent(&provider, &source)
        .run(request(3), &UpdateEmitter::disabled())
        .await
        .unwrap_err();

    assert!(err.is_contract_violation());
    assert!(matches!(
        err,
        CoreError::ContractViolation(ContractViolation::InvalidToolArguments { .. })
    ));
}

// ============================================================================
// Cancellation
// ============================================================================

#[tokio::test]
async fn test_cancelled_before_start_makes_no_model_call() {
    let provider = Arc::new(ScriptedProvider::always_searching(log_query_args("x")));
    let source = Arc::new(MockLogSource::default());
    let cancel = CancellationToken::new();
    cancel.cancel();

    let outcome = log_agent(&provider, &source)
        .with_cancellation(cancel)
        .run(request(3), &UpdateEmitter::disabled())
        .await
        .unwrap();

    assert_eq!(outcome.termination, Termination::Cancelled);
    assert!(outcome.new_steps.is_empty());
    assert_eq!(provider.calls(), 0);
}

#[tokio::test]
async fn test_cancellation_lets_in_flight_retrieval_finish() {
    let cancel = CancellationToken::new();
    let provider = Arc::new(ScriptedProvider::always_searching(log_query_args("x")));
    let source = Arc::new(MockLogSource::default().cancelling(cancel.clone()));

    let outcome = log_agent(&provider, &source)
        .with_cancellation(cancel)
        .run(request(5), &UpdateEmitter::disabled())
        .await
        .unwrap();

    assert_eq!(outcome.termination, Termination::Cancelled);
    assert_eq!(outcome.new_steps.len(), 1);
    assert_eq!(provider.calls(), 1);
}

#[tokio::test]
async fn test_labels_are_discovered_when_request_has_none() {
    let provider = Arc::new(ScriptedProvider::new(vec![
        Turn::failure(LlmError::NetworkError {
            message: "connection refused".to_string(),
        }),
        Turn::text("done"),
    ]));
    let labels = FacetLabels::new().with_facet("service", ["checkout", "payments"]);
    let source = Arc::new(MockLogSource::new(vec![Ok(vec![])]).with_labels(labels));

    let outcome = log_agent(&provider, &source)
        .run(request(3), &UpdateEmitter::disabled())
        .await
        .unwrap();

    assert!(provider.seen()[0]
        .user
        .contains("## Available labels\n- service: checkout, payments"));
    assert_eq!(
        outcome.new_steps[0].input.query,
        "service:checkout OR service:payments"
    );
}

// ============================================================================
// History and updates
// ============================================================================

#[tokio::test]
async fn test_reused_agent_reports_each_run_to_its_own_step() {
    let provider = Arc::new(ScriptedProvider::new(vec![
        Turn::calls(vec![tool_call("search_logs", log_query_args("service:checkout"))]),
        Turn::text("Checkout covered."),
        Turn::calls(vec![tool_call("search_logs", log_query_args("service:payments"))]),
        Turn::text("Payments covered."),
    ]));
    let source = Arc::new(MockLogSource::new(vec![
        Ok(vec![log_record("checkout", "declined")]),
        Ok(vec![log_record("payments", "pool exhausted")]),
    ]));
    let (tx, mut rx) = mpsc::channel(256);
    let emitter = UpdateEmitter::new(tx);
    let agent = log_agent(&provider, &source);

    let first = agent.run(request(3), &emitter).await.unwrap();
    let second = agent.run(request(3), &emitter).await.unwrap();
    assert_ne!(first.step_id, second.step_id);
    assert!(format!("{:?}", second).contains("TaskComplete"));

    let answer = reduce_all(&Answer::new(), &drain(&mut rx)).unwrap();
    assert_eq!(answer.len(), 2);
    for (outcome, query) in [(&first, "service:checkout"), (&second, "service:payments")] {
        match &answer.step(&outcome.step_id).unwrap().kind {
            StepKind::LogSearch { data, .. } => {
                assert_eq!(data.len(), 1);
                assert_eq!(data[0].input.query, query);
            }
            other => panic!("unexpected step kind {:?}", other),
        }
    }
}

#[tokio::test]
async fn test_prior_history_is_prompted_but_not_returned() {
    let provider = Arc::new(ScriptedProvider::always_searching(log_query_args("x")));
    let source = Arc::new(MockLogSource::default());
    let first = log_agent(&provider, &source)
        .run(request(1), &UpdateEmitter::disabled())
        .await
        .unwrap();

    let provider = Arc::new(ScriptedProvider::new(vec![Turn::text("enough")]));
    let outcome = log_agent(&provider, &source)
        .run(
            request(2).with_history(first.new_steps),
            &UpdateEmitter::disabled(),
        )
        .await
        .unwrap();

    assert!(outcome.new_steps.is_empty());
    let seen = provider.seen();
    assert!(seen[0].user.contains("1. query=\"x\""));
    assert!(!seen[0].user.contains("## Most recent result"));
}

#[tokio::test]
async fn test_emitted_updates_materialize_search_step() {
    let provider = Arc::new(ScriptedProvider::new(vec![
        Turn::thinking_then_calls(
            "Checking checkout errors. ",
            vec![tool_call("search_logs", log_query_args("service:checkout"))],
        ),
        Turn::thinking_then_calls(
            "Narrowing to payments. ",
            vec![tool_call("search_logs", log_query_args("service:payments"))],
        ),
        Turn::streamed(&["Enough ", "evidence."]),
    ]));
    let source = Arc::new(MockLogSource::new(vec![
        Ok(vec![log_record("checkout", "declined")]),
        Err(RetrievalError::Timeout),
    ]));
    let (tx, mut rx) = mpsc::channel(256);
    let emitter = UpdateEmitter::new(tx).with_parent("answer-1");

    let outcome = log_agent(&provider, &source)
        .run(request(5).with_step_id("logs-1"), &emitter)
        .await
        .unwrap();
    assert_eq!(outcome.step_id, "logs-1");

    let updates = drain(&mut rx);
    assert!(updates.iter().all(|u| u.id == "logs-1"));
    assert!(updates
        .iter()
        .all(|u| u.parent_id.as_deref() == Some("answer-1")));
    let tool_snapshots = updates
        .iter()
        .filter(|u| matches!(u.payload, UpdatePayload::LogSearchTools { .. }))
        .count();
    assert_eq!(tool_snapshots, 2);

    let answer = reduce_all(&Answer::new(), &updates).unwrap();
    assert_eq!(answer.len(), 1);
    match &answer.step("logs-1").unwrap().kind {
        StepKind::LogSearch { reasoning, data } => {
            assert_eq!(
                reasoning,
                "Checking checkout errors. Narrowing to payments. Enough evidence."
            );
            assert_eq!(data, &outcome.new_steps);
            assert_eq!(data[1].results.error(), Some("timeout"));
        }
        other => panic!("unexpected step kind {:?}", other),
    }
}

// ============================================================================
// Code search instance
// ============================================================================

#[tokio::test]
async fn test_code_search_agent_runs_code_queries() {
    let provider = Arc::new(ScriptedProvider::new(vec![
        Turn::calls(vec![tool_call("search_code", code_query_args("PaymentTimeout"))]),
        Turn::text("Located the thrower."),
    ]));
    let source = Arc::new(MockCodeSource::new(vec![CodeMatch {
        repository: "payments".to_string(),
        path: "src/client.rs".to_string(),
        line: Some(42),
        snippet: "return Err(PaymentTimeout)".to_string(),
    }]));
    let domain = CodeSearchDomain::new(source.clone(), FallbackSettings::default());
    let agent = CodeSearchAgent::new(domain, provider.clone());

    let outcome = agent
        .run(
            SubAgentRequest::new("why timeouts?", "Find where PaymentTimeout is raised", 3)
                .with_system_overview("payments is a Rust service"),
            &UpdateEmitter::disabled(),
        )
        .await
        .unwrap();

    assert_eq!(outcome.new_steps.len(), 1);
    assert_eq!(outcome.new_steps[0].input.repository.as_deref(), Some("payments"));
    assert_eq!(outcome.new_steps[0].input.limit, 20);
    assert_eq!(source.queries().len(), 1);

    let seen = provider.seen();
    assert_eq!(seen[0].tools, vec!["search_code".to_string()]);
    assert!(seen[0]
        .system
        .as_deref()
        .is_some_and(|s| s.contains("code search specialist")));
    assert!(seen[0].user.contains("payments is a Rust service"));
    assert!(seen[1].user.contains("payments/src/client.rs:42"));
}
