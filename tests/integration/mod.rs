//! Integration Tests Module
//!
//! End-to-end tests for the retrieval sub-agents, the reviewer, follow-up
//! dispatch, and answer materialization from the update stream. Model and
//! retrieval collaborators are scripted in-memory doubles.

// Scripted provider and mock retrieval sources
mod support;

// Retrieval loop budgets, failure recovery, fallback, and cancellation
mod subagent_test;
