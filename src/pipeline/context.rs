//! Shared turn context
//!
//! One [`TurnContext`] exists per user request. It is created at the start
//! of the turn, mutated in place by each stage through an exclusive
//! reference, and consumed at the end. Only the conversation memory and
//! the last report/result outlive the turn, and those live on the
//! orchestrator.

use serde::{Deserialize, Serialize};

use crate::router::Intent;

/// Per-turn mutable record threaded through all stages.
///
/// Optional fields are filled as stages complete; `answer` is required at
/// pipeline exit and the orchestrator enforces that invariant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnContext {
    /// Current user utterance
    pub question: String,

    /// Last synthesized query text
    pub generated_query: Option<String>,

    /// Last raw result from the query store
    pub query_result: Option<String>,

    /// Last full report artifact
    pub report: Option<String>,

    /// The field surfaced to the user this turn
    pub answer: Option<String>,

    /// The router's decision for this turn
    pub route: Option<Intent>,
}

impl TurnContext {
    /// Create an empty context for a new request
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            generated_query: None,
            query_result: None,
            report: None,
            answer: None,
            route: None,
        }
    }
}
