//! Error types and handling
//!
//! This module provides the error types used throughout the Tidewatch
//! engine. Stage-level failures are collected into [`EngineError`]; the
//! orchestrator wraps them with the offending stage name and question
//! before handing them back to the caller.

use thiserror::Error;

use crate::llm::GenerationError;
use crate::store::StoreError;

/// Main engine error type
///
/// Each variant corresponds to one failure class of the turn pipeline:
///
/// - **Config**: invalid or missing configuration
/// - **ClassificationAmbiguous**: the router could not extract a valid
///   intent label from the generated text
/// - **QueryExecutionFailed**: the query store rejected the synthesized
///   query (malformed SQL is only detectable here, not pre-validated)
/// - **GenerationUnavailable**: the text-generation provider failed
/// - **Persistence**: the session state file could not be written
/// - **Pipeline**: a stage-graph invariant was violated
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Could not extract a route label from classifier output: {raw:?}")]
    ClassificationAmbiguous { raw: String },

    #[error("Query execution failed: {0}")]
    QueryExecutionFailed(#[from] StoreError),

    #[error("Generation unavailable: {0}")]
    GenerationUnavailable(#[from] GenerationError),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Pipeline error: {0}")]
    Pipeline(String),
}

impl EngineError {
    /// Returns whether the error is recoverable by rephrasing or retrying
    /// the turn.
    ///
    /// The engine performs no automatic retry; this informs the caller's
    /// messaging only.
    pub fn is_recoverable(&self) -> bool {
        match self {
            EngineError::Config(_) => false,
            EngineError::ClassificationAmbiguous { .. } => true,
            EngineError::QueryExecutionFailed(_) => true,
            EngineError::GenerationUnavailable(_) => true,
            EngineError::Persistence(_) => true,
            EngineError::Pipeline(_) => false,
        }
    }

    /// Returns a user-friendly hint for the error
    pub fn user_hint(&self) -> &str {
        match self {
            EngineError::Config(_) => "Check ~/.tidewatch/config.toml for invalid values",
            EngineError::ClassificationAmbiguous { .. } => {
                "Rephrase the request, or configure a fallback route"
            }
            EngineError::QueryExecutionFailed(_) => {
                "The generated query did not run; rephrase the request"
            }
            EngineError::GenerationUnavailable(_) => {
                "The generation backend did not respond; is the model server running?"
            }
            EngineError::Persistence(_) => "Check that the state file location is writable",
            EngineError::Pipeline(_) => "Internal pipeline fault; please report this",
        }
    }
}
