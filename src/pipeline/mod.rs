//! Stage Pipeline and Orchestrator
//!
//! This module implements the per-turn state machine:
//!
//! ```text
//! AssignStore → Route → { WriteQuery → ExecuteQuery → GenerateReport
//!                       | WriteQuery → ExecuteQuery → Elaborate
//!                       | Elaborate }
//!             → UpdateMemory → Done
//! ```
//!
//! The router's decision at `Route` is the only branch point; the graph is
//! acyclic, with no retry node. A failed stage surfaces as the turn's
//! terminal error, wrapped with the stage name and the offending question;
//! memory and carried context survive the failure for inspection.

use std::fmt;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::errors::EngineError;
use crate::llm::TextGenerator;
use crate::memory::{ConversationMemory, TurnRecord};
use crate::router::{Intent, IntentRouter, RoutePolicy};
use crate::store::QueryStore;

pub mod context;
pub mod stages;

pub use context::TurnContext;

/// Named states of the turn pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    AssignStore,
    Route,
    WriteQuery,
    ExecuteQuery,
    GenerateReport,
    Elaborate,
    UpdateMemory,
    Done,
}

impl Stage {
    /// Stage name used in error wrapping and logs
    pub fn name(&self) -> &'static str {
        match self {
            Stage::AssignStore => "assign_store",
            Stage::Route => "route",
            Stage::WriteQuery => "write_query",
            Stage::ExecuteQuery => "execute_query",
            Stage::GenerateReport => "generate_report",
            Stage::Elaborate => "elaborate",
            Stage::UpdateMemory => "update_memory",
            Stage::Done => "done",
        }
    }

    /// Successor state. The route decides the branch after `Route` and
    /// after `ExecuteQuery`; everywhere else the successor is fixed.
    fn next(&self, route: Intent) -> Stage {
        match self {
            Stage::AssignStore => Stage::Route,
            Stage::Route => match route {
                Intent::Report | Intent::General => Stage::WriteQuery,
                Intent::Analysis => Stage::Elaborate,
            },
            Stage::WriteQuery => Stage::ExecuteQuery,
            Stage::ExecuteQuery => match route {
                Intent::Report => Stage::GenerateReport,
                // Analysis never reaches this state; treat it as the
                // elaboration branch rather than leaving a hole.
                Intent::General | Intent::Analysis => Stage::Elaborate,
            },
            Stage::GenerateReport => Stage::UpdateMemory,
            Stage::Elaborate => Stage::UpdateMemory,
            Stage::UpdateMemory => Stage::Done,
            Stage::Done => Stage::Done,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A turn-level failure, wrapped with the stage that produced it and the
/// question being processed.
#[derive(Debug, thiserror::Error)]
#[error("stage '{stage}' failed for question {question:?}: {source}")]
pub struct TurnError {
    pub stage: &'static str,
    pub question: String,
    #[source]
    pub source: EngineError,
}

/// What the caller gets back from a successful turn
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    /// The answer surfaced to the user this turn
    pub answer: String,

    /// The report artifact, when this turn produced one
    pub report: Option<String>,

    /// The query synthesized this turn, when the route produced one
    pub generated_query: Option<String>,

    /// The raw store result this turn, when the route produced one
    pub query_result: Option<String>,

    /// The route taken
    pub route: Intent,

    /// Retained chat history after this turn
    pub chat_history: Vec<TurnRecord>,
}

/// Owns the collaborators and the cross-turn state, and runs one turn at
/// a time to completion.
pub struct Orchestrator {
    /// Text-generation backend shared by all stages
    generator: Arc<dyn TextGenerator>,

    /// Query store boundary
    store: Arc<dyn QueryStore>,

    /// Intent router over the configured policy
    router: IntentRouter,

    /// Bounded conversation memory carried across turns
    memory: ConversationMemory,

    /// Schema description, fetched once per process
    schema: OnceCell<String>,

    /// Default route applied when classification is ambiguous
    fallback_intent: Option<Intent>,

    /// Report carried forward for elaboration on later turns
    carried_report: Option<String>,

    /// Query result carried forward for elaboration on later turns
    carried_result: Option<String>,
}

impl Orchestrator {
    /// Create a new orchestrator
    pub fn new(
        generator: Arc<dyn TextGenerator>,
        store: Arc<dyn QueryStore>,
        policy: RoutePolicy,
        memory_cap: usize,
        fallback_intent: Option<Intent>,
    ) -> Self {
        Self {
            generator,
            store,
            router: IntentRouter::new(policy),
            memory: ConversationMemory::with_cap(memory_cap),
            schema: OnceCell::new(),
            fallback_intent,
            carried_report: None,
            carried_result: None,
        }
    }

    /// The retained conversation memory
    pub fn memory(&self) -> &ConversationMemory {
        &self.memory
    }

    /// Drop all conversation history
    pub fn clear_memory(&mut self) {
        self.memory.clear();
        self.carried_report = None;
        self.carried_result = None;
    }

    /// Cached schema description, fetching it on first use
    pub async fn schema_description(&self) -> Result<&str, EngineError> {
        let schema = self
            .schema
            .get_or_try_init(|| async { self.store.describe_schema().await })
            .await?;
        Ok(schema.as_str())
    }

    /// Run one turn to completion.
    ///
    /// The turn either finishes with `answer` set or fails with a
    /// [`TurnError`]; there is no partial success. The conversation memory
    /// is only appended to on success, and carried context survives either
    /// way.
    pub async fn run_turn(&mut self, question: &str) -> Result<TurnOutcome, TurnError> {
        let turn_id = Uuid::new_v4();
        info!("Turn {} started: {:?}", turn_id, question);

        let mut ctx = TurnContext::new(question);
        let mut stage = Stage::AssignStore;

        // Route is unknown until the Route stage runs; until then the
        // successor of every state is fixed, so the placeholder is inert.
        let mut route = Intent::Report;

        while stage != Stage::Done {
            debug!("Turn {} entering stage {}", turn_id, stage);

            let result = self.run_stage(stage, &mut ctx).await;
            if let Err(source) = result {
                warn!("Turn {} failed in stage {}: {}", turn_id, stage, source);
                return Err(TurnError {
                    stage: stage.name(),
                    question: question.to_string(),
                    source,
                });
            }

            if stage == Stage::Route {
                route = ctx.route.unwrap_or(route);
            }

            stage = stage.next(route);
        }

        // Terminal invariant: every path sets answer before Done.
        let answer = ctx.answer.clone().ok_or_else(|| TurnError {
            stage: Stage::Done.name(),
            question: question.to_string(),
            source: EngineError::Pipeline("turn terminated without an answer".to_string()),
        })?;

        if ctx.report.is_some() {
            self.carried_report = ctx.report.clone();
        }
        if ctx.query_result.is_some() {
            self.carried_result = ctx.query_result.clone();
        }

        info!("Turn {} completed via route {}", turn_id, route);

        Ok(TurnOutcome {
            answer,
            report: ctx.report,
            generated_query: ctx.generated_query,
            query_result: ctx.query_result,
            route,
            chat_history: self.memory.records().to_vec(),
        })
    }

    /// Execute a single stage against the shared context.
    async fn run_stage(&mut self, stage: Stage, ctx: &mut TurnContext) -> Result<(), EngineError> {
        match stage {
            Stage::AssignStore => {
                self.schema_description().await?;
                Ok(())
            }

            Stage::Route => {
                let intent = match self
                    .router
                    .classify(
                        self.generator.as_ref(),
                        &ctx.question,
                        &self.memory,
                        self.carried_report.as_deref(),
                    )
                    .await
                {
                    Ok(intent) => intent,
                    Err(EngineError::ClassificationAmbiguous { raw }) => {
                        match self.fallback_intent {
                            Some(fallback) => {
                                warn!(
                                    "Ambiguous classification {:?}; falling back to {}",
                                    raw, fallback
                                );
                                fallback
                            }
                            None => return Err(EngineError::ClassificationAmbiguous { raw }),
                        }
                    }
                    Err(e) => return Err(e),
                };

                info!("Routed to {}", intent);
                ctx.route = Some(intent);
                Ok(())
            }

            Stage::WriteQuery => {
                let schema = self.schema_description().await?.to_string();
                stages::write_query(self.generator.as_ref(), ctx, &schema).await
            }

            Stage::ExecuteQuery => stages::execute_query(self.store.as_ref(), ctx).await,

            Stage::GenerateReport => stages::generate_report(self.generator.as_ref(), ctx).await,

            Stage::Elaborate => {
                stages::elaborate(
                    self.generator.as_ref(),
                    ctx,
                    &self.memory,
                    self.carried_report.as_deref(),
                    self.carried_result.as_deref(),
                )
                .await
            }

            Stage::UpdateMemory => {
                let answer = ctx.answer.as_deref().ok_or_else(|| {
                    EngineError::Pipeline("memory update reached without an answer".to_string())
                })?;
                self.memory.push_exchange(&ctx.question, answer);
                Ok(())
            }

            Stage::Done => Ok(()),
        }
    }
}
