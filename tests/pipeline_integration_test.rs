//! Integration tests for the turn pipeline
//!
//! Drives the orchestrator end to end with a scripted generation backend
//! and an in-memory query store, validating:
//! - The full report path (route → query synthesis → execute → report)
//! - Synonym normalization of synthesized queries
//! - Binary routing with an empty history
//! - Elaboration from carried context without a new query
//! - Memory retention under the configured cap

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use tidewatch::llm::{GenParams, GenerationError, TextGenerator};
use tidewatch::memory::Role;
use tidewatch::pipeline::Orchestrator;
use tidewatch::router::{Intent, RoutePolicy};
use tidewatch::store::{QueryStore, StoreError};

/// Generation backend that replays a fixed script of outputs
struct ScriptedGenerator {
    outputs: Mutex<VecDeque<String>>,
}

impl ScriptedGenerator {
    fn new(outputs: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            outputs: Mutex::new(outputs.iter().map(|s| s.to_string()).collect()),
        })
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(
        &self,
        _prompt: &str,
        _params: &GenParams,
    ) -> Result<String, GenerationError> {
        self.outputs
            .lock()
            .expect("script lock")
            .pop_front()
            .ok_or_else(|| GenerationError::Unavailable("script exhausted".to_string()))
    }
}

/// Query store that records executed queries and returns a canned result
struct RecordingStore {
    result: String,
    executed: Mutex<Vec<String>>,
}

impl RecordingStore {
    fn new(result: &str) -> Arc<Self> {
        Arc::new(Self {
            result: result.to_string(),
            executed: Mutex::new(Vec::new()),
        })
    }

    fn executed(&self) -> Vec<String> {
        self.executed.lock().expect("store lock").clone()
    }
}

#[async_trait]
impl QueryStore for RecordingStore {
    async fn describe_schema(&self) -> Result<String, StoreError> {
        Ok("CREATE TABLE contacts (name TEXT, category TEXT);\n\
            /* 1 sample rows from table: [('INS Vela', 'subsurface')] */"
            .to_string())
    }

    async fn execute(&self, query: &str) -> Result<String, StoreError> {
        self.executed
            .lock()
            .expect("store lock")
            .push(query.to_string());
        Ok(self.result.clone())
    }
}

#[tokio::test]
async fn test_categorical_report_path_end_to_end() {
    let generator = ScriptedGenerator::new(&[
        "report",
        "SELECT name FROM contacts WHERE category = 'Submarine'",
        "SITUATION REPORT\n\nOne subsurface contact: INS Vela.",
    ]);
    let store = RecordingStore::new("[('INS Vela',)]");

    let mut orchestrator = Orchestrator::new(
        generator,
        Arc::clone(&store) as Arc<dyn QueryStore>,
        RoutePolicy::Categorical,
        10,
        None,
    );

    let outcome = orchestrator
        .run_turn("Give me a report of all submarines")
        .await
        .unwrap();

    assert_eq!(outcome.route, Intent::Report);

    // The synthesized query is normalized and lowercased before execution
    let executed = store.executed();
    assert_eq!(executed.len(), 1);
    assert_eq!(
        executed[0],
        "select name from contacts where category = 'subsurface'"
    );
    assert_eq!(outcome.generated_query.as_deref(), Some(executed[0].as_str()));
    assert_eq!(outcome.query_result.as_deref(), Some("[('INS Vela',)]"));

    // The report is both the artifact and the surfaced answer
    let report = outcome.report.as_deref().unwrap();
    assert!(report.contains("INS Vela"));
    assert_eq!(outcome.answer, report);

    // One exchange lands in memory, user first
    assert_eq!(outcome.chat_history.len(), 2);
    assert_eq!(outcome.chat_history[0].role, Role::User);
    assert_eq!(
        outcome.chat_history[0].content,
        "Give me a report of all submarines"
    );
    assert_eq!(outcome.chat_history[1].role, Role::Assistant);
}

#[tokio::test]
async fn test_binary_policy_empty_history_forces_report() {
    // No routing output is scripted: with an empty history the binary
    // policy must not consult the model at all.
    let generator = ScriptedGenerator::new(&[
        "select * from contacts",
        "REPORT: no contacts tracked.",
    ]);
    let store = RecordingStore::new("[]");

    let mut orchestrator = Orchestrator::new(
        generator,
        store,
        RoutePolicy::Binary,
        10,
        None,
    );

    let outcome = orchestrator.run_turn("Tell me more").await.unwrap();
    assert_eq!(outcome.route, Intent::Report);
    assert!(outcome.report.is_some());
}

#[tokio::test]
async fn test_analysis_route_elaborates_from_carried_context() {
    let generator = ScriptedGenerator::new(&[
        // Turn 1: report path
        "report",
        "select name, category from contacts",
        "REPORT: INS Vela is holding station.",
        // Turn 2: analysis path, no query stages
        "analysis",
        "INS Vela has been loitering near the strait since yesterday.",
    ]);
    let store = RecordingStore::new("[('INS Vela', 'subsurface')]");

    let mut orchestrator = Orchestrator::new(
        generator,
        Arc::clone(&store) as Arc<dyn QueryStore>,
        RoutePolicy::Categorical,
        10,
        None,
    );

    orchestrator
        .run_turn("Report on all contacts")
        .await
        .unwrap();

    let outcome = orchestrator
        .run_turn("What has the submarine been doing?")
        .await
        .unwrap();

    assert_eq!(outcome.route, Intent::Analysis);
    assert!(outcome.answer.contains("loitering"));

    // Elaboration produced no report and touched the store only once
    assert!(outcome.report.is_none());
    assert!(outcome.generated_query.is_none());
    assert_eq!(store.executed().len(), 1);

    // Both turns retained, in order
    assert_eq!(outcome.chat_history.len(), 4);
}

#[tokio::test]
async fn test_general_route_executes_then_elaborates() {
    let generator = ScriptedGenerator::new(&[
        "general",
        "select count(*) from contacts where category = 'air'",
        "Three air contacts are currently tracked.",
    ]);
    let store = RecordingStore::new("[(3,)]");

    let mut orchestrator = Orchestrator::new(
        generator,
        Arc::clone(&store) as Arc<dyn QueryStore>,
        RoutePolicy::Categorical,
        10,
        None,
    );

    let outcome = orchestrator
        .run_turn("How many aircraft are being tracked?")
        .await
        .unwrap();

    assert_eq!(outcome.route, Intent::General);
    assert_eq!(store.executed().len(), 1);
    // The general path answers conversationally, without a report artifact
    assert!(outcome.report.is_none());
    assert!(outcome.answer.contains("Three air contacts"));
}

#[tokio::test]
async fn test_memory_stays_at_cap_across_turns() {
    // Three report turns at a cap of 4 records: 6 pushes, 4 survive
    let generator = ScriptedGenerator::new(&[
        "report", "select 1", "report one",
        "report", "select 2", "report two",
        "report", "select 3", "report three",
    ]);
    let store = RecordingStore::new("[]");

    let mut orchestrator = Orchestrator::new(
        generator,
        store,
        RoutePolicy::Categorical,
        4,
        None,
    );

    orchestrator.run_turn("first question").await.unwrap();
    orchestrator.run_turn("second question").await.unwrap();
    let outcome = orchestrator.run_turn("third question").await.unwrap();

    assert_eq!(outcome.chat_history.len(), 4);
    // Oldest exchange evicted, most recent retained in order
    assert_eq!(outcome.chat_history[0].content, "second question");
    assert_eq!(outcome.chat_history[1].content, "report two");
    assert_eq!(outcome.chat_history[2].content, "third question");
    assert_eq!(outcome.chat_history[3].content, "report three");
}

#[tokio::test]
async fn test_ambiguous_route_falls_back_when_configured() {
    let generator = ScriptedGenerator::new(&[
        "I cannot decide",
        "select * from contacts",
        "REPORT: fallback path taken.",
    ]);
    let store = RecordingStore::new("[]");

    let mut orchestrator = Orchestrator::new(
        generator,
        store,
        RoutePolicy::Categorical,
        10,
        Some(Intent::Report),
    );

    let outcome = orchestrator.run_turn("hmm").await.unwrap();
    assert_eq!(outcome.route, Intent::Report);
}

#[tokio::test]
async fn test_ambiguous_route_without_fallback_is_a_turn_error() {
    let generator = ScriptedGenerator::new(&["I cannot decide"]);
    let store = RecordingStore::new("[]");

    let mut orchestrator = Orchestrator::new(
        generator,
        store,
        RoutePolicy::Categorical,
        10,
        None,
    );

    let err = orchestrator.run_turn("hmm").await.unwrap_err();
    assert_eq!(err.stage, "route");
    assert!(err.to_string().contains("hmm"));

    // A failed turn leaves no trace in memory
    assert!(orchestrator.memory().is_empty());
}

#[tokio::test]
async fn test_clear_memory_drops_carried_context() {
    let generator = ScriptedGenerator::new(&[
        "report",
        "select name from contacts",
        "REPORT: one contact.",
        // After the clear: the elaboration prompt sees no prior report,
        // but the turn still completes
        "analysis",
        "There is no earlier report to expand on.",
    ]);
    let store = RecordingStore::new("[('INS Vela',)]");

    let mut orchestrator = Orchestrator::new(
        generator,
        store,
        RoutePolicy::Categorical,
        10,
        None,
    );

    orchestrator.run_turn("Report on contacts").await.unwrap();
    assert!(!orchestrator.memory().is_empty());

    orchestrator.clear_memory();
    assert!(orchestrator.memory().is_empty());

    let outcome = orchestrator.run_turn("Tell me more").await.unwrap();
    assert_eq!(outcome.route, Intent::Analysis);
    assert_eq!(outcome.chat_history.len(), 2);
}
