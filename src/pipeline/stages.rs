//! Stage functions
//!
//! Each stage reads and mutates the shared [`TurnContext`]. Stages open
//! their own generation session, so backend state never leaks between
//! stages of the same turn.

use chrono::Local;
use regex::Regex;
use std::sync::OnceLock;
use tracing::debug;

use crate::errors::EngineError;
use crate::llm::{GenSession, TextGenerator};
use crate::memory::ConversationMemory;
use crate::prompts::{self, params};
use crate::store::QueryStore;

use super::TurnContext;

/// Normalize informal domain synonyms to the canonical category tokens
/// the contact schema uses. Word-boundary safe, case-insensitive.
pub fn normalize_categories(query: &str) -> String {
    static SYNONYM_RE: OnceLock<Regex> = OnceLock::new();
    let re = SYNONYM_RE.get_or_init(|| {
        Regex::new(r"(?i)\b(submarines?|ships?|aircrafts?|helicopters?)\b")
            .expect("synonym regex is valid")
    });

    re.replace_all(query, |caps: &regex::Captures<'_>| {
        let word = caps[1].to_ascii_lowercase();
        if word.starts_with("submarine") {
            "subsurface"
        } else if word.starts_with("ship") {
            "surface"
        } else {
            // aircraft / helicopter
            "air"
        }
        .to_string()
    })
    .into_owned()
}

/// Synthesize a query from the question and the cached schema description.
///
/// The generated text is scrubbed of framework artifacts by the session,
/// then synonym-normalized and lowercased before it is considered final.
pub async fn write_query(
    generator: &dyn TextGenerator,
    ctx: &mut TurnContext,
    schema_description: &str,
) -> Result<(), EngineError> {
    let prompt = prompts::query_synthesis(&ctx.question, schema_description);

    let session = GenSession::begin(generator).await?;
    let raw = session.complete(&prompt, &params::QUERY_SYNTHESIS).await?;
    session.finish().await?;

    let query = normalize_categories(&raw).to_lowercase();
    debug!("Synthesized query: {}", query);

    ctx.generated_query = Some(query);
    Ok(())
}

/// Run the synthesized query against the store. Pass-through; adapter
/// errors terminate the turn.
pub async fn execute_query(
    store: &dyn QueryStore,
    ctx: &mut TurnContext,
) -> Result<(), EngineError> {
    let query = ctx
        .generated_query
        .as_deref()
        .ok_or_else(|| EngineError::Pipeline("execute reached without a query".to_string()))?;

    let result = store.execute(query).await?;
    debug!("Query result: {}", result);

    ctx.query_result = Some(result);
    Ok(())
}

/// Draft the report from the question and the query result. Sets both
/// `report` and `answer`.
pub async fn generate_report(
    generator: &dyn TextGenerator,
    ctx: &mut TurnContext,
) -> Result<(), EngineError> {
    let data = ctx
        .query_result
        .as_deref()
        .ok_or_else(|| EngineError::Pipeline("report reached without a result".to_string()))?;

    let generated_at = Local::now().format("%d-%m-%y %H:%M:%S").to_string();
    let prompt = prompts::report(&ctx.question, data, &generated_at);

    let session = GenSession::begin(generator).await?;
    let report = session.complete(&prompt, &params::REPORT).await?;
    session.finish().await?;

    ctx.report = Some(report.clone());
    ctx.answer = Some(report);
    Ok(())
}

/// Answer a follow-up from previously produced report/result and the
/// rendered chat history, without issuing a new query. Sets `answer` only.
pub async fn elaborate(
    generator: &dyn TextGenerator,
    ctx: &mut TurnContext,
    memory: &ConversationMemory,
    carried_report: Option<&str>,
    carried_result: Option<&str>,
) -> Result<(), EngineError> {
    let report = ctx
        .report
        .as_deref()
        .or(carried_report)
        .unwrap_or_default();
    let data = ctx
        .query_result
        .as_deref()
        .or(carried_result)
        .unwrap_or_default();

    let prompt = prompts::elaboration(&ctx.question, report, data, &memory.render_as_text());

    let session = GenSession::begin(generator).await?;
    let answer = session.complete(&prompt, &params::ELABORATION).await?;
    session.finish().await?;

    ctx.answer = Some(answer);
    Ok(())
}
