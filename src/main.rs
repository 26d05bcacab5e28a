// Tidewatch Contact Reporting Engine
// Main entry point for the Tidewatch binary

use std::io::{self, BufRead, Write};
use std::sync::Arc;

use clap::Parser;
use tidewatch::cli::{Cli, Command};
use tidewatch::config::Config;
use tidewatch::llm::{LlamaServerProvider, OllamaProvider, TextGenerator};
use tidewatch::pipeline::{Orchestrator, TurnOutcome};
use tidewatch::router::Intent;
use tidewatch::state::StateFile;
use tidewatch::store::SqliteStore;
use tidewatch::telemetry::{init_telemetry, init_telemetry_with_level};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Initialize basic telemetry first (before config is loaded)
    init_telemetry();

    tracing::info!("Tidewatch Engine v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration (or use custom path if provided)
    let config = if let Some(config_path) = &cli.config {
        Config::load_from_path(config_path)?
    } else {
        Config::load_or_create()?
    };

    // Re-initialize telemetry with the CLI override or config-driven level
    // (only takes effect if RUST_LOG env var is not set)
    let log_level = cli.log.as_deref().unwrap_or(&config.core.log_level);
    init_telemetry_with_level(log_level);

    let generator = build_generator(&config)?;
    let store = Arc::new(SqliteStore::connect(&config.store.database).await?);
    let state_file = StateFile::new(&config.memory.state_file);

    let mut orchestrator = Orchestrator::new(
        generator,
        store,
        config.router.policy,
        config.memory.max_turn_records,
        config.fallback_intent(),
    );

    match cli.command {
        Command::Ask { question } => {
            let outcome = orchestrator.run_turn(&question).await?;
            persist_turn(&state_file, &question, &outcome);
            print_outcome(&outcome, cli.json)?;
            Ok(())
        }

        Command::Chat => {
            println!("Tidewatch interactive session. Type 'exit' to quit.");
            let stdin = io::stdin();
            loop {
                print!("> ");
                io::stdout().flush()?;

                let mut line = String::new();
                if stdin.lock().read_line(&mut line)? == 0 {
                    break;
                }
                let question = line.trim();
                if question.is_empty() {
                    continue;
                }
                if question.eq_ignore_ascii_case("exit") || question.eq_ignore_ascii_case("quit") {
                    break;
                }

                match orchestrator.run_turn(question).await {
                    Ok(outcome) => {
                        persist_turn(&state_file, question, &outcome);
                        print_outcome(&outcome, cli.json)?;
                    }
                    Err(e) => {
                        tracing::error!("Turn failed: {}", e);
                        eprintln!("Error: {} ({})", e, e.source.user_hint());
                    }
                }
            }
            Ok(())
        }

        Command::Schema => {
            let schema = orchestrator.schema_description().await?;
            println!("{}", schema);
            Ok(())
        }

        Command::Clear => {
            orchestrator.clear_memory();
            state_file.clear()?;
            println!("Conversation memory and session state cleared.");
            Ok(())
        }
    }
}

/// Construct the configured text-generation backend
fn build_generator(config: &Config) -> anyhow::Result<Arc<dyn TextGenerator>> {
    let generator: Arc<dyn TextGenerator> = match config.generator.provider.as_str() {
        "ollama" => Arc::new(OllamaProvider::new(
            &config.generator.ollama.base_url,
            &config.generator.ollama.model,
        )?),
        // Config validation restricts the provider to a known set
        _ => Arc::new(LlamaServerProvider::new(
            &config.generator.llama_server.base_url,
        )?),
    };
    tracing::info!("Using generation backend: {}", generator.name());
    Ok(generator)
}

/// Write the turn's artifacts into the persisted session state.
///
/// Persistence failures are logged and never interrupt the conversation.
fn persist_turn(state_file: &StateFile, question: &str, outcome: &TurnOutcome) {
    let tool_used = match outcome.route {
        Intent::Report => "generate_report",
        Intent::Analysis | Intent::General => "elaborate",
    };

    let result = state_file.update(|state| {
        state.query = question.to_string();
        if let Some(query) = &outcome.generated_query {
            state.sql_query = query.clone();
        }
        if let Some(result) = &outcome.query_result {
            state.result = result.clone();
        }
        match outcome.route {
            Intent::Report => {
                if let Some(report) = &outcome.report {
                    state.report = report.clone();
                }
            }
            Intent::General => state.analysis = outcome.answer.clone(),
            Intent::Analysis => state.elaboration = outcome.answer.clone(),
        }
    });
    if let Err(e) = result {
        tracing::warn!("Failed to persist turn state: {}", e);
    }

    if let Err(e) = state_file.add_chat_entry(question, &outcome.answer, tool_used) {
        tracing::warn!("Failed to persist chat entry: {}", e);
    }
}

/// Print a turn outcome as text or JSON
fn print_outcome(outcome: &TurnOutcome, json: bool) -> anyhow::Result<()> {
    if json {
        let payload = serde_json::json!({
            "answer": outcome.answer,
            "report": outcome.report,
            "route": outcome.route,
        });
        println!("{}", serde_json::to_string_pretty(&payload)?);
    } else {
        println!("{}", outcome.answer);
    }
    Ok(())
}
