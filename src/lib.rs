//! Tidewatch Engine Library
//!
//! This library provides the core functionality of the Tidewatch engine:
//! routing a natural-language request through SQL synthesis, query
//! execution, report drafting, and conversational elaboration, with a
//! bounded conversation memory carried across turns.
//! It is used by both the main binary and integration tests.

/// Configuration management module
pub mod config;

/// Error types shared across the engine
pub mod errors;

/// Text-generation provider abstraction layer
pub mod llm;

/// Conversation memory module
pub mod memory;

/// Stage pipeline and orchestrator module
pub mod pipeline;

/// Prompt text builders
pub mod prompts;

/// Intent router module
pub mod router;

/// Persisted session state module
pub mod state;

/// Query store adapter module
pub mod store;

/// Telemetry and observability
pub mod telemetry;

/// CLI interface module
pub mod cli;
