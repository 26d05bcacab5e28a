//! CLI interface for Tidewatch
//!
//! This module provides the command-line interface using clap's derive API.
//! It defines all commands and global flags for the Tidewatch engine.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Tidewatch Contact Reporting Engine
///
/// A local-first reporting assistant that routes natural-language requests
/// through SQL synthesis against the contact database, drafts situation
/// reports, and elaborates on earlier answers from conversation memory.
#[derive(Parser, Debug)]
#[command(name = "tidewatch")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Set log level (error, warn, info, debug, trace)
    #[arg(long, global = true, value_name = "LEVEL")]
    pub log: Option<String>,

    /// Specify alternate configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Answer a single question and exit
    Ask {
        /// The question to answer
        question: String,
    },

    /// Start an interactive conversation
    Chat,

    /// Print the contact database schema description
    Schema,

    /// Clear conversation memory and persisted session state
    Clear,
}
