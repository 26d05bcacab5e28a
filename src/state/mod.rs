//! Persisted Session State
//!
//! The tool-server deployment mode keeps its session context in a small
//! on-disk JSON document with a fixed set of top-level keys. The document
//! is rewritten in full on every mutation; a missing or unparsable file is
//! replaced with a fresh default and persisted immediately. This is the
//! engine's only persisted state, under a single-writer assumption.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::errors::EngineError;

/// Maximum chat entries retained in the persisted document
pub const STATE_CHAT_CAP: usize = 5;

/// One persisted chat entry
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatEntry {
    pub timestamp: String,
    pub user_input: String,
    pub response: String,
    pub tool_used: String,
}

/// The persisted session document
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SessionState {
    pub query: String,
    pub sql_query: String,
    pub result: String,
    pub report: String,
    pub analysis: String,
    pub elaboration: String,
    pub chat_history: Vec<ChatEntry>,
    pub last_updated: String,
}

/// Handle to the on-disk state document
pub struct StateFile {
    path: PathBuf,
}

impl StateFile {
    /// Create a handle for the given path. Nothing is read until `load`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the document.
    ///
    /// A missing file yields the default document, persisted immediately.
    /// An unparsable file is treated the same way: the corruption is
    /// logged, the default replaces it, and data loss is accepted.
    pub fn load(&self) -> Result<SessionState, EngineError> {
        if !self.path.exists() {
            let state = SessionState::default();
            self.save(&state)?;
            return Ok(state);
        }

        let contents = fs::read_to_string(&self.path)
            .map_err(|e| EngineError::Persistence(format!("Failed to read state file: {}", e)))?;

        match serde_json::from_str(&contents) {
            Ok(state) => Ok(state),
            Err(e) => {
                warn!(
                    "State file {} unreadable ({}); resetting to default",
                    self.path.display(),
                    e
                );
                let state = SessionState::default();
                self.save(&state)?;
                Ok(state)
            }
        }
    }

    /// Rewrite the full document. Patching in place is never done, which
    /// keeps unknown-key handling trivial for other readers.
    pub fn save(&self, state: &SessionState) -> Result<(), EngineError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| {
                    EngineError::Persistence(format!("Failed to create state directory: {}", e))
                })?;
            }
        }

        let json = serde_json::to_string_pretty(state)
            .map_err(|e| EngineError::Persistence(format!("Failed to serialize state: {}", e)))?;

        fs::write(&self.path, json)
            .map_err(|e| EngineError::Persistence(format!("Failed to write state file: {}", e)))
    }

    /// Read-modify-write one mutation, refreshing `last_updated`.
    pub fn update<F>(&self, mutate: F) -> Result<SessionState, EngineError>
    where
        F: FnOnce(&mut SessionState),
    {
        let mut state = self.load()?;
        mutate(&mut state);
        state.last_updated = Utc::now().to_rfc3339();
        self.save(&state)?;
        Ok(state)
    }

    /// Append a chat entry, retaining the most recent [`STATE_CHAT_CAP`].
    pub fn add_chat_entry(
        &self,
        user_input: &str,
        response: &str,
        tool_used: &str,
    ) -> Result<SessionState, EngineError> {
        self.update(|state| {
            state.chat_history.push(ChatEntry {
                timestamp: Utc::now().to_rfc3339(),
                user_input: user_input.to_string(),
                response: response.to_string(),
                tool_used: tool_used.to_string(),
            });

            if state.chat_history.len() > STATE_CHAT_CAP {
                let excess = state.chat_history.len() - STATE_CHAT_CAP;
                state.chat_history.drain(..excess);
            }
        })
    }

    /// Deterministic text rendering of the persisted chat history.
    pub fn history_text(&self) -> Result<String, EngineError> {
        let state = self.load()?;
        let mut text = String::new();
        for entry in &state.chat_history {
            text.push_str(&format!("User: {}\n", entry.user_input));
            text.push_str(&format!(
                "Assistant ({}): {}\n",
                entry.tool_used, entry.response
            ));
            text.push_str(&format!("Time: {}\n\n", entry.timestamp));
        }
        Ok(text)
    }

    /// Reset to the default document with a fresh `last_updated`.
    pub fn clear(&self) -> Result<(), EngineError> {
        let state = SessionState {
            last_updated: Utc::now().to_rfc3339(),
            ..SessionState::default()
        };
        self.save(&state)
    }
}
