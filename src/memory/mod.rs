//! Conversation Memory
//!
//! Bounded, ordered log of conversation turns. The log is both the
//! UI-facing chat history and the text context later stages render into
//! their prompts. After every append the most recent `cap` records are
//! retained; the oldest are dropped first.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Default number of records retained (5 user/assistant exchanges)
pub const DEFAULT_MEMORY_CAP: usize = 10;

/// Role of a recorded turn
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::User => write!(f, "User"),
            Role::Assistant => write!(f, "Assistant"),
        }
    }
}

/// One recorded turn
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TurnRecord {
    pub role: Role,
    pub content: String,
}

impl TurnRecord {
    /// Create a user record
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    /// Create an assistant record
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Bounded conversation memory
#[derive(Debug, Clone)]
pub struct ConversationMemory {
    records: Vec<TurnRecord>,
    cap: usize,
}

impl ConversationMemory {
    /// Create a new memory with the default cap
    pub fn new() -> Self {
        Self::with_cap(DEFAULT_MEMORY_CAP)
    }

    /// Create a new memory retaining at most `cap` records
    pub fn with_cap(cap: usize) -> Self {
        Self {
            records: Vec::new(),
            cap,
        }
    }

    /// Append one user/assistant exchange, then evict from the front
    /// until at most `cap` records remain.
    pub fn push_exchange(&mut self, question: impl Into<String>, answer: impl Into<String>) {
        self.records.push(TurnRecord::user(question));
        self.records.push(TurnRecord::assistant(answer));
        self.truncate_to_cap();
    }

    /// Append a single record, enforcing the cap.
    pub fn push(&mut self, record: TurnRecord) {
        self.records.push(record);
        self.truncate_to_cap();
    }

    // Retain the most recent `cap` records, oldest dropped first.
    fn truncate_to_cap(&mut self) {
        if self.records.len() > self.cap {
            let excess = self.records.len() - self.cap;
            self.records.drain(..excess);
        }
    }

    /// Deterministic reconstruction of the log as prompt context: one
    /// block per record, insertion order preserved.
    pub fn render_as_text(&self) -> String {
        let mut text = String::new();
        for record in &self.records {
            text.push_str(&format!("{}: {}\n", record.role, record.content));
        }
        text
    }

    /// All retained records, oldest first
    pub fn records(&self) -> &[TurnRecord] {
        &self.records
    }

    /// Number of retained records
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True if nothing has been recorded
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Configured maximum record count
    pub fn cap(&self) -> usize {
        self.cap
    }

    /// Drop all records
    pub fn clear(&mut self) {
        self.records.clear();
    }
}

impl Default for ConversationMemory {
    fn default() -> Self {
        Self::new()
    }
}
