//! Query Store Adapter
//!
//! The query store is an external collaborator: the pipeline hands it a
//! query string and gets back adapter-formatted text. No retries, no query
//! repair — a bad query surfaces as the turn's terminal error.

use async_trait::async_trait;

pub mod sqlite;

pub use sqlite::SqliteStore;

/// Result type for store operations
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors that can occur at the query store boundary
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Query failed: {message} (query: {query})")]
    ExecutionFailed { query: String, message: String },

    #[error("Schema description unavailable: {0}")]
    SchemaUnavailable(String),
}

/// Relational query execution boundary
#[async_trait]
pub trait QueryStore: Send + Sync {
    /// Render a textual description of the store's schema, suitable for
    /// inclusion in a query-synthesis prompt.
    async fn describe_schema(&self) -> Result<String>;

    /// Execute a query string and return the result as adapter-formatted
    /// text. Purely pass-through.
    async fn execute(&self, query: &str) -> Result<String>;
}
