//! SQLite query store
//!
//! sqlx-backed implementation of the [`QueryStore`] boundary. The contact
//! database itself is externally owned; this adapter only describes its
//! schema and runs the queries the synthesis stage produces.
//!
//! Result rows are rendered as a list of tuples — the textual format the
//! report and elaboration prompts were written against.

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{Column, ConnectOptions, Row};
use std::fmt::Write as _;
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, info};

use super::{QueryStore, Result, StoreError};

/// Number of sample rows included per table in the schema description
const SCHEMA_SAMPLE_ROWS: usize = 3;

/// SQLite-backed query store
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Connect to an existing database file.
    ///
    /// The database is externally owned; a missing file is an error, not
    /// something to create.
    pub async fn connect(db_path: &Path) -> Result<Self> {
        info!("Connecting to contact database at: {}", db_path.display());

        let connection_string = format!("sqlite:{}", db_path.display());
        let options = SqliteConnectOptions::from_str(&connection_string)
            .map_err(|e| StoreError::Connection(e.to_string()))?
            .create_if_missing(false)
            .read_only(true)
            .disable_statement_logging();

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        debug!("Contact database connection established");

        Ok(Self { pool })
    }

    /// Wrap an existing pool (used by tests).
    pub fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Render one row as a parenthesized tuple of values.
    fn render_row(row: &SqliteRow) -> String {
        let mut parts = Vec::with_capacity(row.columns().len());
        for i in 0..row.columns().len() {
            parts.push(Self::render_value(row, i));
        }
        format!("({})", parts.join(", "))
    }

    /// Decode a single column dynamically: integer, real, text, null, or a
    /// blob placeholder.
    fn render_value(row: &SqliteRow, index: usize) -> String {
        if let Ok(v) = row.try_get::<Option<i64>, _>(index) {
            return match v {
                Some(n) => n.to_string(),
                None => "None".to_string(),
            };
        }
        if let Ok(v) = row.try_get::<Option<f64>, _>(index) {
            return match v {
                Some(n) => n.to_string(),
                None => "None".to_string(),
            };
        }
        if let Ok(v) = row.try_get::<Option<String>, _>(index) {
            return match v {
                Some(s) => format!("'{}'", s),
                None => "None".to_string(),
            };
        }
        "<binary>".to_string()
    }

    /// Render a full result set as a list of tuples.
    fn render_rows(rows: &[SqliteRow]) -> String {
        let tuples: Vec<String> = rows.iter().map(Self::render_row).collect();
        format!("[{}]", tuples.join(", "))
    }
}

#[async_trait]
impl QueryStore for SqliteStore {
    async fn describe_schema(&self) -> Result<String> {
        let tables: Vec<(String, String)> = sqlx::query_as(
            "SELECT name, sql FROM sqlite_master \
             WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::SchemaUnavailable(e.to_string()))?;

        if tables.is_empty() {
            return Err(StoreError::SchemaUnavailable(
                "database contains no tables".to_string(),
            ));
        }

        let mut description = String::new();
        for (name, create_sql) in &tables {
            writeln!(description, "{}", create_sql).ok();

            let sample_query = format!("SELECT * FROM \"{}\" LIMIT {}", name, SCHEMA_SAMPLE_ROWS);
            let rows = sqlx::query(&sample_query)
                .fetch_all(&self.pool)
                .await
                .map_err(|e| StoreError::SchemaUnavailable(e.to_string()))?;

            writeln!(
                description,
                "/* {} sample rows from {}: {} */\n",
                rows.len(),
                name,
                Self::render_rows(&rows)
            )
            .ok();
        }

        Ok(description.trim_end().to_string())
    }

    async fn execute(&self, query: &str) -> Result<String> {
        debug!("Executing query: {}", query);

        let rows = sqlx::query(query)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StoreError::ExecutionFailed {
                query: query.to_string(),
                message: e.to_string(),
            })?;

        debug!("Query returned {} rows", rows.len());

        Ok(Self::render_rows(&rows))
    }
}
