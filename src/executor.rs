//! Runs structured queries against the normalized store.
//!
//! Each call opens its own read-only connection and drops it before returning,
//! so a generated statement can neither mutate the store nor create a missing
//! store file.

use std::path::{Path, PathBuf};

use rusqlite::types::ValueRef;
use rusqlite::{Connection, OpenFlags};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::models::{FieldValue, ResultRow, ResultSet, StructuredQuery};

/// Why a structured query produced no result set.
#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("query is empty or not a SELECT statement")]
    InvalidQuery,

    #[error("store not found at {}", .0.display())]
    StoreMissing(PathBuf),

    #[error("failed to open store: {0}")]
    Connection(#[source] rusqlite::Error),

    #[error("store at {} has not been ingested", .0.display())]
    Uninitialized(PathBuf),

    #[error("query failed: {0}")]
    Query(#[source] rusqlite::Error),
}

impl ExecutionError {
    /// Returns true when the store itself could not be reached.
    ///
    /// The remaining variants mean the store was fine but the query was not.
    pub fn is_store_unavailable(&self) -> bool {
        matches!(
            self,
            Self::StoreMissing(_) | Self::Connection(_) | Self::Uninitialized(_)
        )
    }
}

/// Executes structured queries against a store file.
#[derive(Debug, Clone)]
pub struct QueryExecutor {
    db_path: PathBuf,
}

impl QueryExecutor {
    pub fn new(db_path: impl Into<PathBuf>) -> Self {
        Self {
            db_path: db_path.into(),
        }
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    /// Runs `query` and materializes every row.
    ///
    /// An empty `Ok` result means the query ran and matched nothing.
    pub fn execute(&self, query: &StructuredQuery) -> Result<ResultSet, ExecutionError> {
        if !query.is_select() {
            warn!("refusing to execute a query without SELECT");
            return Err(ExecutionError::InvalidQuery);
        }
        if !self.db_path.is_file() {
            warn!(path = %self.db_path.display(), "store file is missing");
            return Err(ExecutionError::StoreMissing(self.db_path.clone()));
        }

        let conn = Connection::open_with_flags(
            &self.db_path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|e| {
            warn!(error = %e, "failed to open store");
            ExecutionError::Connection(e)
        })?;
        debug!(path = %self.db_path.display(), "opened read-only store connection");

        // SQLite reads the file lazily; a corrupt or foreign file only fails here.
        match has_entries_table(&conn) {
            Ok(true) => {}
            Ok(false) => {
                warn!(path = %self.db_path.display(), "store has no peoplesay table");
                return Err(ExecutionError::Uninitialized(self.db_path.clone()));
            }
            Err(e) => {
                warn!(error = %e, "store is not readable");
                return Err(ExecutionError::Connection(e));
            }
        }

        let result = run_query(&conn, query.as_str()).map_err(|e| {
            warn!(error = %e, query = %query.preview(500), "query execution failed");
            ExecutionError::Query(e)
        });
        drop(conn);
        debug!("closed store connection");

        let result_set = result?;
        info!(rows = result_set.len(), "query returned rows");

        let duplicates = result_set.duplicate_entry_ids();
        if !duplicates.is_empty() {
            warn!(
                ?duplicates,
                "result repeats entry ids; query did not aggregate per entry"
            );
        }

        Ok(result_set)
    }
}

fn has_entries_table(conn: &Connection) -> rusqlite::Result<bool> {
    conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'peoplesay'",
        [],
        |row| row.get::<_, i64>(0),
    )
    .map(|count| count > 0)
}

fn run_query(conn: &Connection, sql: &str) -> rusqlite::Result<ResultSet> {
    let mut stmt = conn.prepare(sql)?;
    let columns: Vec<String> = stmt
        .column_names()
        .into_iter()
        .map(String::from)
        .collect();

    let mut rows = stmt.query([])?;
    let mut materialized = Vec::new();
    while let Some(row) = rows.next()? {
        let mut result_row = ResultRow::new();
        for (index, name) in columns.iter().enumerate() {
            result_row.push(name.clone(), field_value(row.get_ref(index)?));
        }
        materialized.push(result_row);
    }

    Ok(ResultSet::new(columns, materialized))
}

fn field_value(value: ValueRef<'_>) -> FieldValue {
    match value {
        ValueRef::Null => FieldValue::Null,
        ValueRef::Integer(i) => FieldValue::Integer(i),
        ValueRef::Real(r) => FieldValue::Real(r),
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => {
            FieldValue::Text(String::from_utf8_lossy(bytes).into_owned())
        }
    }
}
