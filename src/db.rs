mod schema;

use std::path::Path;

use anyhow::Result;
use rusqlite::{Connection, OptionalExtension};

use crate::models::LinkAttribute;

use schema::INITIAL_SCHEMA;

/// Writable handle on the normalized store.
///
/// Used by ingestion and health checks. Query execution opens its own
/// read-only connection instead (see `QueryExecutor`).
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Opens an in-memory SQLite database.
    ///
    /// Automatically initializes the schema on connection open.
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.initialize_schema()?;
        Ok(db)
    }

    /// Opens a file-based SQLite database at the given path.
    ///
    /// Creates the database file if it does not exist.
    /// Automatically initializes the schema on connection open.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.initialize_schema()?;
        Ok(db)
    }

    /// Initializes the database schema.
    ///
    /// Uses IF NOT EXISTS for idempotent execution.
    fn initialize_schema(&self) -> Result<()> {
        self.conn.execute("PRAGMA foreign_keys = ON", [])?;
        self.conn.execute_batch(INITIAL_SCHEMA)?;
        Ok(())
    }

    /// Returns a reference to the underlying connection.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Returns a mutable reference, needed to open transactions.
    pub fn connection_mut(&mut self) -> &mut Connection {
        &mut self.conn
    }

    /// Number of entries in the primary table.
    pub fn entry_count(&self) -> Result<i64> {
        let count = self
            .conn
            .query_row("SELECT COUNT(*) FROM peoplesay", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Number of rows in the link table of `attribute`.
    pub fn link_row_count(&self, attribute: LinkAttribute) -> Result<i64> {
        // Table names come from a closed enum, never from input.
        let sql = format!("SELECT COUNT(*) FROM {}", attribute.table());
        let count = self.conn.query_row(&sql, [], |row| row.get(0))?;
        Ok(count)
    }

    /// Reads an ingestion metadata value.
    pub fn metadata(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM store_metadata WHERE key = ?1",
                [key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }
}
