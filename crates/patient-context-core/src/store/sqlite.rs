//! SQLite slot backend.
//!
//! Keeps slots in a single table so the context survives restarts.

use std::path::Path;

use rusqlite::{params, Connection, OptionalExtension};

use super::{SlotBackend, StoreResult};

/// Schema for the slot table.
pub const SLOT_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS context_slots (
    name TEXT PRIMARY KEY,
    value TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
"#;

/// Slots stored in a SQLite database.
pub struct SqliteBackend {
    conn: Connection,
}

impl SqliteBackend {
    /// Open database at path, creating if needed.
    pub fn open<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        let conn = Connection::open(path)?;
        let backend = Self { conn };
        backend.initialize()?;
        Ok(backend)
    }

    /// Create in-memory database (for testing).
    pub fn open_in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        let backend = Self { conn };
        backend.initialize()?;
        Ok(backend)
    }

    fn initialize(&self) -> StoreResult<()> {
        self.conn.execute_batch(SLOT_SCHEMA)?;
        Ok(())
    }

    /// Last write time of a slot (RFC 3339).
    pub fn updated_at(&self, name: &str) -> StoreResult<Option<String>> {
        Ok(self
            .conn
            .query_row(
                "SELECT updated_at FROM context_slots WHERE name = ?",
                [name],
                |row| row.get(0),
            )
            .optional()?)
    }

    /// Names of all stored slots, sorted.
    pub fn slot_names(&self) -> StoreResult<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT name FROM context_slots ORDER BY name")?;
        let names = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(names)
    }
}

impl SlotBackend for SqliteBackend {
    fn get(&self, name: &str) -> StoreResult<Option<String>> {
        Ok(self
            .conn
            .query_row(
                "SELECT value FROM context_slots WHERE name = ?",
                [name],
                |row| row.get(0),
            )
            .optional()?)
    }

    fn set(&mut self, name: &str, value: &str) -> StoreResult<()> {
        self.conn.execute(
            r#"
            INSERT INTO context_slots (name, value, updated_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(name) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at
            "#,
            params![name, value, chrono::Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    fn remove(&mut self, name: &str) -> StoreResult<()> {
        self.conn
            .execute("DELETE FROM context_slots WHERE name = ?", [name])?;
        Ok(())
    }
}
