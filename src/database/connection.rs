//! SQLite connection management for MangaMarks.
//!
//! [`Database`] wraps a `rusqlite::Connection` and brings the schema up to
//! date on open. The key-value table it hosts backs [`crate::storage::SqliteStore`].

use rusqlite::Connection;
use std::path::Path;

use super::migrations;

/// Owned SQLite connection with migrations applied.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Opens (or creates) the database file at `path` and runs migrations.
    ///
    /// # Errors
    /// Returns `rusqlite::Error` if the file cannot be opened or a migration fails.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, rusqlite::Error> {
        let conn = Connection::open(path)?;
        migrations::run_all(&conn)?;
        Ok(Self { conn })
    }

    /// Opens a private in-memory database, discarded on drop.
    pub fn open_in_memory() -> Result<Self, rusqlite::Error> {
        let conn = Connection::open_in_memory()?;
        migrations::run_all(&conn)?;
        Ok(Self { conn })
    }

    /// Returns a reference to the underlying connection.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}
