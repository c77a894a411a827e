//! SQLite-backed key-value store.
//!
//! Holds the serialized snapshot in a single `kv` table, one row per key.
//! Every write replaces the whole value.

use std::path::Path;

use rusqlite::{params, Connection};

use super::{data_dir, KvStore};
use crate::error::StorageError;

/// Default database file name inside the data directory.
pub const DEFAULT_DB_FILE: &str = "drift.db";

/// SQLite database for snapshot storage.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open the database at `~/.config/drift/drift.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the data directory or database cannot be opened.
    pub fn open() -> Result<Self, StorageError> {
        Self::open_at(data_dir()?.join(DEFAULT_DB_FILE))
    }

    /// Open (or create) the database at an explicit path.
    pub fn open_at(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path = path.as_ref();
        let conn = Connection::open(path).map_err(|source| StorageError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        let store = Self { conn };
        store
            .migrate()
            .map_err(|source| StorageError::OpenFailed {
                path: path.to_path_buf(),
                source,
            })?;
        Ok(store)
    }

    /// Open an in-memory database (for tests).
    pub fn open_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory().map_err(|source| StorageError::OpenFailed {
            path: ":memory:".into(),
            source,
        })?;
        let store = Self { conn };
        store.migrate().map_err(|source| StorageError::OpenFailed {
            path: ":memory:".into(),
            source,
        })?;
        Ok(store)
    }

    fn migrate(&self) -> Result<(), rusqlite::Error> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS kv (
                key   TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );",
        )
    }
}

impl KvStore for SqliteStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let result = self
            .conn
            .prepare("SELECT value FROM kv WHERE key = ?1")
            .and_then(|mut stmt| stmt.query_row(params![key], |row| row.get::<_, String>(0)));
        match result {
            Ok(v) => Ok(Some(v)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(classify(key, e, false)),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.conn
            .execute(
                "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
                params![key, value],
            )
            .map_err(|e| classify(key, e, true))?;
        Ok(())
    }
}

fn classify(key: &str, err: rusqlite::Error, writing: bool) -> StorageError {
    if let rusqlite::Error::SqliteFailure(e, _) = &err {
        if matches!(
            e.code,
            rusqlite::ErrorCode::DatabaseLocked | rusqlite::ErrorCode::DatabaseBusy
        ) {
            return StorageError::Locked;
        }
    }
    let key = key.to_string();
    let message = err.to_string();
    if writing {
        StorageError::WriteFailed { key, message }
    } else {
        StorageError::ReadFailed { key, message }
    }
}
