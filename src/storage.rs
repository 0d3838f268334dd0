use crate::dlog;
use crate::error::PersistenceError;
use rusqlite::{Connection, OptionalExtension, params};
use std::collections::HashMap;
use std::path::Path;

/// Named-blob storage, the equivalent of a browser's local storage.
pub trait BlobStore {
    fn load(&self, key: &str) -> Result<Option<String>, PersistenceError>;
    fn save(&mut self, key: &str, blob: &str) -> Result<(), PersistenceError>;
    fn remove(&mut self, key: &str) -> Result<(), PersistenceError>;
}

/// Blobs kept in a single SQLite table.
pub struct SqliteBlobStore {
    conn: Connection,
}

impl SqliteBlobStore {
    pub fn open(path: &Path) -> Result<Self, PersistenceError> {
        let conn = Connection::open(path)?;
        tracing::info!(path = %path.display(), "opened workout database");
        Self::with_connection(conn)
    }

    pub fn in_memory() -> Result<Self, PersistenceError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, PersistenceError> {
        conn.execute_batch(
            r"
            CREATE TABLE IF NOT EXISTS blobs (
                key        TEXT PRIMARY KEY,
                value      TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            ",
        )?;
        Ok(Self { conn })
    }
}

impl BlobStore for SqliteBlobStore {
    fn load(&self, key: &str) -> Result<Option<String>, PersistenceError> {
        let value = self
            .conn
            .query_row("SELECT value FROM blobs WHERE key = ?1", [key], |row| {
                row.get(0)
            })
            .optional()?;
        dlog!("blob_load key={key} found={}", value.is_some());
        Ok(value)
    }

    fn save(&mut self, key: &str, blob: &str) -> Result<(), PersistenceError> {
        let now = chrono::Utc::now().to_rfc3339();
        self.conn.execute(
            r"
            INSERT INTO blobs (key, value, updated_at) VALUES (?1, ?2, ?3)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
            ",
            params![key, blob, now],
        )?;
        dlog!("blob_save key={key} bytes={}", blob.len());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), PersistenceError> {
        let n = self.conn.execute("DELETE FROM blobs WHERE key = ?1", [key])?;
        dlog!("blob_remove key={key} rows={n}");
        Ok(())
    }
}

/// Process-local blobs; nothing survives the process.
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    blobs: HashMap<String, String>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl BlobStore for MemoryBlobStore {
    fn load(&self, key: &str) -> Result<Option<String>, PersistenceError> {
        Ok(self.blobs.get(key).cloned())
    }

    fn save(&mut self, key: &str, blob: &str) -> Result<(), PersistenceError> {
        self.blobs.insert(key.to_string(), blob.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), PersistenceError> {
        self.blobs.remove(key);
        Ok(())
    }
}
