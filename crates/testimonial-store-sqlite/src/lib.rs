use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension};
use testimonial_store::{ensure_within_quota, KeyValueStore, StoreError, DEFAULT_QUOTA_BYTES};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use tracing::debug;

const CREATE_LOCAL_STORAGE_SQL: &str = r"
CREATE TABLE IF NOT EXISTS local_storage (
  key TEXT PRIMARY KEY,
  value TEXT NOT NULL,
  updated_at TEXT NOT NULL
);
";

/// A browser-profile style key-value store kept in one SQLite file.
pub struct SqliteKeyValueStore {
    conn: Connection,
    quota_bytes: Option<usize>,
}

impl std::fmt::Debug for SqliteKeyValueStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteKeyValueStore")
            .field("path", &self.conn.path())
            .field("quota_bytes", &self.quota_bytes)
            .finish()
    }
}

impl SqliteKeyValueStore {
    /// Open (creating if needed) a profile database.
    ///
    /// # Errors
    /// Returns an error when the database cannot be opened or configured.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent).with_context(|| {
                format!("failed to create profile directory {}", parent.display())
            })?;
        }

        let conn = Connection::open(path)
            .with_context(|| format!("failed to open sqlite profile at {}", path.display()))?;

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA foreign_keys = ON;
             PRAGMA busy_timeout = 5000;",
        )
        .context("failed to configure sqlite pragmas")?;

        Self::from_connection(conn)
    }

    /// # Errors
    /// Returns an error when the in-memory schema cannot be created.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("failed to open in-memory sqlite")?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(CREATE_LOCAL_STORAGE_SQL)
            .context("failed to create local_storage table")?;
        debug!("profile schema ready");
        Ok(Self { conn, quota_bytes: Some(DEFAULT_QUOTA_BYTES) })
    }

    /// Replace the byte quota; `None` disables the limit.
    #[must_use]
    pub fn with_quota(mut self, quota_bytes: Option<usize>) -> Self {
        self.quota_bytes = quota_bytes;
        self
    }

    #[must_use]
    pub fn quota_bytes(&self) -> Option<usize> {
        self.quota_bytes
    }

    /// Total bytes held by every key and value.
    ///
    /// # Errors
    /// Returns [`StoreError::Backend`] when the usage query fails.
    pub fn used_bytes(&self) -> Result<usize, StoreError> {
        used_bytes_excluding(&self.conn, None)
    }
}

impl KeyValueStore for SqliteKeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.conn
            .query_row("SELECT value FROM local_storage WHERE key = ?1", params![key], |row| {
                row.get::<_, String>(0)
            })
            .optional()
            .map_err(backend_error)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        let updated_at = OffsetDateTime::now_utc()
            .format(&Rfc3339)
            .map_err(|err| StoreError::Backend(err.to_string()))?;
        let quota = self.quota_bytes;

        let tx = self.conn.transaction().map_err(backend_error)?;
        let used_by_others = used_bytes_excluding(&tx, Some(key))?;
        ensure_within_quota(used_by_others, key, value, quota)?;
        tx.execute(
            "INSERT INTO local_storage(key, value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            params![key, value, updated_at],
        )
        .map_err(backend_error)?;
        tx.commit().map_err(backend_error)?;

        debug!(key, bytes = value.len(), "profile value written");
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        self.conn
            .execute("DELETE FROM local_storage WHERE key = ?1", params![key])
            .map_err(backend_error)?;
        Ok(())
    }
}

fn backend_error(err: rusqlite::Error) -> StoreError {
    StoreError::Backend(err.to_string())
}

fn used_bytes_excluding(conn: &Connection, key: Option<&str>) -> Result<usize, StoreError> {
    let total: i64 = conn
        .query_row(
            "SELECT COALESCE(SUM(LENGTH(CAST(key AS BLOB)) + LENGTH(CAST(value AS BLOB))), 0)
             FROM local_storage
             WHERE ?1 IS NULL OR key <> ?1",
            params![key],
            |row| row.get(0),
        )
        .map_err(backend_error)?;
    usize::try_from(total).map_err(|err| StoreError::Backend(err.to_string()))
}
