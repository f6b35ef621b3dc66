//! SQLite-backed cache store: survives restarts, shareable between processes.

use std::path::Path;
use std::time::Duration;

use chrono::Utc;
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};

use super::{expiry_after, CacheError, CacheStore, CachedLoad};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS webfinger_cache (
    key        TEXT PRIMARY KEY NOT NULL,
    value      TEXT NOT NULL,
    expires_at INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS webfinger_cache_expires ON webfinger_cache (expires_at);
";

/// Cache entries as JSON rows with a millisecond expiry timestamp.
pub struct SqliteCacheStore {
    conn: Mutex<Connection>,
}

impl SqliteCacheStore {
    /// Open (or create) a cache database at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, CacheError> {
        Self::from_connection(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self, CacheError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, CacheError> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Delete expired rows. Returns how many were deleted.
    pub fn purge_expired(&self) -> Result<usize, CacheError> {
        let now = Utc::now().timestamp_millis();
        let deleted = self
            .conn
            .lock()
            .execute("DELETE FROM webfinger_cache WHERE expires_at <= ?1", params![now])?;
        Ok(deleted)
    }

    fn try_get(&self, key: &str) -> Result<Option<CachedLoad>, CacheError> {
        let now = Utc::now().timestamp_millis();
        let value: Option<String> = self
            .conn
            .lock()
            .query_row(
                "SELECT value FROM webfinger_cache WHERE key = ?1 AND expires_at > ?2",
                params![key, now],
                |row| row.get(0),
            )
            .optional()?;

        value
            .map(|json| serde_json::from_str(&json))
            .transpose()
            .map_err(CacheError::from)
    }

    fn try_set(&self, key: &str, value: &CachedLoad, ttl: Duration) -> Result<(), CacheError> {
        let json = serde_json::to_string(value)?;
        let expires_at = expiry_after(Utc::now(), ttl).timestamp_millis();
        self.conn.lock().execute(
            "INSERT OR REPLACE INTO webfinger_cache (key, value, expires_at) VALUES (?1, ?2, ?3)",
            params![key, json, expires_at],
        )?;
        Ok(())
    }
}

impl CacheStore for SqliteCacheStore {
    fn get(&self, key: &str) -> Option<CachedLoad> {
        match self.try_get(key) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(key, error = %e, "cache read failed");
                None
            }
        }
    }

    fn set(&self, key: &str, value: CachedLoad, ttl: Duration) {
        if let Err(e) = self.try_set(key, &value, ttl) {
            tracing::warn!(key, error = %e, "cache write failed");
        }
    }
}

impl std::fmt::Debug for SqliteCacheStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteCacheStore").finish_non_exhaustive()
    }
}
