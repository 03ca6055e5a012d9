//! SQLite cache store
//!
//! A local alternative to Redis for single-machine runs. Expiry is enforced
//! on read; expired rows are purged when the store is opened.

use crate::cache::schema::initialize_schema;
use crate::cache::traits::{CacheError, CacheResult, CacheStore};
use crate::cache::{CacheEntry, FetchKey};
use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// Cache store backed by a SQLite file
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Opens or creates the cache database at `path`
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStore)` - Successfully opened/created database
    /// * `Err(CacheError)` - Failed to open database
    pub fn open(path: &Path) -> CacheResult<Self> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        let store = Self {
            conn: Mutex::new(conn),
        };
        let purged = store.purge_expired()?;
        if purged > 0 {
            tracing::debug!(purged, "Removed expired cache entries");
        }
        Ok(store)
    }

    /// Creates an in-memory cache (nothing survives the process)
    pub fn in_memory() -> CacheResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Deletes expired rows, returning how many were removed
    pub fn purge_expired(&self) -> CacheResult<usize> {
        let now = Utc::now().timestamp_millis();
        let removed = self.lock()?.execute(
            "DELETE FROM cache_entries WHERE expires_at <= ?1",
            params![now],
        )?;
        Ok(removed)
    }

    /// Number of rows currently stored, expired or not
    pub fn len(&self) -> CacheResult<usize> {
        let count: i64 =
            self.lock()?
                .query_row("SELECT COUNT(*) FROM cache_entries", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    pub fn is_empty(&self) -> CacheResult<bool> {
        Ok(self.len()? == 0)
    }

    fn lock(&self) -> CacheResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| CacheError::Poisoned)
    }
}

#[async_trait]
impl CacheStore for SqliteStore {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    async fn ping(&self) -> CacheResult<()> {
        let one: i64 = self.lock()?.query_row("SELECT 1", [], |row| row.get(0))?;
        if one == 1 {
            Ok(())
        } else {
            Err(CacheError::Unavailable("unexpected probe result".to_string()))
        }
    }

    async fn get(&self, key: &FetchKey) -> CacheResult<Option<Vec<u8>>> {
        let now = Utc::now().timestamp_millis();
        let value = self
            .lock()?
            .query_row(
                "SELECT value FROM cache_entries WHERE key = ?1 AND expires_at > ?2",
                params![key.as_str(), now],
                |row| row.get::<_, Vec<u8>>(0),
            )
            .optional()?;
        Ok(value)
    }

    async fn set(&self, entry: CacheEntry) -> CacheResult<()> {
        let now = Utc::now();
        let ttl_ms = i64::try_from(entry.ttl.as_millis()).unwrap_or(i64::MAX);
        let expires_at = now.timestamp_millis().saturating_add(ttl_ms);

        self.lock()?.execute(
            "INSERT OR REPLACE INTO cache_entries (key, value, stored_at, expires_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![entry.key.as_str(), entry.value, now.to_rfc3339(), expires_at],
        )?;
        Ok(())
    }
}
