//! Cache store trait and error types
//!
//! A cache store is an external key-value service reached through three
//! operations: a liveness probe, a get and a set-with-expiry. Values are
//! opaque bytes; encoding is the gateway's business.

use crate::cache::{CacheEntry, FetchKey};
use async_trait::async_trait;
use thiserror::Error;

/// Errors that can occur talking to a cache store
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Cache store unreachable: {0}")]
    Unavailable(String),

    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Failed to decode cached value for {key}: {source}")]
    Decode {
        key: String,
        source: serde_json::Error,
    },

    #[error("Failed to encode value for {key}: {source}")]
    Encode {
        key: String,
        source: serde_json::Error,
    },

    #[error("Cache store lock poisoned")]
    Poisoned,
}

/// Result type for cache store operations
pub type CacheResult<T> = Result<T, CacheError>;

/// Trait for cache backends
///
/// Implementations must tolerate concurrent callers without external locking;
/// keys are partitioned by fetch identity so the last writer of a key wins.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Short backend name for log lines
    fn name(&self) -> &'static str;

    /// Checks that the store can currently serve requests
    async fn ping(&self) -> CacheResult<()>;

    /// Reads the bytes stored under `key`, `None` when absent or expired
    async fn get(&self, key: &FetchKey) -> CacheResult<Option<Vec<u8>>>;

    /// Stores an entry, replacing any previous value for its key
    async fn set(&self, entry: CacheEntry) -> CacheResult<()>;
}
