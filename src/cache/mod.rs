//! Read-through page cache
//!
//! This module handles:
//! - Deriving stable fetch keys from an operation's identifying arguments
//! - Encoding cached values in a versioned envelope
//! - The cache gateway, which wraps an async operation with read-through,
//!   write-through caching and degrades to direct execution when the store
//!   is unreachable
//! - Redis and SQLite store backends
//!
//! The gateway does not coalesce calls: two concurrent misses on the same key
//! both run the wrapped operation and both write the result.

mod redis_store;
mod schema;
mod sqlite;
mod traits;

pub use redis_store::RedisStore;
pub use sqlite::SqliteStore;
pub use traits::{CacheError, CacheResult, CacheStore};

use crate::config::{CacheBackend, CacheConfig};
use crate::Result;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Version written into every cached envelope
pub const ENCODING_VERSION: u32 = 1;

/// Deterministic identity of a cacheable call
///
/// Formed as `<operation>-<arg>,<arg>,...` from the arguments that identify
/// the call. Transient resources (a browser session, a connection) must be
/// left out so that the same logical call always maps to the same key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FetchKey(String);

impl FetchKey {
    /// Builds a key from the operation name and its identifying arguments
    pub fn new<I>(operation: &str, args: I) -> Self
    where
        I: IntoIterator,
        I::Item: fmt::Display,
    {
        let args = args
            .into_iter()
            .map(|arg| arg.to_string())
            .collect::<Vec<_>>()
            .join(",");
        Self(format!("{}-{}", operation, args))
    }

    /// Builds a key from positional arguments, skipping the indices in `ignored`
    ///
    /// # Examples
    ///
    /// ```
    /// use shop_harvest::cache::FetchKey;
    ///
    /// let a = FetchKey::from_positional("get_page", &[&"session-1", &"https://example.com/"], &[0]);
    /// let b = FetchKey::from_positional("get_page", &[&"session-2", &"https://example.com/"], &[0]);
    /// assert_eq!(a, b);
    /// assert_eq!(a.as_str(), "get_page-https://example.com/");
    /// ```
    pub fn from_positional(operation: &str, args: &[&dyn fmt::Display], ignored: &[usize]) -> Self {
        Self::new(
            operation,
            args.iter()
                .enumerate()
                .filter(|(index, _)| !ignored.contains(index))
                .map(|(_, arg)| arg),
        )
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FetchKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A value ready to be written to a store
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub key: FetchKey,
    pub value: Vec<u8>,
    pub ttl: Duration,
}

#[derive(Serialize)]
struct EnvelopeRef<'a, T> {
    v: u32,
    value: &'a T,
}

#[derive(Deserialize)]
struct Envelope<T> {
    value: T,
}

#[derive(Deserialize)]
struct VersionProbe {
    v: u32,
}

/// Serializes `value` into the current envelope format
pub fn encode_value<T: Serialize>(key: &FetchKey, value: &T) -> CacheResult<Vec<u8>> {
    serde_json::to_vec(&EnvelopeRef {
        v: ENCODING_VERSION,
        value,
    })
    .map_err(|source| CacheError::Encode {
        key: key.to_string(),
        source,
    })
}

/// Deserializes an envelope
///
/// Returns `Ok(None)` for an envelope written under another encoding version,
/// which callers treat as a miss.
pub fn decode_value<T: DeserializeOwned>(key: &FetchKey, bytes: &[u8]) -> CacheResult<Option<T>> {
    let decode_err = |source| CacheError::Decode {
        key: key.to_string(),
        source,
    };

    let probe: VersionProbe = serde_json::from_slice(bytes).map_err(decode_err)?;
    if probe.v != ENCODING_VERSION {
        return Ok(None);
    }

    let envelope: Envelope<T> = serde_json::from_slice(bytes).map_err(decode_err)?;
    Ok(Some(envelope.value))
}

/// Wraps async operations with a read-through cache
#[derive(Clone)]
pub struct CacheGateway {
    store: Option<Arc<dyn CacheStore>>,
}

impl CacheGateway {
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self { store: Some(store) }
    }

    /// A gateway that always runs the operation directly
    pub fn disabled() -> Self {
        Self { store: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.store.is_some()
    }

    /// Runs `operation` through the cache under `key`
    ///
    /// 1. Probe the store. If it is unreachable, log and return
    ///    `operation()` without caching.
    /// 2. On a hit, decode and return the stored value; `operation` is not run.
    /// 3. On a miss, run `operation`, store its encoded result with `ttl`
    ///    and return it.
    ///
    /// Store and decode failures on the lookup and miss paths propagate.
    /// Errors returned by `operation` propagate and nothing is stored.
    pub async fn cached_call<T, F, Fut>(&self, key: FetchKey, ttl: Duration, operation: F) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let Some(store) = &self.store else {
            return operation().await;
        };

        if let Err(e) = store.ping().await {
            tracing::error!(backend = store.name(), "Cache store is not available: {}", e);
            return operation().await;
        }

        tracing::trace!(key = %key, ttl_secs = ttl.as_secs(), "Cache lookup");

        if let Some(bytes) = store.get(&key).await? {
            if let Some(value) = decode_value(&key, &bytes)? {
                tracing::trace!(key = %key, "Result found in cache");
                return Ok(value);
            }
            tracing::debug!(key = %key, "Cached entry has a stale encoding, refreshing");
        } else {
            tracing::trace!(key = %key, "Result not found in cache");
        }

        let value = operation().await?;
        let bytes = encode_value(&key, &value)?;
        store.set(CacheEntry { key: key.clone(), value: bytes, ttl }).await?;
        tracing::trace!(key = %key, "Value is now in cache");

        Ok(value)
    }
}

/// Builds the gateway selected by the configuration
///
/// A backend that cannot even be constructed is logged and replaced by a
/// disabled gateway; cache problems never stop a run.
pub fn open_gateway(config: &CacheConfig) -> CacheGateway {
    match config.backend {
        CacheBackend::Disabled => {
            tracing::info!("Page cache disabled");
            CacheGateway::disabled()
        }
        CacheBackend::Redis => match RedisStore::new(&config.redis_url, config.connect_timeout()) {
            Ok(store) => {
                tracing::info!(url = %config.redis_url, "Using redis page cache");
                CacheGateway::new(Arc::new(store))
            }
            Err(e) => {
                tracing::error!("Failed to set up redis cache, caching disabled: {}", e);
                CacheGateway::disabled()
            }
        },
        CacheBackend::Sqlite => match SqliteStore::open(&config.sqlite_path) {
            Ok(store) => {
                tracing::info!(path = %config.sqlite_path.display(), "Using sqlite page cache");
                CacheGateway::new(Arc::new(store))
            }
            Err(e) => {
                tracing::error!("Failed to open sqlite cache, caching disabled: {}", e);
                CacheGateway::disabled()
            }
        },
    }
}
