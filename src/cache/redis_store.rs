//! Redis cache store

use crate::cache::traits::{CacheError, CacheResult, CacheStore};
use crate::cache::{CacheEntry, FetchKey};
use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use std::time::Duration;
use tokio::sync::Mutex;

/// Cache store backed by a Redis server
///
/// The multiplexed connection is opened lazily on first use and shared by
/// all callers. A failed connection attempt is not remembered, so a server
/// that comes back mid-run is picked up by the next probe.
pub struct RedisStore {
    client: redis::Client,
    connection: Mutex<Option<MultiplexedConnection>>,
    connect_timeout: Duration,
}

impl RedisStore {
    /// Creates a store for `url` without connecting
    pub fn new(url: &str, connect_timeout: Duration) -> CacheResult<Self> {
        let client = redis::Client::open(url)?;
        Ok(Self {
            client,
            connection: Mutex::new(None),
            connect_timeout,
        })
    }

    async fn connection(&self) -> CacheResult<MultiplexedConnection> {
        let mut guard = self.connection.lock().await;
        if let Some(conn) = guard.as_ref() {
            return Ok(conn.clone());
        }

        let conn = tokio::time::timeout(
            self.connect_timeout,
            self.client.get_multiplexed_async_connection(),
        )
        .await
        .map_err(|_| {
            CacheError::Unavailable(format!(
                "no connection within {:?}",
                self.connect_timeout
            ))
        })??;

        *guard = Some(conn.clone());
        Ok(conn)
    }

    async fn forget_connection(&self) {
        *self.connection.lock().await = None;
    }
}

#[async_trait]
impl CacheStore for RedisStore {
    fn name(&self) -> &'static str {
        "redis"
    }

    async fn ping(&self) -> CacheResult<()> {
        let mut conn = self.connection().await?;
        let reply: redis::RedisResult<String> = redis::cmd("PING").query_async(&mut conn).await;
        match reply {
            Ok(pong) if pong == "PONG" => Ok(()),
            Ok(other) => Err(CacheError::Unavailable(format!(
                "unexpected PING reply {:?}",
                other
            ))),
            Err(e) => {
                self.forget_connection().await;
                Err(e.into())
            }
        }
    }

    async fn get(&self, key: &FetchKey) -> CacheResult<Option<Vec<u8>>> {
        let mut conn = self.connection().await?;
        let value: Option<Vec<u8>> = conn.get(key.as_str()).await?;
        Ok(value)
    }

    async fn set(&self, entry: CacheEntry) -> CacheResult<()> {
        let mut conn = self.connection().await?;
        // SETEX rejects a zero expiry
        let seconds = entry.ttl.as_secs().max(1);
        conn.set_ex::<_, _, ()>(entry.key.as_str(), entry.value, seconds)
            .await?;
        Ok(())
    }
}
