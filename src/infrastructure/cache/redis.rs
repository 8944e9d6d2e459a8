//! Redis cache strategy, shared between processes

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, AsyncIter, Client, RedisError};

use crate::domain::cache::Cache;
use crate::domain::DomainError;

#[derive(Debug, Clone)]
pub struct RedisCacheConfig {
    /// Connection URL, e.g. `redis://127.0.0.1:6379`
    pub url: String,
    /// Namespace joined to every key with `:`
    pub key_prefix: Option<String>,
}

impl RedisCacheConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            key_prefix: None,
        }
    }

    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = Some(prefix.into());
        self
    }
}

/// `Cache` strategy over a Redis connection manager
///
/// Entries expire through `SETEX`. Pattern deletes walk the keyspace with
/// `SCAN` and are limited to this cache's prefix when one is set.
#[derive(Clone)]
pub struct RedisCache {
    connection: ConnectionManager,
    key_prefix: Option<String>,
}

impl fmt::Debug for RedisCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisCache")
            .field("key_prefix", &self.key_prefix)
            .finish_non_exhaustive()
    }
}

fn failed(action: String) -> impl FnOnce(RedisError) -> DomainError {
    move |e| DomainError::cache(format!("Failed to {}: {}", action, e))
}

fn prefixed(prefix: Option<&str>, key: &str) -> String {
    match prefix {
        Some(prefix) => format!("{}:{}", prefix, key),
        None => key.to_string(),
    }
}

impl RedisCache {
    pub async fn new(config: RedisCacheConfig) -> Result<Self, DomainError> {
        let client =
            Client::open(config.url.as_str()).map_err(failed("create Redis client".into()))?;
        let connection = ConnectionManager::new(client)
            .await
            .map_err(failed(format!("connect to {}", config.url)))?;

        tracing::debug!(prefix = ?config.key_prefix, "Connected to Redis cache");

        Ok(Self {
            connection,
            key_prefix: config.key_prefix,
        })
    }

    fn key(&self, key: &str) -> String {
        prefixed(self.key_prefix.as_deref(), key)
    }

    async fn keys_matching(&self, pattern: &str) -> Result<Vec<String>, DomainError> {
        let pattern = self.key(pattern);
        let mut conn = self.connection.clone();

        let mut iter: AsyncIter<'_, String> = conn
            .scan_match(&pattern)
            .await
            .map_err(failed(format!("scan keys matching '{}'", pattern)))?;

        let mut keys = Vec::new();
        while let Some(key) = iter.next_item().await {
            keys.push(key);
        }

        Ok(keys)
    }
}

#[async_trait]
impl Cache for RedisCache {
    async fn get_raw(&self, key: &str) -> Result<Option<String>, DomainError> {
        let mut conn = self.connection.clone();

        conn.get(self.key(key))
            .await
            .map_err(failed(format!("read '{}'", key)))
    }

    async fn set_raw(&self, key: &str, value: &str, ttl: Duration) -> Result<(), DomainError> {
        let mut conn = self.connection.clone();

        conn.set_ex::<_, _, ()>(self.key(key), value, ttl.as_secs().max(1))
            .await
            .map_err(failed(format!("write '{}'", key)))
    }

    async fn delete(&self, key: &str) -> Result<bool, DomainError> {
        let mut conn = self.connection.clone();

        let removed: usize = conn
            .del(self.key(key))
            .await
            .map_err(failed(format!("delete '{}'", key)))?;

        Ok(removed > 0)
    }

    async fn delete_pattern(&self, pattern: &str) -> Result<usize, DomainError> {
        let keys = self.keys_matching(pattern).await?;

        if keys.is_empty() {
            return Ok(0);
        }

        let mut conn = self.connection.clone();
        conn.del(&keys)
            .await
            .map_err(failed(format!("delete keys matching '{}'", pattern)))
    }

    async fn exists(&self, key: &str) -> Result<bool, DomainError> {
        let mut conn = self.connection.clone();

        conn.exists(self.key(key))
            .await
            .map_err(failed(format!("check '{}'", key)))
    }

    async fn clear(&self) -> Result<(), DomainError> {
        if self.key_prefix.is_some() {
            self.delete_pattern("*").await?;
            return Ok(());
        }

        let mut conn = self.connection.clone();
        redis::cmd("FLUSHDB")
            .query_async::<()>(&mut conn)
            .await
            .map_err(failed("flush database".into()))
    }

    async fn size(&self) -> Result<usize, DomainError> {
        if self.key_prefix.is_some() {
            return Ok(self.keys_matching("*").await?.len());
        }

        let mut conn = self.connection.clone();
        redis::cmd("DBSIZE")
            .query_async(&mut conn)
            .await
            .map_err(failed("read database size".into()))
    }
}
