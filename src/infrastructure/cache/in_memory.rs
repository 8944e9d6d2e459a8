//! Process-local cache using moka with per-entry expiry

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use moka::future::Cache as MokaCache;
use moka::Expiry;

use crate::domain::cache::{pattern_to_regex, Cache};
use crate::domain::DomainError;

#[derive(Debug, Clone)]
pub struct InMemoryCacheConfig {
    /// Maximum number of entries
    pub max_capacity: u64,
    /// Longest lifetime any entry may get, whatever TTL the caller asks for
    pub max_ttl: Duration,
}

impl Default for InMemoryCacheConfig {
    fn default() -> Self {
        Self {
            max_capacity: 10_000,
            max_ttl: Duration::from_secs(3600),
        }
    }
}

impl InMemoryCacheConfig {
    pub fn with_max_capacity(mut self, capacity: u64) -> Self {
        self.max_capacity = capacity;
        self
    }

    pub fn with_max_ttl(mut self, ttl: Duration) -> Self {
        self.max_ttl = ttl;
        self
    }
}

#[derive(Debug, Clone)]
struct StoredValue {
    json: Arc<str>,
    ttl: Duration,
}

/// Expires each entry after the TTL it was written with
struct WrittenTtl;

impl Expiry<String, StoredValue> for WrittenTtl {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &StoredValue,
        _at: Instant,
    ) -> Option<Duration> {
        Some(value.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &StoredValue,
        _at: Instant,
        _remaining: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

/// In-memory `Cache` strategy, bounded by entry count
#[derive(Debug)]
pub struct InMemoryCache {
    entries: MokaCache<String, StoredValue>,
    config: InMemoryCacheConfig,
}

impl InMemoryCache {
    pub fn new() -> Self {
        Self::with_config(InMemoryCacheConfig::default())
    }

    pub fn with_config(config: InMemoryCacheConfig) -> Self {
        let entries = MokaCache::builder()
            .max_capacity(config.max_capacity)
            .expire_after(WrittenTtl)
            .build();

        Self { entries, config }
    }

    pub fn config(&self) -> &InMemoryCacheConfig {
        &self.config
    }

    async fn matching_keys(&self, pattern: &str) -> Result<Vec<String>, DomainError> {
        let regex = pattern_to_regex(pattern)?;
        self.entries.run_pending_tasks().await;

        Ok(self
            .entries
            .iter()
            .filter(|(key, _)| regex.is_match(key.as_str()))
            .map(|(key, _)| key.to_string())
            .collect())
    }
}

impl Default for InMemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Cache for InMemoryCache {
    async fn get_raw(&self, key: &str) -> Result<Option<String>, DomainError> {
        Ok(self.entries.get(key).await.map(|value| value.json.to_string()))
    }

    async fn set_raw(&self, key: &str, value: &str, ttl: Duration) -> Result<(), DomainError> {
        let stored = StoredValue {
            json: Arc::from(value),
            ttl: ttl.min(self.config.max_ttl),
        };

        self.entries.insert(key.to_string(), stored).await;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, DomainError> {
        Ok(self.entries.remove(key).await.is_some())
    }

    async fn delete_pattern(&self, pattern: &str) -> Result<usize, DomainError> {
        let mut removed = 0;

        for key in self.matching_keys(pattern).await? {
            if self.entries.remove(&key).await.is_some() {
                removed += 1;
            }
        }

        Ok(removed)
    }

    async fn clear(&self) -> Result<(), DomainError> {
        self.entries.invalidate_all();
        self.entries.run_pending_tasks().await;
        Ok(())
    }

    async fn size(&self) -> Result<usize, DomainError> {
        self.entries.run_pending_tasks().await;
        Ok(self.entries.entry_count() as usize)
    }
}
