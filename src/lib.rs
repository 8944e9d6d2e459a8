//! Saved objects
//!
//! Typed persistence for user-saved objects (templates, searches) kept in
//! an Elasticsearch-compatible index:
//! - Read-through cached lookups with in-flight request coalescing
//! - Prefix search over titles and descriptions
//! - Lazy scroll-based scans for bulk export
//! - Concurrent multi-id deletion

pub mod cli;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use crate::config::AppConfig;

use std::sync::Arc;

use crate::config::StoreConfig;
use crate::domain::{DocumentStore, SavedObjectType};
use crate::infrastructure::cache::CacheFactory;
use crate::infrastructure::services::SavedObjectService;
use crate::infrastructure::store::HttpDocumentStore;

/// Creates the HTTP client for the configured index
pub fn create_store(config: &StoreConfig) -> anyhow::Result<Arc<dyn DocumentStore>> {
    let store = HttpDocumentStore::new(config.url.clone(), config.timeout())?;
    Ok(Arc::new(store))
}

/// Wires a service for `T` from configuration: HTTP store, configured
/// cache backend and cache TTL
pub async fn create_service<T: SavedObjectType>(
    config: &AppConfig,
) -> anyhow::Result<SavedObjectService<T>> {
    let store = create_store(&config.store)?;
    let cache = CacheFactory::new().create(&config.cache).await?;

    tracing::debug!(
        url = %config.store.url,
        index = %config.store.index,
        cache = %config.cache.cache_type,
        "Creating saved object service"
    );

    let service = SavedObjectService::new(store, cache, config.store.index.clone())
        .with_ttl(config.cache.ttl());

    Ok(service)
}
