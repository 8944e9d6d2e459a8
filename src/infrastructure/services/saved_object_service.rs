//! Saved object service - cached retrieval, search, scans and deletion
//! for one saved object type

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use futures::future::try_join_all;
use futures::stream::{self, BoxStream, StreamExt, TryStreamExt};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, info, warn};

use crate::domain::cache::{Cache, CacheExt, CacheKey};
use crate::domain::saved_object::{
    url_for, FindResult, LoaderProperties, SavedObjectRecord, SavedObjectType,
};
use crate::domain::store::{DocumentStore, Hit, SearchQuery, SearchRequest};
use crate::domain::DomainError;
use crate::infrastructure::cache::RequestCoalescer;
use crate::infrastructure::store::{ScanOptions, Scanner};

use super::saved_object::{record_from_hit, SavedObject};

/// Number of hits returned by `find`
pub const FIND_PAGE_SIZE: usize = 100;

/// Default lifetime of cached lookups
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(3600);

/// One or more ids to act on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdList(Vec<String>);

impl IdList {
    pub fn into_vec(self) -> Vec<String> {
        self.0
    }
}

impl From<&str> for IdList {
    fn from(id: &str) -> Self {
        Self(vec![id.to_string()])
    }
}

impl From<String> for IdList {
    fn from(id: String) -> Self {
        Self(vec![id])
    }
}

impl From<Vec<String>> for IdList {
    fn from(ids: Vec<String>) -> Self {
        Self(ids)
    }
}

impl From<Vec<&str>> for IdList {
    fn from(ids: Vec<&str>) -> Self {
        Self(ids.into_iter().map(str::to_string).collect())
    }
}

impl<const N: usize> From<[&str; N]> for IdList {
    fn from(ids: [&str; N]) -> Self {
        Self(ids.iter().map(|id| id.to_string()).collect())
    }
}

/// Service over all saved objects of type `T`
///
/// Single fetches and searches are read-through cached in the injected
/// cache. Identical lookups that overlap share one store request. Writes
/// never invalidate cached entries; use `invalidate` or `invalidate_all`
/// when fresh reads are needed.
pub struct SavedObjectService<T: SavedObjectType> {
    store: Arc<dyn DocumentStore>,
    cache: Arc<dyn Cache>,
    index: String,
    ttl: Duration,
    scanner: Scanner,
    lookups: RequestCoalescer<SavedObjectRecord<T>>,
    searches: RequestCoalescer<FindResult<T>>,
}

impl<T: SavedObjectType> SavedObjectService<T> {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        cache: Arc<dyn Cache>,
        index: impl Into<String>,
    ) -> Self {
        let index = index.into();

        Self {
            scanner: Scanner::new(Arc::clone(&store), index.clone(), T::TYPE),
            store,
            cache,
            index,
            ttl: DEFAULT_CACHE_TTL,
            lookups: RequestCoalescer::new(),
            searches: RequestCoalescer::new(),
        }
    }

    /// Sets the lifetime of entries this service writes to the cache
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Document type served by this service
    pub fn object_type(&self) -> &'static str {
        T::TYPE
    }

    pub fn loader_properties(&self) -> LoaderProperties {
        T::loader_properties()
    }

    /// Fetches one object by id, or a fresh unsaved object when `id` is
    /// `None` or empty
    pub async fn get(&self, id: Option<&str>) -> Result<SavedObjectRecord<T>, DomainError> {
        let Some(id) = id.filter(|id| !id.is_empty()) else {
            return self.object(None).init().await;
        };

        let key = CacheKey::by_id(T::TYPE, id).to_string();

        if let Some(record) = self.cached::<SavedObjectRecord<T>>(&key).await {
            debug!(object_type = T::TYPE, id, "Cache hit for saved object");
            return Ok(record);
        }

        debug!(object_type = T::TYPE, id, "Cache miss, fetching saved object");

        let object = self.object(Some(id.to_string()));
        let cache = Arc::clone(&self.cache);
        let ttl = self.ttl;
        let cache_key = key.clone();

        self.lookups
            .run(&key, move || async move {
                let record = object.init().await?;
                remember(cache.as_ref(), &cache_key, &record, ttl).await;
                Ok(record)
            })
            .await
    }

    /// Client-side route of an object
    pub fn url_for(&self, id: &str) -> String {
        url_for::<T>(id)
    }

    /// Deletes one or more objects concurrently
    ///
    /// Fails with the first `DomainError::Delete` observed. Deletes that
    /// already went through are not rolled back, and the remaining ones
    /// keep running to completion.
    pub async fn delete(&self, ids: impl Into<IdList>) -> Result<(), DomainError> {
        let ids = ids.into().into_vec();
        let count = ids.len();

        let deletions = ids.into_iter().map(|id| {
            let object = self.object(Some(id.clone()));
            let task = tokio::spawn(async move { object.delete().await });

            async move {
                match task.await {
                    Ok(result) => result.map_err(|e| DomainError::delete(id, e)),
                    Err(e) => Err(DomainError::delete(
                        id,
                        DomainError::internal(format!("Delete task failed: {}", e)),
                    )),
                }
            }
        });

        try_join_all(deletions).await?;

        info!(object_type = T::TYPE, count, "Deleted saved objects");
        Ok(())
    }

    /// Streams every object matching `query`, fetching `page_size` at a time
    pub fn scan_all(
        &self,
        query: &str,
        page_size: usize,
    ) -> BoxStream<'static, Result<SavedObjectRecord<T>, DomainError>> {
        self.scanner
            .scan(query, ScanOptions::unbounded(page_size))
            .map_ok(|page| {
                stream::iter(
                    page.hits
                        .into_iter()
                        .map(|hit| Ok::<_, DomainError>(record_from_hit::<T>(&hit))),
                )
            })
            .try_flatten()
            .boxed()
    }

    /// Collects a full scan into a single result
    pub async fn scan_all_collect(
        &self,
        query: &str,
        page_size: usize,
    ) -> Result<FindResult<T>, DomainError> {
        let result = self
            .scanner
            .scan_and_map(query, ScanOptions::unbounded(page_size), |hit| {
                Ok(record_from_hit::<T>(&hit))
            })
            .await?;

        Ok(FindResult {
            total: result.total,
            hits: result.hits,
        })
    }

    /// Searches titles and descriptions by prefix; empty matches everything
    pub async fn find(&self, search: &str) -> Result<FindResult<T>, DomainError> {
        let key = CacheKey::find(T::TYPE, search).to_string();

        if let Some(result) = self.cached::<FindResult<T>>(&key).await {
            debug!(object_type = T::TYPE, search, "Cache hit for search");
            return Ok(result);
        }

        let request = SearchRequest::new(
            self.index.clone(),
            T::TYPE,
            SearchQuery::for_search_string(search),
            FIND_PAGE_SIZE,
        );
        let store = Arc::clone(&self.store);
        let cache = Arc::clone(&self.cache);
        let ttl = self.ttl;
        let cache_key = key.clone();

        self.searches
            .run(&key, move || async move {
                let response = store.search(request).await?;
                let hits = response.hits.hits.iter().map(record_from_hit::<T>).collect();

                let result = FindResult {
                    total: response.hits.total,
                    hits,
                };
                remember(cache.as_ref(), &cache_key, &result, ttl).await;
                Ok(result)
            })
            .await
    }

    /// Turns a raw index hit into a record with `id` and `url` set
    ///
    /// The stored source is kept as is; fields the typed view cannot decode
    /// fall back to their defaults there.
    pub fn map_hit(&self, hit: &Hit) -> SavedObjectRecord<T> {
        record_from_hit(hit)
    }

    /// Stores the record's source under its id
    pub async fn save(&self, record: &SavedObjectRecord<T>) -> Result<String, DomainError> {
        let id = self
            .object(Some(record.id.clone()))
            .save(record.source())
            .await?;

        info!(object_type = T::TYPE, id = %id, title = record.title(), "Saved object stored");
        Ok(id)
    }

    /// Drops the cached single fetch for `id`
    pub async fn invalidate(&self, id: &str) -> Result<bool, DomainError> {
        self.cache
            .delete(&CacheKey::by_id(T::TYPE, id).to_string())
            .await
    }

    /// Drops every cached fetch and search of this type
    pub async fn invalidate_all(&self) -> Result<usize, DomainError> {
        let removed = self
            .cache
            .delete_pattern(&CacheKey::type_pattern(T::TYPE))
            .await?;

        debug!(object_type = T::TYPE, removed, "Invalidated cached saved objects");
        Ok(removed)
    }

    fn object(&self, id: Option<String>) -> SavedObject<T> {
        SavedObject::new(Arc::clone(&self.store), self.index.clone(), id)
    }

    async fn cached<V: DeserializeOwned + Send>(&self, key: &str) -> Option<V> {
        match self.cache.get(key).await {
            Ok(value) => value,
            Err(e) => {
                warn!(key, error = %e, "Cache read failed, falling back to store");
                None
            }
        }
    }
}

impl<T: SavedObjectType> fmt::Debug for SavedObjectService<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SavedObjectService")
            .field("object_type", &T::TYPE)
            .field("index", &self.index)
            .field("ttl", &self.ttl)
            .field("cache", &self.cache)
            .finish()
    }
}

async fn remember<V>(cache: &dyn Cache, key: &str, value: &V, ttl: Duration)
where
    V: Serialize + Send + Sync,
{
    if let Err(e) = cache.set(key, value, ttl).await {
        warn!(key, error = %e, "Cache write failed");
    }
}
