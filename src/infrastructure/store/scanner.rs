//! Cursor-based full scans over one index/type

use std::sync::Arc;

use futures::stream::{self, BoxStream, StreamExt};

use crate::domain::store::{
    DocumentStore, Hit, SearchQuery, SearchRequest, SearchResponse, SCROLL_KEEP_ALIVE,
};
use crate::domain::DomainError;

/// Page size used for bulk export scans
pub const DEFAULT_SCAN_PAGE_SIZE: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanOptions {
    pub page_size: usize,
    /// Maximum number of documents to collect; `None` scans everything
    pub doc_count: Option<usize>,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            page_size: 100,
            doc_count: Some(1000),
        }
    }
}

impl ScanOptions {
    pub fn unbounded(page_size: usize) -> Self {
        Self {
            page_size,
            doc_count: None,
        }
    }
}

/// One batch of hits from a scan, with the scan's overall total
#[derive(Debug, Clone, PartialEq)]
pub struct ScanPage {
    pub total: u64,
    pub hits: Vec<Hit>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScanResult<R> {
    pub total: u64,
    pub hits: Vec<R>,
}

/// Pages through every document matching a query using scroll cursors
#[derive(Clone)]
pub struct Scanner {
    store: Arc<dyn DocumentStore>,
    index: String,
    doc_type: String,
}

impl std::fmt::Debug for Scanner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scanner")
            .field("index", &self.index)
            .field("doc_type", &self.doc_type)
            .finish()
    }
}

impl Scanner {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        index: impl Into<String>,
        doc_type: impl Into<String>,
    ) -> Self {
        Self {
            store,
            index: index.into(),
            doc_type: doc_type.into(),
        }
    }

    /// Lazily fetches pages one cursor step at a time
    ///
    /// The first request opens the cursor; each later page is fetched
    /// only when the previous one has been consumed. The scan stops once
    /// `total` hits were produced or the index returns an empty page.
    /// Dropping the stream early still clears the cursor.
    pub fn scan(
        &self,
        query: &str,
        options: ScanOptions,
    ) -> BoxStream<'static, Result<ScanPage, DomainError>> {
        stream::try_unfold(self.cursor(query, options), step).boxed()
    }

    /// Collects a scan, applying `map_fn` to every hit
    pub async fn scan_and_map<R, F>(
        &self,
        query: &str,
        options: ScanOptions,
        mut map_fn: F,
    ) -> Result<ScanResult<R>, DomainError>
    where
        F: FnMut(Hit) -> Result<R, DomainError>,
    {
        let mut cursor = self.cursor(query, options);
        let mut result = ScanResult {
            total: 0,
            hits: Vec::new(),
        };

        while let Some(page) = cursor.next_page().await? {
            result.total = page.total;

            for hit in page.hits {
                match map_fn(hit) {
                    Ok(mapped) => result.hits.push(mapped),
                    Err(e) => {
                        cursor.close().await;
                        return Err(e);
                    }
                }
            }
        }

        Ok(result)
    }

    fn cursor(&self, query: &str, options: ScanOptions) -> ScrollCursor {
        let request = SearchRequest::new(
            self.index.clone(),
            self.doc_type.clone(),
            SearchQuery::for_search_string(query),
            options.page_size,
        )
        .with_scroll(SCROLL_KEEP_ALIVE);

        ScrollCursor {
            store: Arc::clone(&self.store),
            request: Some(request),
            doc_count: options.doc_count,
            scroll_id: None,
            collected: 0,
            total: 0,
            done: false,
        }
    }
}

/// Scan position; owns the server-side cursor until it is cleared
struct ScrollCursor {
    store: Arc<dyn DocumentStore>,
    /// Opening search, taken by the first fetch
    request: Option<SearchRequest>,
    doc_count: Option<usize>,
    scroll_id: Option<String>,
    collected: u64,
    total: u64,
    done: bool,
}

impl ScrollCursor {
    async fn next_page(&mut self) -> Result<Option<ScanPage>, DomainError> {
        if self.done {
            return Ok(None);
        }

        let response = match self.fetch().await {
            Ok(response) => response,
            Err(e) => {
                self.close().await;
                return Err(e);
            }
        };

        if let Some(scroll_id) = response.scroll_id {
            self.scroll_id = Some(scroll_id);
        }

        let wanted = (self.total - self.collected) as usize;
        let hits: Vec<Hit> = response.hits.hits.into_iter().take(wanted).collect();

        if hits.is_empty() {
            if self.collected < self.total {
                tracing::warn!(
                    collected = self.collected,
                    total = self.total,
                    "Scan ended early on an empty page"
                );
            }
            self.close().await;
            return Ok(None);
        }

        self.collected += hits.len() as u64;
        tracing::debug!(collected = self.collected, total = self.total, "Scan page fetched");

        if self.collected >= self.total {
            self.close().await;
        }

        Ok(Some(ScanPage {
            total: self.total,
            hits,
        }))
    }

    async fn fetch(&mut self) -> Result<SearchResponse, DomainError> {
        if let Some(request) = self.request.take() {
            let response = self.store.search(request).await?;
            self.total = cap_total(response.hits.total, self.doc_count);
            return Ok(response);
        }

        let scroll_id = self
            .scroll_id
            .clone()
            .ok_or_else(|| DomainError::store("Scan response did not include a scroll id"))?;

        self.store.scroll(&scroll_id, SCROLL_KEEP_ALIVE).await
    }

    /// Ends the scan and clears the cursor, best-effort
    async fn close(&mut self) {
        self.done = true;

        if let Some(scroll_id) = self.scroll_id.take() {
            if let Err(e) = self.store.clear_scroll(&scroll_id).await {
                tracing::warn!(error = %e, "Failed to clear scroll cursor");
            }
        }
    }
}

impl Drop for ScrollCursor {
    fn drop(&mut self) {
        let Some(scroll_id) = self.scroll_id.take() else {
            return;
        };

        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::warn!(scroll_id = %scroll_id, "Scan dropped outside a runtime, cursor left open");
            return;
        };

        let store = Arc::clone(&self.store);
        runtime.spawn(async move {
            if let Err(e) = store.clear_scroll(&scroll_id).await {
                tracing::warn!(error = %e, "Failed to clear abandoned scroll cursor");
            }
        });
    }
}

async fn step(
    mut cursor: ScrollCursor,
) -> Result<Option<(ScanPage, ScrollCursor)>, DomainError> {
    let page = cursor.next_page().await?;
    Ok(page.map(|page| (page, cursor)))
}

fn cap_total(reported: u64, doc_count: Option<usize>) -> u64 {
    match doc_count {
        Some(limit) => reported.min(limit as u64),
        None => reported,
    }
}
