//! In-memory document store for tests and offline use

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::domain::store::{
    DefaultOperator, DocumentStore, Hit, SearchQuery, SearchRequest, SearchResponse,
};
use crate::domain::DomainError;

type Collection = BTreeMap<String, Value>;

#[derive(Debug)]
struct ScrollCursor {
    remaining: Vec<Hit>,
    page_size: usize,
    total: u64,
}

/// Document store holding every index/type in memory
///
/// Documents are returned in id order. Supports the same query subset the
/// saved object service emits, scroll cursors, per-operation call
/// counters, optional latency and injected delete failures.
#[derive(Debug, Default)]
pub struct InMemoryDocumentStore {
    collections: Mutex<HashMap<(String, String), Collection>>,
    scrolls: Mutex<HashMap<String, ScrollCursor>>,
    calls: Mutex<HashMap<&'static str, usize>>,
    delete_failures: Mutex<HashMap<String, DomainError>>,
    next_scroll: AtomicU64,
    latency: Option<Duration>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delays every operation, letting tests overlap concurrent calls
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn with_document(self, index: &str, doc_type: &str, id: &str, source: Value) -> Self {
        guard(&self.collections)
            .entry((index.to_string(), doc_type.to_string()))
            .or_default()
            .insert(id.to_string(), source);
        self
    }

    /// Makes deleting `id` fail with `error`
    pub fn with_delete_failure(self, id: &str, error: DomainError) -> Self {
        guard(&self.delete_failures).insert(id.to_string(), error);
        self
    }

    /// Number of calls made to an operation (`get`, `index`, `delete`,
    /// `search`, `scroll`, `clear_scroll`)
    pub fn call_count(&self, operation: &str) -> usize {
        guard(&self.calls).get(operation).copied().unwrap_or(0)
    }

    pub fn contains(&self, index: &str, doc_type: &str, id: &str) -> bool {
        guard(&self.collections)
            .get(&(index.to_string(), doc_type.to_string()))
            .is_some_and(|c| c.contains_key(id))
    }

    pub fn document_count(&self, index: &str, doc_type: &str) -> usize {
        guard(&self.collections)
            .get(&(index.to_string(), doc_type.to_string()))
            .map_or(0, |c| c.len())
    }

    /// Number of scroll cursors not yet cleared
    pub fn open_scrolls(&self) -> usize {
        guard(&self.scrolls).len()
    }

    async fn enter(&self, operation: &'static str) {
        *guard(&self.calls).entry(operation).or_insert(0) += 1;

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }

    fn next_page(cursor: &mut ScrollCursor) -> Vec<Hit> {
        let take = cursor.page_size.min(cursor.remaining.len());
        cursor.remaining.drain(..take).collect()
    }
}

fn guard<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Evaluates a query against a document source
pub fn matches_query(query: &SearchQuery, source: &Value) -> bool {
    match query {
        SearchQuery::MatchAll {} => true,
        SearchQuery::SimpleQueryString {
            query,
            fields,
            default_operator,
        } => {
            let words: Vec<String> = fields
                .iter()
                .map(|f| f.split('^').next().unwrap_or(f))
                .filter_map(|f| source.get(f).and_then(Value::as_str))
                .flat_map(tokenize)
                .collect();

            let mut terms = query.split_whitespace().map(|t| term_matches(t, &words));

            match default_operator {
                DefaultOperator::And => terms.all(|m| m),
                DefaultOperator::Or => terms.any(|m| m),
            }
        }
    }
}

fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect()
}

fn term_matches(term: &str, words: &[String]) -> bool {
    let term = term.to_lowercase();

    match term.strip_suffix('*') {
        Some(prefix) => words.iter().any(|w| w.starts_with(prefix)),
        None => words.iter().any(|w| *w == term),
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn get(
        &self,
        index: &str,
        doc_type: &str,
        id: &str,
    ) -> Result<Option<Hit>, DomainError> {
        self.enter("get").await;

        Ok(guard(&self.collections)
            .get(&(index.to_string(), doc_type.to_string()))
            .and_then(|c| c.get(id))
            .map(|source| Hit::new(id, source.clone())))
    }

    async fn index(
        &self,
        index: &str,
        doc_type: &str,
        id: &str,
        source: &Value,
    ) -> Result<(), DomainError> {
        self.enter("index").await;

        guard(&self.collections)
            .entry((index.to_string(), doc_type.to_string()))
            .or_default()
            .insert(id.to_string(), source.clone());
        Ok(())
    }

    async fn delete(&self, index: &str, doc_type: &str, id: &str) -> Result<(), DomainError> {
        self.enter("delete").await;

        if let Some(error) = guard(&self.delete_failures).get(id) {
            return Err(error.clone());
        }

        guard(&self.collections)
            .get_mut(&(index.to_string(), doc_type.to_string()))
            .and_then(|c| c.remove(id))
            .map(|_| ())
            .ok_or_else(|| {
                DomainError::not_found(format!("Document {}/{}/{} not found", index, doc_type, id))
            })
    }

    async fn search(&self, request: SearchRequest) -> Result<SearchResponse, DomainError> {
        self.enter("search").await;

        let mut matching: Vec<Hit> = guard(&self.collections)
            .get(&(request.index.clone(), request.doc_type.clone()))
            .map(|c| {
                c.iter()
                    .filter(|(_, source)| matches_query(&request.query, source))
                    .map(|(id, source)| Hit::new(id.clone(), source.clone()))
                    .collect()
            })
            .unwrap_or_default();

        let total = matching.len() as u64;

        if request.scroll.is_none() {
            matching.truncate(request.size);
            return Ok(SearchResponse::new(total, matching));
        }

        let mut cursor = ScrollCursor {
            remaining: matching,
            page_size: request.size,
            total,
        };
        let first_page = Self::next_page(&mut cursor);

        let scroll_id = format!("scroll-{}", self.next_scroll.fetch_add(1, Ordering::SeqCst));
        guard(&self.scrolls).insert(scroll_id.clone(), cursor);

        Ok(SearchResponse::new(total, first_page).with_scroll_id(scroll_id))
    }

    async fn scroll(&self, scroll_id: &str, _keep_alive: &str) -> Result<SearchResponse, DomainError> {
        self.enter("scroll").await;

        let mut scrolls = guard(&self.scrolls);
        let cursor = scrolls.get_mut(scroll_id).ok_or_else(|| {
            DomainError::store(format!("No search context found for id [{}]", scroll_id))
        })?;

        let page = Self::next_page(cursor);
        Ok(SearchResponse::new(cursor.total, page).with_scroll_id(scroll_id))
    }

    async fn clear_scroll(&self, scroll_id: &str) -> Result<(), DomainError> {
        self.enter("clear_scroll").await;

        guard(&self.scrolls).remove(scroll_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn store() -> InMemoryDocumentStore {
        InMemoryDocumentStore::new()
            .with_document(".kibi", "template", "1", json!({"title": "Foo table", "description": "rows"}))
            .with_document(".kibi", "template", "2", json!({"title": "Bar list", "description": "foolish"}))
            .with_document(".kibi", "template", "3", json!({"title": "Other", "description": "none"}))
    }

    #[test]
    fn test_simple_query_string_prefix_and_operator() {
        let source = json!({"title": "Foo table", "description": "rows"});

        assert!(matches_query(&SearchQuery::for_search_string("fo"), &source));
        assert!(matches_query(&SearchQuery::for_search_string("foo ta"), &source));
        assert!(!matches_query(&SearchQuery::for_search_string("foo xyz"), &source));
        assert!(!matches_query(&SearchQuery::for_search_string("bar"), &source));
    }

    #[test]
    fn test_or_operator_needs_any_term() {
        let query = SearchQuery::SimpleQueryString {
            query: "zzz foo".to_string(),
            fields: vec!["title".to_string()],
            default_operator: DefaultOperator::Or,
        };

        assert!(matches_query(&query, &json!({"title": "foo"})));
    }

    #[tokio::test]
    async fn test_search_filters_across_fields() {
        let store = store();
        let request = SearchRequest::new(
            ".kibi",
            "template",
            SearchQuery::for_search_string("foo"),
            100,
        );

        let response = store.search(request).await.unwrap();
        let ids: Vec<&str> = response.hits.hits.iter().map(|h| h.id.as_str()).collect();

        assert_eq!(response.hits.total, 2);
        assert_eq!(ids, vec!["1", "2"]);
    }

    #[tokio::test]
    async fn test_scroll_pages_until_empty() {
        let store = store();
        let request = SearchRequest::new(".kibi", "template", SearchQuery::MatchAll {}, 2)
            .with_scroll("1m");

        let first = store.search(request).await.unwrap();
        assert_eq!(first.hits.total, 3);
        assert_eq!(first.hits.hits.len(), 2);

        let scroll_id = first.scroll_id.unwrap();
        let second = store.scroll(&scroll_id, "1m").await.unwrap();
        assert_eq!(second.hits.hits.len(), 1);

        let third = store.scroll(&scroll_id, "1m").await.unwrap();
        assert!(third.hits.hits.is_empty());

        store.clear_scroll(&scroll_id).await.unwrap();
        assert_eq!(store.open_scrolls(), 0);
        assert!(store.scroll(&scroll_id, "1m").await.is_err());
    }

    #[tokio::test]
    async fn test_delete_missing_is_not_found() {
        let store = store();

        store.delete(".kibi", "template", "1").await.unwrap();
        assert!(!store.contains(".kibi", "template", "1"));

        let err = store.delete(".kibi", "template", "1").await.unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(store.call_count("delete"), 2);
    }

    #[tokio::test]
    async fn test_injected_delete_failure() {
        let store = store().with_delete_failure("2", DomainError::store("HTTP 500: boom"));

        let err = store.delete(".kibi", "template", "2").await.unwrap_err();
        assert!(matches!(err, DomainError::Store { .. }));
        assert!(store.contains(".kibi", "template", "2"));
    }

    #[tokio::test]
    async fn test_index_then_get() {
        let store = InMemoryDocumentStore::new();

        store
            .index(".kibi", "search", "s1", &json!({"title": "errors"}))
            .await
            .unwrap();

        let hit = store.get(".kibi", "search", "s1").await.unwrap().unwrap();
        assert_eq!(hit.source["title"], "errors");
        assert!(store.get(".kibi", "template", "s1").await.unwrap().is_none());
    }
}
