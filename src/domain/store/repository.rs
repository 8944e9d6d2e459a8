//! Document store trait

use async_trait::async_trait;

use super::{Hit, SearchRequest, SearchResponse};
use crate::domain::DomainError;

#[cfg(test)]
use mockall::automock;

/// Client for the external document index
///
/// Errors are returned as reported; callers add no retry layer.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Fetches a document by id, `None` when the index has no such id
    async fn get(&self, index: &str, doc_type: &str, id: &str)
        -> Result<Option<Hit>, DomainError>;

    /// Creates or replaces a document
    async fn index(
        &self,
        index: &str,
        doc_type: &str,
        id: &str,
        source: &serde_json::Value,
    ) -> Result<(), DomainError>;

    /// Deletes a document; a missing id is `NotFound`
    async fn delete(&self, index: &str, doc_type: &str, id: &str) -> Result<(), DomainError>;

    /// Runs a search, opening a scroll cursor when the request asks for one
    async fn search(&self, request: SearchRequest) -> Result<SearchResponse, DomainError>;

    /// Fetches the next page of an open scroll cursor
    async fn scroll(&self, scroll_id: &str, keep_alive: &str)
        -> Result<SearchResponse, DomainError>;

    /// Releases a scroll cursor
    async fn clear_scroll(&self, scroll_id: &str) -> Result<(), DomainError>;
}
