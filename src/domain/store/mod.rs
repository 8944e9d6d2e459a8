//! Store domain - Document index contract and wire shapes

mod query;
mod repository;
mod response;

pub use query::{DefaultOperator, SearchQuery, SearchRequest, SCROLL_KEEP_ALIVE, SEARCH_FIELDS};
pub use repository::DocumentStore;
pub use response::{Hit, SearchHits, SearchResponse};

#[cfg(test)]
pub use repository::MockDocumentStore;
