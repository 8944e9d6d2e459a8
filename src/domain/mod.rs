//! Domain layer - Core entities and collaborator contracts

pub mod cache;
pub mod error;
pub mod saved_object;
pub mod store;

pub use cache::{Cache, CacheExt, CacheKey};
pub use error::DomainError;
pub use saved_object::{
    FindResult, LoaderProperties, RegistryEntry, SavedObjectRecord, SavedObjectRegistry,
    SavedObjectType, SavedSearch, SavedTemplate,
};
pub use store::{DocumentStore, Hit, SearchQuery, SearchRequest, SearchResponse};
