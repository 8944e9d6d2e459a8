//! Saved object domain - Persisted user objects and their type contracts

mod entity;
mod registry;
mod search;
mod template;

pub use entity::{
    encode_uri_component, url_for, FindResult, LoaderProperties, SavedObjectRecord,
    SavedObjectType,
};
pub use registry::{RegistryEntry, SavedObjectRegistry};
pub use search::{SavedSearch, SearchSourceMeta};
pub use template::{SavedTemplate, DEFAULT_TEMPLATE_ENGINE};
