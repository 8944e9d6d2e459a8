//! Infrastructure services

mod saved_object;
mod saved_object_service;

pub use saved_object::{record_from_hit, SavedObject};
pub use saved_object_service::{IdList, SavedObjectService, DEFAULT_CACHE_TTL, FIND_PAGE_SIZE};
