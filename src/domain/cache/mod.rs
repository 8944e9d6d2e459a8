//! Cache domain - Pluggable caching strategy for saved object lookups

mod key;
mod repository;

pub use key::CacheKey;
pub use repository::{pattern_to_regex, Cache, CacheExt};

#[cfg(test)]
pub use repository::mock::MockCache;
