//! Cache infrastructure - Cache implementations and request coalescing

mod factory;
mod in_memory;
mod inflight;
mod redis;

pub use factory::{CacheConfig, CacheFactory, CacheType};
pub use in_memory::{InMemoryCache, InMemoryCacheConfig};
pub use inflight::RequestCoalescer;
pub use redis::{RedisCache, RedisCacheConfig};
