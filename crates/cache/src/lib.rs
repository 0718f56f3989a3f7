pub mod error;
pub mod redis_cache;

pub use error::{CacheError, Result};
pub use redis_cache::{
    rate_limit_key, records_cache_key, records_generation_key, Cache, CacheConfig,
};
