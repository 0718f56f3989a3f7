use crate::error::Result;
use redis::{aio::ConnectionManager, AsyncCommands, Client};
use serde::{de::DeserializeOwned, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub url: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            url: "redis://localhost:6379".to_string(),
        }
    }
}

impl CacheConfig {
    /// Redis is optional; `None` when `REDIS_URL` is unset.
    pub fn from_env() -> Option<Self> {
        let url = std::env::var("REDIS_URL").ok()?;
        Some(Self { url })
    }
}

#[derive(Clone)]
pub struct Cache {
    manager: ConnectionManager,
}

impl Cache {
    pub async fn new(config: CacheConfig) -> Result<Self> {
        let client = Client::open(config.url)?;
        let manager = ConnectionManager::new(client).await?;

        Ok(Self { manager })
    }

    /// Set a value in the cache with optional TTL (seconds)
    pub async fn set<T: Serialize>(
        &self,
        key: &str,
        value: &T,
        ttl_seconds: Option<u64>,
    ) -> Result<()> {
        let serialized = serde_json::to_string(value)?;
        let mut conn = self.manager.clone();

        if let Some(ttl) = ttl_seconds {
            conn.set_ex::<_, _, ()>(key, serialized, ttl).await?;
        } else {
            conn.set::<_, _, ()>(key, serialized).await?;
        }

        Ok(())
    }

    /// Get a value from the cache
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let mut conn = self.manager.clone();
        let value: Option<String> = conn.get(key).await?;

        match value {
            Some(s) => {
                let deserialized = serde_json::from_str(&s)?;
                Ok(Some(deserialized))
            }
            None => Ok(None),
        }
    }

    /// Delete a key from the cache
    pub async fn delete(&self, key: &str) -> Result<()> {
        let mut conn = self.manager.clone();
        conn.del::<_, ()>(key).await?;
        Ok(())
    }

    /// Increment a plain counter and return the new value.
    pub async fn incr(&self, key: &str) -> Result<i64> {
        let mut conn = self.manager.clone();
        let value: i64 = conn.incr(key, 1).await?;
        Ok(value)
    }

    /// Increment a fixed-window counter. The TTL is only set by the first
    /// increment, so the window does not slide with later hits.
    pub async fn incr_window(&self, key: &str, window_seconds: u64) -> Result<i64> {
        let mut conn = self.manager.clone();
        let value: i64 = conn.incr(key, 1).await?;
        if value == 1 {
            conn.expire::<_, ()>(key, window_seconds as i64).await?;
        }
        Ok(value)
    }

    /// Get TTL of a key (seconds remaining)
    pub async fn ttl(&self, key: &str) -> Result<i64> {
        let mut conn = self.manager.clone();
        let ttl: i64 = conn.ttl(key).await?;
        Ok(ttl)
    }

    /// Ping Redis to check connection
    pub async fn ping(&self) -> Result<()> {
        let mut conn = self.manager.clone();
        redis::cmd("PING").query_async::<()>(&mut conn).await?;
        Ok(())
    }
}

/// Counter bumped on every attendance write for a session.
pub fn records_generation_key(session_id: Uuid) -> String {
    format!("attendance:records:{}:generation", session_id)
}

/// Cached attendance list for one generation of a session.
pub fn records_cache_key(session_id: Uuid, generation: i64) -> String {
    format!("attendance:records:{}:{}", session_id, generation)
}

pub fn rate_limit_key(identifier: &str, window: &str) -> String {
    format!("ratelimit:{}:{}", identifier, window)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_helpers() {
        let id = Uuid::nil();
        assert_eq!(
            records_generation_key(id),
            "attendance:records:00000000-0000-0000-0000-000000000000:generation"
        );
        assert_eq!(
            records_cache_key(id, 3),
            "attendance:records:00000000-0000-0000-0000-000000000000:3"
        );
        assert_ne!(records_cache_key(id, 3), records_cache_key(id, 4));
        assert_eq!(rate_limit_key("verify:stu1", "60"), "ratelimit:verify:stu1:60");
    }

    #[tokio::test]
    #[ignore] // Only run with Redis available
    async fn test_redis_connection() {
        let config = CacheConfig::from_env().unwrap_or_default();
        let cache = Cache::new(config).await.expect("Failed to connect to Redis");
        cache.ping().await.expect("Failed to ping Redis");
    }

    #[tokio::test]
    #[ignore]
    async fn test_incr_window() {
        let config = CacheConfig::from_env().unwrap_or_default();
        let cache = Cache::new(config).await.unwrap();

        cache.delete("test_window").await.unwrap();
        assert_eq!(cache.incr_window("test_window", 60).await.unwrap(), 1);
        assert_eq!(cache.incr_window("test_window", 60).await.unwrap(), 2);
        assert!(cache.ttl("test_window").await.unwrap() > 0);
        cache.delete("test_window").await.unwrap();
    }

    #[tokio::test]
    #[ignore]
    async fn test_generation_counter_reads_back_as_json() {
        let config = CacheConfig::from_env().unwrap_or_default();
        let cache = Cache::new(config).await.unwrap();
        let key = records_generation_key(Uuid::new_v4());

        assert_eq!(cache.get::<i64>(&key).await.unwrap(), None);
        assert_eq!(cache.incr(&key).await.unwrap(), 1);
        assert_eq!(cache.incr(&key).await.unwrap(), 2);
        assert_eq!(cache.get::<i64>(&key).await.unwrap(), Some(2));
        cache.delete(&key).await.unwrap();
    }
}
