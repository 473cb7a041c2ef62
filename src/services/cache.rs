use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use serde::{de::DeserializeOwned, Serialize};

const KEY_PREFIX: &str = "nst-buddy";

/// Best-effort JSON cache. Every failure is treated as a miss so the API
/// keeps serving from the database when Redis misbehaves.
#[derive(Clone)]
pub struct CacheService {
    redis: ConnectionManager,
}

impl CacheService {
    pub fn new(redis: ConnectionManager) -> Self {
        Self { redis }
    }

    fn key(name: &str) -> String {
        format!("{}:{}", KEY_PREFIX, name)
    }

    pub async fn get<T: DeserializeOwned>(&self, name: &str) -> Option<T> {
        let mut conn = self.redis.clone();
        let result: Option<String> = conn.get(Self::key(name)).await.ok()?;
        result.and_then(|s| serde_json::from_str(&s).ok())
    }

    pub async fn set<T: Serialize>(&self, name: &str, value: &T, ttl_secs: u64) {
        let mut conn = self.redis.clone();
        if let Ok(json) = serde_json::to_string(value) {
            if let Err(e) = conn
                .set_ex::<_, _, ()>(Self::key(name), json, ttl_secs)
                .await
            {
                tracing::warn!("Cache write for '{}' failed: {}", name, e);
            }
        }
    }

    pub async fn invalidate(&self, name: &str) {
        let mut conn = self.redis.clone();
        if let Err(e) = conn.del::<_, ()>(Self::key(name)).await {
            tracing::warn!("Cache invalidation for '{}' failed: {}", name, e);
        }
    }
}
