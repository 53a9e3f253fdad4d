use async_trait::async_trait;
use redis::aio::ConnectionManager;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::error::StoreError;
use crate::models::{CandidateCriteria, Profile};
use crate::services::ports::ProfileDirectory;

/// Errors that can occur with cache operations
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Redis error: {0}")]
    RedisError(#[from] redis::RedisError),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Cache miss: {0}")]
    CacheMiss(String),
}

/// Multi-tier cache manager
///
/// Implements L1 (in-memory) and L2 (Redis) caching strategy.
/// L1 is fastest but limited in size, L2 is shared across instances.
pub struct CacheManager {
    redis: Arc<tokio::sync::Mutex<ConnectionManager>>,
    l1_cache: moka::future::Cache<String, Vec<u8>>,
    ttl_secs: u64,
}

impl CacheManager {
    /// Create a new cache manager
    pub async fn new(redis_url: &str, l1_size: u64, ttl_secs: u64) -> Result<Self, CacheError> {
        let client = redis::Client::open(redis_url)?;
        let redis = redis::aio::ConnectionManager::new(client).await?;

        let l1_cache = moka::future::CacheBuilder::new(l1_size)
            .time_to_live(Duration::from_secs(ttl_secs))
            .build();

        Ok(Self {
            redis: Arc::new(tokio::sync::Mutex::new(redis)),
            l1_cache,
            ttl_secs,
        })
    }

    /// Get a value from cache (L1 first, then L2)
    pub async fn get<T>(&self, key: &str) -> Result<T, CacheError>
    where
        T: for<'de> Deserialize<'de>,
    {
        if let Some(bytes) = self.l1_cache.get(key).await {
            tracing::trace!("L1 cache hit: {}", key);
            return Ok(serde_json::from_slice(&bytes)?);
        }

        let mut conn = self.redis.lock().await;
        let value: Option<String> = redis::cmd("GET")
            .arg(key)
            .query_async(&mut *conn)
            .await?;
        drop(conn);

        if let Some(json) = value {
            tracing::trace!("L2 cache hit: {}", key);
            self.l1_cache
                .insert(key.to_string(), json.as_bytes().to_vec())
                .await;
            return Ok(serde_json::from_str(&json)?);
        }

        tracing::trace!("Cache miss: {}", key);
        Err(CacheError::CacheMiss(key.to_string()))
    }

    /// Set a value in cache (both L1 and L2)
    pub async fn set<T>(&self, key: &str, value: &T) -> Result<(), CacheError>
    where
        T: Serialize,
    {
        let json = serde_json::to_string(value)?;

        self.l1_cache
            .insert(key.to_string(), json.as_bytes().to_vec())
            .await;

        let mut conn = self.redis.lock().await;
        redis::cmd("SETEX")
            .arg(key)
            .arg(self.ttl_secs)
            .arg(json)
            .query_async::<()>(&mut *conn)
            .await?;
        drop(conn);

        tracing::trace!("Cache set: {}", key);
        Ok(())
    }

}

/// Cache key builder
pub struct CacheKey;

impl CacheKey {
    /// Build a cache key for the profile owned by a user
    pub fn profile(user_id: &str) -> String {
        format!("profile:{}", user_id)
    }
}

/// Profile directory with read-through caching of per-user lookups
///
/// Candidate queries are passed straight through. Cache failures are logged
/// and the underlying directory is used instead.
pub struct CachedProfileDirectory {
    inner: Arc<dyn ProfileDirectory>,
    cache: Arc<CacheManager>,
}

impl CachedProfileDirectory {
    pub fn new(inner: Arc<dyn ProfileDirectory>, cache: Arc<CacheManager>) -> Self {
        Self { inner, cache }
    }
}

#[async_trait]
impl ProfileDirectory for CachedProfileDirectory {
    async fn find_by_user_id(&self, user_id: &str) -> Result<Option<Profile>, StoreError> {
        let key = CacheKey::profile(user_id);

        match self.cache.get::<Profile>(&key).await {
            Ok(profile) => return Ok(Some(profile)),
            Err(CacheError::CacheMiss(_)) => {}
            Err(e) => tracing::warn!("Profile cache read failed for {}: {}", user_id, e),
        }

        let profile = self.inner.find_by_user_id(user_id).await?;

        if let Some(profile) = &profile {
            if let Err(e) = self.cache.set(&key, profile).await {
                tracing::warn!("Profile cache write failed for {}: {}", user_id, e);
            }
        }

        Ok(profile)
    }

    async fn query(
        &self,
        criteria: &CandidateCriteria,
        limit: usize,
        skip: usize,
    ) -> Result<Vec<Profile>, StoreError> {
        self.inner.query(criteria, limit, skip).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Gender, PartnerPreferences};
    use crate::services::MemoryStore;

    #[tokio::test]
    #[ignore = "Requires Redis"]
    async fn test_cache_set_get() {
        let cache = CacheManager::new("redis://127.0.0.1:6379", 1000, 60)
            .await
            .expect("Failed to create cache");

        let key = "test_key";
        let value = "test_value";

        cache.set(key, &value).await.unwrap();
        let result: String = cache.get(key).await.unwrap();
        assert_eq!(result, value);
        assert!(matches!(
            cache.get::<String>("missing_key").await,
            Err(CacheError::CacheMiss(_))
        ));
    }

    #[tokio::test]
    #[ignore = "Requires Redis"]
    async fn test_cached_profile_lookup() {
        let store = Arc::new(MemoryStore::new());
        store
            .insert_profile(Profile {
                id: "profile-cache-1".to_string(),
                user_id: "cache-user-1".to_string(),
                gender: Gender::Female,
                date_of_birth: None,
                marital_status: None,
                mother_tongue: None,
                height_cm: None,
                education: None,
                occupation: None,
                job_location: None,
                partner: PartnerPreferences::default(),
                is_verified: true,
                is_complete: true,
                last_active: None,
            })
            .await;

        let cache = Arc::new(
            CacheManager::new("redis://127.0.0.1:6379", 100, 60)
                .await
                .expect("Failed to create cache"),
        );
        let directory = CachedProfileDirectory::new(store, cache.clone());

        let first = directory.find_by_user_id("cache-user-1").await.unwrap();
        let cached: Profile = cache.get(&CacheKey::profile("cache-user-1")).await.unwrap();

        assert_eq!(first, Some(cached));
        assert!(directory.find_by_user_id("nobody").await.unwrap().is_none());
    }

    #[test]
    fn test_cache_key_builder() {
        assert_eq!(CacheKey::profile("user123"), "profile:user123");
    }
}
