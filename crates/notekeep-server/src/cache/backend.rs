//! Cache backend with a local (`DashMap`) tier and an optional Redis tier.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use deadpool_redis::Pool;
use deadpool_redis::redis::{self, AsyncCommands};
use tracing::{debug, info, warn};

use notekeep_core::config::CacheConfig;

/// TTL for entries promoted from Redis when Redis reports no expiry.
const PROMOTION_FALLBACK_TTL: Duration = Duration::from_secs(60);

#[derive(Clone, Debug)]
struct CachedEntry {
    data: Arc<Vec<u8>>,
    cached_at: Instant,
    ttl: Duration,
}

impl CachedEntry {
    fn new(data: Arc<Vec<u8>>, ttl: Duration) -> Self {
        Self {
            data,
            cached_at: Instant::now(),
            ttl,
        }
    }

    fn is_expired(&self) -> bool {
        self.cached_at.elapsed() > self.ttl
    }
}

/// In-process tier holding at most `capacity` entries.
#[derive(Debug)]
pub struct LocalTier {
    entries: DashMap<String, CachedEntry>,
    capacity: usize,
}

impl LocalTier {
    fn new(capacity: usize) -> Self {
        Self {
            entries: DashMap::new(),
            capacity,
        }
    }

    fn get(&self, key: &str) -> Option<Arc<Vec<u8>>> {
        let entry = self.entries.get(key)?;
        if entry.is_expired() {
            drop(entry);
            self.entries.remove(key);
            return None;
        }
        Some(Arc::clone(&entry.data))
    }

    fn insert(&self, key: &str, data: Arc<Vec<u8>>, ttl: Duration) {
        if !self.entries.contains_key(key) && self.entries.len() >= self.capacity {
            self.entries.retain(|_, entry| !entry.is_expired());
            if self.entries.len() >= self.capacity {
                debug!(key = %key, capacity = self.capacity, "local cache full, entry not stored");
                return;
            }
        }
        self.entries
            .insert(key.to_string(), CachedEntry::new(data, ttl));
    }

    fn remove(&self, key: &str) {
        self.entries.remove(key);
    }
}

/// Where note reads look before going to the database.
///
/// - **Disabled**: every lookup misses.
/// - **Local**: single-instance, in-process only.
/// - **Redis**: Redis shared across instances, fronted by a local tier.
#[derive(Clone)]
pub enum CacheBackend {
    Disabled,
    Local(Arc<LocalTier>),
    Redis { redis: Pool, local: Arc<LocalTier> },
}

impl CacheBackend {
    pub const fn disabled() -> Self {
        Self::Disabled
    }

    pub fn new_local(capacity: usize) -> Self {
        Self::Local(Arc::new(LocalTier::new(capacity)))
    }

    pub fn new_redis(redis: Pool, local_capacity: usize) -> Self {
        Self::Redis {
            redis,
            local: Arc::new(LocalTier::new(local_capacity)),
        }
    }

    pub const fn is_enabled(&self) -> bool {
        !matches!(self, Self::Disabled)
    }

    /// Look a key up. Backend failures are logged and reported as a miss.
    ///
    /// A Redis hit is promoted to the local tier for the key's remaining
    /// Redis lifetime.
    pub async fn get(&self, key: &str) -> Option<Arc<Vec<u8>>> {
        match self {
            Self::Disabled => None,
            Self::Local(local) => local.get(key),
            Self::Redis { redis: pool, local } => {
                if let Some(data) = local.get(key) {
                    debug!(key = %key, "cache hit (local)");
                    return Some(data);
                }

                let mut conn = match pool.get().await {
                    Ok(conn) => conn,
                    Err(e) => {
                        warn!(error = %e, "Failed to get Redis connection");
                        return None;
                    }
                };

                let result: redis::RedisResult<(Option<Vec<u8>>, i64)> = redis::pipe()
                    .get(key)
                    .pttl(key)
                    .query_async(&mut conn)
                    .await;

                match result {
                    Ok((Some(data), pttl_ms)) => {
                        debug!(key = %key, "cache hit (redis)");
                        let ttl = u64::try_from(pttl_ms)
                            .ok()
                            .filter(|ms| *ms > 0)
                            .map_or(PROMOTION_FALLBACK_TTL, Duration::from_millis);
                        let data = Arc::new(data);
                        local.insert(key, Arc::clone(&data), ttl);
                        Some(data)
                    }
                    Ok((None, _)) => None,
                    Err(e) => {
                        warn!(key = %key, error = %e, "Redis GET error");
                        None
                    }
                }
            }
        }
    }

    /// Store a value with a TTL. Failures are logged, never returned.
    pub async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) {
        match self {
            Self::Disabled => {}
            Self::Local(local) => local.insert(key, Arc::new(value), ttl),
            Self::Redis { redis: pool, local } => {
                let data = Arc::new(value);
                local.insert(key, Arc::clone(&data), ttl);

                match pool.get().await {
                    Ok(mut conn) => {
                        if let Err(e) = conn
                            .set_ex::<_, _, ()>(key, data.as_slice(), ttl.as_secs().max(1))
                            .await
                        {
                            warn!(key = %key, error = %e, "Redis SET error");
                        }
                    }
                    Err(e) => warn!(error = %e, "Failed to get Redis connection"),
                }
            }
        }
    }

    /// Drop a key from every tier.
    pub async fn invalidate(&self, key: &str) {
        match self {
            Self::Disabled => {}
            Self::Local(local) => local.remove(key),
            Self::Redis { redis: pool, local } => {
                local.remove(key);
                match pool.get().await {
                    Ok(mut conn) => {
                        if let Err(e) = conn.del::<_, ()>(key).await {
                            warn!(key = %key, error = %e, "Redis DEL error");
                        }
                    }
                    Err(e) => warn!(error = %e, "Failed to get Redis connection"),
                }
            }
        }
    }
}

/// Build the cache backend from configuration.
///
/// If Redis is configured but unreachable the server starts with the local
/// tier only.
pub async fn create_cache_backend(config: &CacheConfig) -> CacheBackend {
    if !config.use_cache {
        info!("Note cache disabled");
        return CacheBackend::disabled();
    }

    let Some(url) = config.normalized_redis_url() else {
        info!(capacity = config.local_capacity, "Using local note cache");
        return CacheBackend::new_local(config.local_capacity);
    };

    let pool = match deadpool_redis::Config::from_url(&url)
        .create_pool(Some(deadpool_redis::Runtime::Tokio1))
    {
        Ok(pool) => pool,
        Err(e) => {
            warn!(error = %e, "Failed to create Redis pool, falling back to local cache");
            return CacheBackend::new_local(config.local_capacity);
        }
    };

    match pool.get().await {
        Ok(_) => {
            info!(url = %url, "Connected to Redis");
            CacheBackend::new_redis(pool, config.local_capacity)
        }
        Err(e) => {
            warn!(error = %e, "Failed to connect to Redis, falling back to local cache");
            CacheBackend::new_local(config.local_capacity)
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic, clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn local_get_set() {
        let cache = CacheBackend::new_local(10);
        cache
            .set("k", b"value".to_vec(), Duration::from_secs(60))
            .await;

        assert_eq!(cache.get("k").await, Some(Arc::new(b"value".to_vec())));
        assert!(cache.get("other").await.is_none());
    }

    #[tokio::test]
    async fn local_entries_expire() {
        let cache = CacheBackend::new_local(10);
        cache.set("k", b"v".to_vec(), Duration::from_millis(20)).await;

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(cache.get("k").await.is_none());
    }

    #[tokio::test]
    async fn local_invalidate() {
        let cache = CacheBackend::new_local(10);
        cache.set("k", b"v".to_vec(), Duration::from_secs(60)).await;
        cache.invalidate("k").await;
        assert!(cache.get("k").await.is_none());
    }

    #[tokio::test]
    async fn full_local_tier_skips_new_keys() {
        let cache = CacheBackend::new_local(2);
        cache.set("a", b"1".to_vec(), Duration::from_secs(60)).await;
        cache.set("b", b"2".to_vec(), Duration::from_secs(60)).await;
        cache.set("c", b"3".to_vec(), Duration::from_secs(60)).await;

        assert!(cache.get("c").await.is_none());
        // Overwriting an existing key is still allowed.
        cache.set("a", b"9".to_vec(), Duration::from_secs(60)).await;
        assert_eq!(cache.get("a").await, Some(Arc::new(b"9".to_vec())));
    }

    #[tokio::test]
    async fn full_local_tier_evicts_expired_first() {
        let cache = CacheBackend::new_local(1);
        cache.set("old", b"1".to_vec(), Duration::from_millis(10)).await;
        tokio::time::sleep(Duration::from_millis(30)).await;

        cache.set("new", b"2".to_vec(), Duration::from_secs(60)).await;
        assert_eq!(cache.get("new").await, Some(Arc::new(b"2".to_vec())));
    }

    #[tokio::test]
    async fn disabled_always_misses() {
        let cache = CacheBackend::disabled();
        cache.set("k", b"v".to_vec(), Duration::from_secs(60)).await;
        assert!(cache.get("k").await.is_none());
        assert!(!cache.is_enabled());
    }

    #[tokio::test]
    async fn create_backend_from_config() {
        let disabled = create_cache_backend(&CacheConfig::default()).await;
        assert!(!disabled.is_enabled());

        let local = create_cache_backend(&CacheConfig {
            use_cache: true,
            ..CacheConfig::default()
        })
        .await;
        assert!(matches!(local, CacheBackend::Local(_)));
    }
}
