//! In-memory cache implementation using the moka crate.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use moka::Expiry;
use moka::future::Cache;
use tracing::debug;

use warden_core::config::cache::MemoryCacheConfig;
use warden_core::result::AppResult;
use warden_core::traits::cache::CacheProvider;

use crate::keys;

/// A cached string together with the TTL it was written with.
#[derive(Debug, Clone)]
struct CachedValue {
    data: String,
    ttl: Duration,
}

/// Expires each entry after the TTL given to its last `set`.
struct PerEntryExpiry;

impl Expiry<String, CachedValue> for PerEntryExpiry {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &CachedValue,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(value.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &CachedValue,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

/// In-memory cache provider using moka.
///
/// Entries are local to the process; use the Redis provider when several
/// nodes must observe the same revocations.
///
/// Pinned keys (see [`keys::is_pinned`]) live in a second store that has
/// no capacity bound, so they only ever leave by expiry or deletion.
/// `max_capacity` applies to everything else.
#[derive(Debug, Clone)]
pub struct MemoryCacheProvider {
    /// Size-bounded store for evictable entries.
    cache: Cache<String, CachedValue>,
    /// Unbounded store for pinned entries.
    pinned: Cache<String, CachedValue>,
}

impl MemoryCacheProvider {
    /// Create a new in-memory cache from configuration.
    pub fn new(config: &MemoryCacheConfig) -> Self {
        let cache = Cache::builder()
            .max_capacity(config.max_capacity)
            .expire_after(PerEntryExpiry)
            .build();
        let pinned = Cache::builder().expire_after(PerEntryExpiry).build();

        Self { cache, pinned }
    }

    fn store_for(&self, key: &str) -> &Cache<String, CachedValue> {
        if keys::is_pinned(key) {
            &self.pinned
        } else {
            &self.cache
        }
    }
}

#[async_trait]
impl CacheProvider for MemoryCacheProvider {
    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        Ok(self.store_for(key).get(key).await.map(|v| v.data))
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> AppResult<()> {
        let entry = CachedValue {
            data: value.to_string(),
            ttl,
        };
        self.store_for(key).insert(key.to_string(), entry).await;
        Ok(())
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        self.store_for(key).invalidate(key).await;
        Ok(())
    }

    async fn exists(&self, key: &str) -> AppResult<bool> {
        Ok(self.store_for(key).get(key).await.is_some())
    }

    async fn delete_pattern(&self, pattern: &str) -> AppResult<u64> {
        // Only trailing wildcards are supported; match on the prefix.
        let prefix = pattern.trim_end_matches('*');

        let mut count = 0u64;
        for store in [&self.cache, &self.pinned] {
            let keys_to_remove: Vec<String> = store
                .iter()
                .filter(|(key, _)| key.starts_with(prefix))
                .map(|(key, _)| key.to_string())
                .collect();

            count += keys_to_remove.len() as u64;
            for key in keys_to_remove {
                store.invalidate(&key).await;
            }
        }

        debug!(pattern, count, "Deleted keys matching pattern");
        Ok(count)
    }

    async fn health_check(&self) -> AppResult<bool> {
        Ok(true)
    }

    async fn flush_all(&self) -> AppResult<()> {
        self.cache.invalidate_all();
        self.pinned.invalidate_all();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider() -> MemoryCacheProvider {
        MemoryCacheProvider::new(&MemoryCacheConfig::default())
    }

    #[tokio::test]
    async fn test_set_get_delete() {
        let cache = provider();
        cache.set("a", "1", Duration::from_secs(60)).await.unwrap();
        assert_eq!(cache.get("a").await.unwrap().as_deref(), Some("1"));
        assert!(cache.exists("a").await.unwrap());

        cache.delete("a").await.unwrap();
        assert_eq!(cache.get("a").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_entry_expires_after_its_own_ttl() {
        let cache = provider();
        cache.set("short", "x", Duration::from_millis(50)).await.unwrap();
        cache.set("long", "y", Duration::from_secs(60)).await.unwrap();

        tokio::time::sleep(Duration::from_millis(200)).await;

        assert_eq!(cache.get("short").await.unwrap(), None);
        assert_eq!(cache.get("long").await.unwrap().as_deref(), Some("y"));
    }

    #[tokio::test]
    async fn test_delete_pattern_only_touches_prefix() {
        let cache = provider();
        let ttl = Duration::from_secs(60);
        cache.set("perm:principal:1", "[]", ttl).await.unwrap();
        cache.set("perm:principal:2", "[]", ttl).await.unwrap();
        cache.set("revoked-token:abc", "revoked", ttl).await.unwrap();

        let removed = cache.delete_pattern("perm:principal:*").await.unwrap();
        assert_eq!(removed, 2);
        assert!(cache.exists("revoked-token:abc").await.unwrap());
    }

    #[tokio::test]
    async fn test_flush_all() {
        let cache = provider();
        cache.set("a", "1", Duration::from_secs(60)).await.unwrap();
        cache.set(&keys::revoked_token("t"), "revoked", Duration::from_secs(60)).await.unwrap();
        cache.flush_all().await.unwrap();
        assert_eq!(cache.get("a").await.unwrap(), None);
        assert!(!cache.exists(&keys::revoked_token("t")).await.unwrap());
    }

    #[tokio::test]
    async fn test_revocation_keys_survive_capacity_pressure() {
        let cache = MemoryCacheProvider::new(&MemoryCacheConfig { max_capacity: 10 });
        let ttl = Duration::from_secs(60);

        for i in 0..200 {
            cache.set(&keys::revoked_token(&i.to_string()), "revoked", ttl).await.unwrap();
            cache.set(&format!("perm:principal:{i}"), "[]", ttl).await.unwrap();
        }
        cache.cache.run_pending_tasks().await;
        cache.pinned.run_pending_tasks().await;

        for i in 0..200 {
            assert!(cache.exists(&keys::revoked_token(&i.to_string())).await.unwrap());
        }
        assert!(cache.cache.entry_count() <= 10);
    }

    #[tokio::test]
    async fn test_pinned_keys_still_expire() {
        let cache = provider();
        let key = keys::revoked_token("short");
        cache.set(&key, "revoked", Duration::from_millis(50)).await.unwrap();

        tokio::time::sleep(Duration::from_millis(200)).await;

        assert!(!cache.exists(&key).await.unwrap());
    }
}
