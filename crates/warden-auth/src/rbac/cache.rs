//! Read-through cache of resolved permission sets.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use tracing::debug;
use uuid::Uuid;

use warden_cache::CacheManager;
use warden_cache::keys;
use warden_core::config::{AuthConfig, CacheConfig};
use warden_core::result::AppResult;
use warden_core::traits::CacheProvider;

use crate::bounded::within;

/// Resolved permission sets keyed by principal id.
///
/// Values are JSON arrays. An empty array is a cached empty set and a
/// missing key means "not resolved yet"; the two are never conflated.
#[derive(Debug, Clone)]
pub struct PermissionCache {
    cache: Arc<CacheManager>,
    ttl: Duration,
    operation_timeout: Duration,
}

impl PermissionCache {
    /// Creates a permission cache over the shared cache manager.
    pub fn new(cache: Arc<CacheManager>, auth: &AuthConfig, cache_config: &CacheConfig) -> Self {
        Self {
            cache,
            ttl: Duration::from_secs(auth.permission_cache_ttl_seconds),
            operation_timeout: Duration::from_millis(cache_config.operation_timeout_ms),
        }
    }

    /// Cached set for a principal, `None` on a miss.
    pub async fn get(&self, principal_id: Uuid) -> AppResult<Option<BTreeSet<String>>> {
        let key = keys::principal_permissions(principal_id);
        let Some(raw) = within(self.operation_timeout, self.cache.get(&key)).await? else {
            return Ok(None);
        };
        let set: BTreeSet<String> = serde_json::from_str(&raw)?;
        Ok(Some(set))
    }

    /// Stores a resolved set.
    pub async fn put(&self, principal_id: Uuid, permissions: &BTreeSet<String>) -> AppResult<()> {
        let key = keys::principal_permissions(principal_id);
        let value = serde_json::to_string(permissions)?;
        within(self.operation_timeout, self.cache.set(&key, &value, self.ttl)).await
    }

    /// Drops the cached set of one principal.
    pub async fn invalidate(&self, principal_id: Uuid) -> AppResult<()> {
        let key = keys::principal_permissions(principal_id);
        within(self.operation_timeout, self.cache.delete(&key)).await?;
        debug!(principal_id = %principal_id, "Permission cache invalidated");
        Ok(())
    }

    /// Drops the cached sets of several principals.
    pub async fn invalidate_many(&self, principal_ids: &[Uuid]) -> AppResult<()> {
        for principal_id in principal_ids {
            self.invalidate(*principal_id).await?;
        }
        Ok(())
    }

    /// Drops every cached permission set.
    pub async fn invalidate_all(&self) -> AppResult<u64> {
        let pattern = keys::all_principal_permissions();
        within(self.operation_timeout, self.cache.delete_pattern(&pattern)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use warden_cache::memory::MemoryCacheProvider;
    use warden_core::config::cache::MemoryCacheConfig;

    fn cache() -> PermissionCache {
        let manager = CacheManager::from_provider(Arc::new(MemoryCacheProvider::new(
            &MemoryCacheConfig::default(),
        )));
        PermissionCache::new(
            Arc::new(manager),
            &AuthConfig::default(),
            &CacheConfig::default(),
        )
    }

    #[tokio::test]
    async fn test_empty_set_is_distinct_from_miss() {
        let cache = cache();
        let id = Uuid::new_v4();

        assert_eq!(cache.get(id).await.unwrap(), None);
        cache.put(id, &BTreeSet::new()).await.unwrap();
        assert_eq!(cache.get(id).await.unwrap(), Some(BTreeSet::new()));
    }

    #[tokio::test]
    async fn test_invalidate_all_only_drops_permission_sets() {
        let cache = cache();
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let set: BTreeSet<String> = ["read:doc".to_string()].into();
        cache.put(a, &set).await.unwrap();
        cache.put(b, &set).await.unwrap();

        assert_eq!(cache.invalidate_all().await.unwrap(), 2);
        assert_eq!(cache.get(a).await.unwrap(), None);
        assert_eq!(cache.get(b).await.unwrap(), None);
    }
}
