//! Shared fixtures for the warden-auth integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use warden_auth::rbac::{PermissionCache, PermissionResolver, RoleAdministration};
use warden_auth::revocation::RevocationRegistry;
use warden_auth::store::{MemoryAccessStore, PermissionStore, PrincipalDirectory};
use warden_auth::token::TokenService;
use warden_auth::AccessGate;
use warden_cache::CacheManager;
use warden_cache::memory::MemoryCacheProvider;
use warden_core::config::cache::MemoryCacheConfig;
use warden_core::config::{AuthConfig, CacheConfig};
use warden_core::error::AppError;
use warden_core::result::AppResult;
use warden_core::traits::CacheProvider;
use warden_entity::principal::Principal;

/// In-memory cache that can be switched off to simulate an outage.
#[derive(Debug)]
pub struct FlakyCache {
    inner: MemoryCacheProvider,
    down: AtomicBool,
}

impl FlakyCache {
    pub fn new() -> Self {
        Self {
            inner: MemoryCacheProvider::new(&MemoryCacheConfig::default()),
            down: AtomicBool::new(false),
        }
    }

    pub fn set_down(&self, down: bool) {
        self.down.store(down, Ordering::SeqCst);
    }

    fn check(&self) -> AppResult<()> {
        if self.down.load(Ordering::SeqCst) {
            return Err(AppError::cache("cache unavailable"));
        }
        Ok(())
    }
}

#[async_trait]
impl CacheProvider for FlakyCache {
    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        self.check()?;
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> AppResult<()> {
        self.check()?;
        self.inner.set(key, value, ttl).await
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        self.check()?;
        self.inner.delete(key).await
    }

    async fn exists(&self, key: &str) -> AppResult<bool> {
        self.check()?;
        self.inner.exists(key).await
    }

    async fn delete_pattern(&self, pattern: &str) -> AppResult<u64> {
        self.check()?;
        self.inner.delete_pattern(pattern).await
    }

    async fn health_check(&self) -> AppResult<bool> {
        Ok(!self.down.load(Ordering::SeqCst))
    }

    async fn flush_all(&self) -> AppResult<()> {
        self.check()?;
        self.inner.flush_all().await
    }
}

/// Cache whose every call takes longer than any sensible deadline.
#[derive(Debug, Default)]
pub struct StalledCache;

#[async_trait]
impl CacheProvider for StalledCache {
    async fn get(&self, _key: &str) -> AppResult<Option<String>> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok(None)
    }

    async fn set(&self, _key: &str, _value: &str, _ttl: Duration) -> AppResult<()> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok(())
    }

    async fn delete(&self, _key: &str) -> AppResult<()> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok(())
    }

    async fn exists(&self, _key: &str) -> AppResult<bool> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok(false)
    }

    async fn delete_pattern(&self, _pattern: &str) -> AppResult<u64> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok(0)
    }

    async fn health_check(&self) -> AppResult<bool> {
        Ok(false)
    }

    async fn flush_all(&self) -> AppResult<()> {
        Ok(())
    }
}

/// Permission store whose hierarchy walk fails, optionally together with
/// the direct lookup.
pub struct BrokenStore {
    pub inner: MemoryAccessStore,
    pub direct_fails: bool,
}

#[async_trait]
impl PermissionStore for BrokenStore {
    async fn load_roles(&self, _ids: &[Uuid]) -> AppResult<Vec<warden_entity::role::Role>> {
        Err(AppError::database("connection reset"))
    }

    async fn has_permission_direct(&self, principal_id: Uuid, code: &str) -> AppResult<bool> {
        if self.direct_fails {
            return Err(AppError::database("connection reset"));
        }
        self.inner.has_permission_direct(principal_id, code).await
    }

    async fn principals_inheriting_role(&self, role_id: Uuid) -> AppResult<Vec<Uuid>> {
        self.inner.principals_inheriting_role(role_id).await
    }

    async fn add_grant(&self, role_id: Uuid, code: &str) -> AppResult<()> {
        self.inner.add_grant(role_id, code).await
    }

    async fn remove_grant(&self, role_id: Uuid, code: &str) -> AppResult<()> {
        self.inner.remove_grant(role_id, code).await
    }

    async fn set_parent(&self, role_id: Uuid, parent_role_id: Option<Uuid>) -> AppResult<()> {
        self.inner.set_parent(role_id, parent_role_id).await
    }

    async fn assign_role(&self, principal_id: Uuid, role_id: Uuid) -> AppResult<()> {
        self.inner.assign_role(principal_id, role_id).await
    }

    async fn unassign_role(&self, principal_id: Uuid, role_id: Uuid) -> AppResult<()> {
        self.inner.unassign_role(principal_id, role_id).await
    }
}

pub fn auth_config() -> AuthConfig {
    AuthConfig {
        jwt_secret: "integration-test-secret".to_string(),
        ..AuthConfig::default()
    }
}

pub fn principal(tenant_id: Option<Uuid>, role_ids: Vec<Uuid>) -> Principal {
    Principal {
        id: Uuid::new_v4(),
        tenant_id,
        username: format!("user-{}", Uuid::new_v4().simple()),
        password_hash: String::new(),
        is_super: false,
        is_active: true,
        role_ids,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

pub fn super_principal() -> Principal {
    Principal {
        is_super: true,
        ..principal(None, Vec::new())
    }
}

/// Everything wired together over the in-memory store and a flaky cache.
pub struct Harness {
    pub store: MemoryAccessStore,
    pub flaky: Arc<FlakyCache>,
    pub cache: Arc<CacheManager>,
    pub tokens: Arc<TokenService>,
    pub revocations: Arc<RevocationRegistry>,
    pub permission_cache: PermissionCache,
    pub resolver: PermissionResolver,
    pub admin: RoleAdministration,
    pub gate: AccessGate,
}

impl Harness {
    pub fn new() -> Self {
        let store = MemoryAccessStore::new();
        let flaky = Arc::new(FlakyCache::new());
        let cache = Arc::new(CacheManager::from_provider(flaky.clone()));
        Self::with_parts(store.clone(), Arc::new(store), flaky, cache)
    }

    pub fn with_permission_store(permissions: Arc<dyn PermissionStore>) -> Self {
        let flaky = Arc::new(FlakyCache::new());
        let cache = Arc::new(CacheManager::from_provider(flaky.clone()));
        Self::with_parts(MemoryAccessStore::new(), permissions, flaky, cache)
    }

    fn with_parts(
        store: MemoryAccessStore,
        permissions: Arc<dyn PermissionStore>,
        flaky: Arc<FlakyCache>,
        cache: Arc<CacheManager>,
    ) -> Self {
        let auth = auth_config();
        let cache_config = CacheConfig::default();

        let tokens = Arc::new(TokenService::new(&auth));
        let revocations = Arc::new(RevocationRegistry::new(
            tokens.clone(),
            Some(cache.clone()),
            &auth,
            &cache_config,
        ));
        let permission_cache = PermissionCache::new(cache.clone(), &auth, &cache_config);
        let resolver = PermissionResolver::new(permissions.clone(), permission_cache.clone());
        let admin = RoleAdministration::new(permissions, permission_cache.clone());
        let directory: Arc<dyn PrincipalDirectory> = Arc::new(store.clone());
        let gate = AccessGate::new(
            tokens.clone(),
            revocations.clone(),
            directory,
            resolver.clone(),
        );

        Self {
            store,
            flaky,
            cache,
            tokens,
            revocations,
            permission_cache,
            resolver,
            admin,
            gate,
        }
    }

    /// A second registry over the same shared cache, as after a restart.
    pub fn restarted_registry(&self) -> RevocationRegistry {
        RevocationRegistry::new(
            self.tokens.clone(),
            Some(self.cache.clone()),
            &auth_config(),
            &CacheConfig::default(),
        )
    }
}
