//! Permission resolution over the role inheritance forest.
//!
//! Resolution order:
//! 1. Super principals hold every permission.
//! 2. Cached set (an empty set counts as a hit).
//! 3. Walk each assigned role's ancestors one depth at a time, union the
//!    grants, cache the result.
//! 4. If the cache or the walk fails, ask the store directly for the one
//!    requested code, without caching.

use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

use tracing::{debug, error, warn};
use uuid::Uuid;

use warden_core::result::AppResult;
use warden_entity::principal::Principal;

use super::cache::PermissionCache;
use crate::store::PermissionStore;

/// Permission code reported for super principals.
pub const WILDCARD: &str = "*";

/// Computes effective permissions of principals.
#[derive(Clone)]
pub struct PermissionResolver {
    store: Arc<dyn PermissionStore>,
    cache: PermissionCache,
}

impl std::fmt::Debug for PermissionResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PermissionResolver")
            .field("cache", &self.cache)
            .finish()
    }
}

impl PermissionResolver {
    /// Creates a resolver.
    pub fn new(store: Arc<dyn PermissionStore>, cache: PermissionCache) -> Self {
        Self { store, cache }
    }

    /// The cache this resolver populates.
    pub fn cache(&self) -> &PermissionCache {
        &self.cache
    }

    /// Whether `principal` holds `code`, directly or through inheritance.
    ///
    /// Fails only when the uncached fallback fails too; that error is
    /// propagated rather than read as allow or deny.
    pub async fn check_permission(&self, principal: &Principal, code: &str) -> AppResult<bool> {
        if principal.is_super {
            return Ok(true);
        }

        match self.cache.get(principal.id).await {
            Ok(Some(permissions)) => return Ok(permissions.contains(code)),
            Ok(None) => {}
            Err(e) => {
                warn!(
                    principal_id = %principal.id,
                    error = %e,
                    "Permission cache unavailable, checking grant directly"
                );
                return self.check_direct(principal.id, code).await;
            }
        }

        match self.collect_grants(&principal.role_ids).await {
            Ok(permissions) => {
                self.populate(principal.id, &permissions).await;
                Ok(permissions.contains(code))
            }
            Err(e) => {
                warn!(
                    principal_id = %principal.id,
                    error = %e,
                    "Role traversal failed, checking grant directly"
                );
                self.check_direct(principal.id, code).await
            }
        }
    }

    /// The full effective permission set; `{"*"}` for super principals.
    ///
    /// Served from the cache when possible. A cache failure falls back to
    /// an uncached walk.
    pub async fn effective_permissions(&self, principal: &Principal) -> AppResult<BTreeSet<String>> {
        if principal.is_super {
            return Ok(BTreeSet::from([WILDCARD.to_string()]));
        }

        match self.cache.get(principal.id).await {
            Ok(Some(permissions)) => return Ok(permissions),
            Ok(None) => {
                let permissions = self.collect_grants(&principal.role_ids).await?;
                self.populate(principal.id, &permissions).await;
                Ok(permissions)
            }
            Err(e) => {
                warn!(
                    principal_id = %principal.id,
                    error = %e,
                    "Permission cache unavailable, resolving uncached"
                );
                self.collect_grants(&principal.role_ids).await
            }
        }
    }

    /// Breadth-first walk up the hierarchy, one store round-trip per depth.
    ///
    /// The visited set makes cycles and self-parents terminate; parents
    /// that do not exist are simply not returned by the store.
    async fn collect_grants(&self, role_ids: &[Uuid]) -> AppResult<BTreeSet<String>> {
        let mut visited: HashSet<Uuid> = HashSet::new();
        let mut frontier: Vec<Uuid> = role_ids
            .iter()
            .copied()
            .filter(|id| visited.insert(*id))
            .collect();
        let mut permissions = BTreeSet::new();

        while !frontier.is_empty() {
            let roles = self.store.load_roles(&frontier).await?;
            frontier = Vec::new();
            for role in roles {
                if let Some(parent) = role.parent_role_id {
                    if visited.insert(parent) {
                        frontier.push(parent);
                    }
                }
                permissions.extend(role.permissions);
            }
        }

        debug!(
            roles = visited.len(),
            permissions = permissions.len(),
            "Resolved role hierarchy"
        );
        Ok(permissions)
    }

    /// Best-effort cache write; a failure only costs a future miss.
    async fn populate(&self, principal_id: Uuid, permissions: &BTreeSet<String>) {
        if let Err(e) = self.cache.put(principal_id, permissions).await {
            warn!(principal_id = %principal_id, error = %e, "Failed to cache permission set");
        }
    }

    async fn check_direct(&self, principal_id: Uuid, code: &str) -> AppResult<bool> {
        self.store
            .has_permission_direct(principal_id, code)
            .await
            .inspect_err(|e| {
                error!(
                    principal_id = %principal_id,
                    code,
                    error = %e,
                    "Uncached permission check failed"
                );
            })
    }
}
