//! Role and grant mutations with synchronous cache invalidation.

use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use warden_core::result::AppResult;

use super::cache::PermissionCache;
use crate::store::PermissionStore;

/// Mutation path for roles, grants and assignments.
///
/// Every operation writes to the store first and then invalidates the
/// cached permission sets of each affected principal before returning. A
/// failed invalidation is returned as a `Cache` error; the store change
/// has already been applied and the cache TTL bounds the staleness.
#[derive(Clone)]
pub struct RoleAdministration {
    store: Arc<dyn PermissionStore>,
    cache: PermissionCache,
}

impl std::fmt::Debug for RoleAdministration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoleAdministration").finish()
    }
}

impl RoleAdministration {
    /// Creates the administration service.
    pub fn new(store: Arc<dyn PermissionStore>, cache: PermissionCache) -> Self {
        Self { store, cache }
    }

    /// Grants `code` to a role.
    pub async fn grant_permission(&self, role_id: Uuid, code: &str) -> AppResult<()> {
        self.store.add_grant(role_id, code).await?;
        info!(role_id = %role_id, code, "Permission granted");
        self.invalidate_role(role_id).await
    }

    /// Revokes `code` from a role.
    pub async fn revoke_permission(&self, role_id: Uuid, code: &str) -> AppResult<()> {
        self.store.remove_grant(role_id, code).await?;
        info!(role_id = %role_id, code, "Permission revoked");
        self.invalidate_role(role_id).await
    }

    /// Moves a role under a new parent (or to the root).
    pub async fn set_parent(&self, role_id: Uuid, parent_role_id: Option<Uuid>) -> AppResult<()> {
        self.store.set_parent(role_id, parent_role_id).await?;
        info!(role_id = %role_id, parent_role_id = ?parent_role_id, "Role parent changed");
        self.invalidate_role(role_id).await
    }

    /// Assigns a role to a principal.
    pub async fn assign_role(&self, principal_id: Uuid, role_id: Uuid) -> AppResult<()> {
        self.store.assign_role(principal_id, role_id).await?;
        info!(principal_id = %principal_id, role_id = %role_id, "Role assigned");
        self.cache.invalidate(principal_id).await
    }

    /// Removes a role from a principal.
    pub async fn unassign_role(&self, principal_id: Uuid, role_id: Uuid) -> AppResult<()> {
        self.store.unassign_role(principal_id, role_id).await?;
        info!(principal_id = %principal_id, role_id = %role_id, "Role unassigned");
        self.cache.invalidate(principal_id).await
    }

    /// Invalidates everyone holding `role_id` or a role below it.
    async fn invalidate_role(&self, role_id: Uuid) -> AppResult<()> {
        let affected = self.store.principals_inheriting_role(role_id).await?;
        self.cache.invalidate_many(&affected).await?;
        info!(
            role_id = %role_id,
            principals = affected.len(),
            "Invalidated cached permissions"
        );
        Ok(())
    }
}
