//! Role and grant storage used by permission resolution.

use async_trait::async_trait;
use uuid::Uuid;

use warden_core::result::AppResult;
use warden_database::repositories::RoleRepository;
use warden_entity::role::Role;

/// Read and write access to roles, grants and role assignments.
#[async_trait]
pub trait PermissionStore: Send + Sync + 'static {
    /// Loads the given roles with their direct grants; unknown ids are
    /// skipped.
    async fn load_roles(&self, ids: &[Uuid]) -> AppResult<Vec<Role>>;

    /// Uncached, single-code check over the principal's whole ancestry.
    async fn has_permission_direct(&self, principal_id: Uuid, code: &str) -> AppResult<bool>;

    /// Principals assigned to `role_id` or to any role inheriting from it.
    async fn principals_inheriting_role(&self, role_id: Uuid) -> AppResult<Vec<Uuid>>;

    /// Grants `code` to a role.
    async fn add_grant(&self, role_id: Uuid, code: &str) -> AppResult<()>;

    /// Removes a grant from a role.
    async fn remove_grant(&self, role_id: Uuid, code: &str) -> AppResult<()>;

    /// Changes a role's parent.
    async fn set_parent(&self, role_id: Uuid, parent_role_id: Option<Uuid>) -> AppResult<()>;

    /// Assigns a role to a principal.
    async fn assign_role(&self, principal_id: Uuid, role_id: Uuid) -> AppResult<()>;

    /// Removes a role assignment.
    async fn unassign_role(&self, principal_id: Uuid, role_id: Uuid) -> AppResult<()>;
}

#[async_trait]
impl PermissionStore for RoleRepository {
    async fn load_roles(&self, ids: &[Uuid]) -> AppResult<Vec<Role>> {
        RoleRepository::load_roles(self, ids).await
    }

    async fn has_permission_direct(&self, principal_id: Uuid, code: &str) -> AppResult<bool> {
        RoleRepository::has_permission_direct(self, principal_id, code).await
    }

    async fn principals_inheriting_role(&self, role_id: Uuid) -> AppResult<Vec<Uuid>> {
        RoleRepository::principals_inheriting_role(self, role_id).await
    }

    async fn add_grant(&self, role_id: Uuid, code: &str) -> AppResult<()> {
        RoleRepository::add_grant(self, role_id, code).await
    }

    async fn remove_grant(&self, role_id: Uuid, code: &str) -> AppResult<()> {
        RoleRepository::remove_grant(self, role_id, code).await
    }

    async fn set_parent(&self, role_id: Uuid, parent_role_id: Option<Uuid>) -> AppResult<()> {
        RoleRepository::set_parent(self, role_id, parent_role_id).await
    }

    async fn assign_role(&self, principal_id: Uuid, role_id: Uuid) -> AppResult<()> {
        RoleRepository::assign_role(self, principal_id, role_id).await
    }

    async fn unassign_role(&self, principal_id: Uuid, role_id: Uuid) -> AppResult<()> {
        RoleRepository::unassign_role(self, principal_id, role_id).await
    }
}
