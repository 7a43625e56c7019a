//! In-process principal and role store.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use warden_core::error::AppError;
use warden_core::result::AppResult;
use warden_database::scope::ScopedQuery;
use warden_entity::principal::Principal;
use warden_entity::role::Role;

use super::directory::PrincipalDirectory;
use super::permission::PermissionStore;

#[derive(Debug, Default)]
struct InnerState {
    principals: HashMap<Uuid, Principal>,
    roles: HashMap<Uuid, Role>,
}

impl InnerState {
    fn role_mut(&mut self, role_id: Uuid) -> AppResult<&mut Role> {
        self.roles
            .get_mut(&role_id)
            .ok_or_else(|| AppError::not_found(format!("Role {role_id} not found")))
    }

    fn principal_mut(&mut self, principal_id: Uuid) -> AppResult<&mut Principal> {
        self.principals
            .get_mut(&principal_id)
            .ok_or_else(|| AppError::not_found(format!("Principal {principal_id} not found")))
    }
}

/// Principals, roles and grants held in memory.
///
/// Implements both [`PrincipalDirectory`] and [`PermissionStore`] with the
/// same semantics as the Postgres repositories, including tolerance of
/// dangling and cyclic parent pointers.
#[derive(Debug, Clone, Default)]
pub struct MemoryAccessStore {
    state: Arc<RwLock<InnerState>>,
}

impl MemoryAccessStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a principal.
    pub async fn insert_principal(&self, principal: Principal) {
        self.state
            .write()
            .await
            .principals
            .insert(principal.id, principal);
    }

    /// Inserts or replaces a role and returns its id.
    pub async fn insert_role(&self, role: Role) -> Uuid {
        let id = role.id;
        self.state.write().await.roles.insert(id, role);
        id
    }

    /// Returns a copy of a role.
    pub async fn role(&self, role_id: Uuid) -> Option<Role> {
        self.state.read().await.roles.get(&role_id).cloned()
    }

    /// Runs a tenant-scoped query over the stored principals.
    pub async fn list_principals(&self, query: &ScopedQuery<Principal>) -> Vec<Principal> {
        let state = self.state.read().await;
        query.filter_rows(state.principals.values().cloned())
    }

    /// Activates or deactivates a principal.
    pub async fn set_active(&self, principal_id: Uuid, is_active: bool) -> AppResult<()> {
        let mut state = self.state.write().await;
        let principal = state.principal_mut(principal_id)?;
        principal.is_active = is_active;
        principal.updated_at = Utc::now();
        Ok(())
    }
}

#[async_trait]
impl PrincipalDirectory for MemoryAccessStore {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Principal>> {
        Ok(self.state.read().await.principals.get(&id).cloned())
    }

    async fn find_by_username(&self, username: &str) -> AppResult<Option<Principal>> {
        let state = self.state.read().await;
        Ok(state
            .principals
            .values()
            .find(|p| p.username.eq_ignore_ascii_case(username))
            .cloned())
    }
}

#[async_trait]
impl PermissionStore for MemoryAccessStore {
    async fn load_roles(&self, ids: &[Uuid]) -> AppResult<Vec<Role>> {
        let state = self.state.read().await;
        Ok(ids.iter().filter_map(|id| state.roles.get(id).cloned()).collect())
    }

    async fn has_permission_direct(&self, principal_id: Uuid, code: &str) -> AppResult<bool> {
        let state = self.state.read().await;
        let Some(principal) = state.principals.get(&principal_id) else {
            return Ok(false);
        };

        let mut visited = HashSet::new();
        let mut pending: Vec<Uuid> = principal.role_ids.clone();
        while let Some(role_id) = pending.pop() {
            if !visited.insert(role_id) {
                continue;
            }
            let Some(role) = state.roles.get(&role_id) else {
                continue;
            };
            if role.permissions.iter().any(|p| p == code) {
                return Ok(true);
            }
            pending.extend(role.parent_role_id);
        }
        Ok(false)
    }

    async fn principals_inheriting_role(&self, role_id: Uuid) -> AppResult<Vec<Uuid>> {
        let state = self.state.read().await;

        let mut affected: HashSet<Uuid> = HashSet::from([role_id]);
        loop {
            let before = affected.len();
            for role in state.roles.values() {
                if role.parent_role_id.is_some_and(|p| affected.contains(&p)) {
                    affected.insert(role.id);
                }
            }
            if affected.len() == before {
                break;
            }
        }

        Ok(state
            .principals
            .values()
            .filter(|p| p.role_ids.iter().any(|r| affected.contains(r)))
            .map(|p| p.id)
            .collect())
    }

    async fn add_grant(&self, role_id: Uuid, code: &str) -> AppResult<()> {
        let mut state = self.state.write().await;
        let role = state.role_mut(role_id)?;
        if !role.permissions.iter().any(|p| p == code) {
            role.permissions.push(code.to_string());
        }
        Ok(())
    }

    async fn remove_grant(&self, role_id: Uuid, code: &str) -> AppResult<()> {
        let mut state = self.state.write().await;
        state.role_mut(role_id)?.permissions.retain(|p| p != code);
        Ok(())
    }

    async fn set_parent(&self, role_id: Uuid, parent_role_id: Option<Uuid>) -> AppResult<()> {
        let mut state = self.state.write().await;
        state.role_mut(role_id)?.parent_role_id = parent_role_id;
        Ok(())
    }

    async fn assign_role(&self, principal_id: Uuid, role_id: Uuid) -> AppResult<()> {
        let mut state = self.state.write().await;
        let principal = state.principal_mut(principal_id)?;
        if !principal.has_role(role_id) {
            principal.role_ids.push(role_id);
            principal.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn unassign_role(&self, principal_id: Uuid, role_id: Uuid) -> AppResult<()> {
        let mut state = self.state.write().await;
        let principal = state.principal_mut(principal_id)?;
        principal.role_ids.retain(|r| *r != role_id);
        principal.updated_at = Utc::now();
        Ok(())
    }
}
