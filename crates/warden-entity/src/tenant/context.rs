//! Tenant context carried through a single request.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::principal::Principal;

/// The tenant every query in the current request is scoped to.
///
/// Built from the authenticated principal at request start and dropped
/// at request end. It is passed explicitly to the scope enforcer rather
/// than looked up from ambient state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantContext {
    /// Resolved tenant, if any.
    pub tenant_id: Option<Uuid>,
    /// Whether the acting principal is a super principal.
    pub is_super: bool,
    /// The acting principal, for audit logging.
    pub principal_id: Option<Uuid>,
}

impl TenantContext {
    /// Derives the context from an authenticated principal.
    pub fn for_principal(principal: &Principal) -> Self {
        Self {
            tenant_id: principal.tenant_id,
            is_super: principal.is_super,
            principal_id: Some(principal.id),
        }
    }

    /// Context for a regular principal bound to a tenant.
    pub fn tenant(tenant_id: Uuid) -> Self {
        Self {
            tenant_id: Some(tenant_id),
            is_super: false,
            principal_id: None,
        }
    }

    /// Context for a super principal acting across tenants.
    pub fn super_principal() -> Self {
        Self {
            tenant_id: None,
            is_super: true,
            principal_id: None,
        }
    }

    /// Attaches the acting principal id.
    pub fn with_principal(mut self, principal_id: Uuid) -> Self {
        self.principal_id = Some(principal_id);
        self
    }
}
