//! Per-resource membership and ownership checks.

use async_trait::async_trait;
use uuid::Uuid;

use warden_core::result::AppResult;
use warden_entity::principal::Principal;

/// A check that a principal may act on one specific resource.
///
/// Complements query scoping: scoping filters what can be read, a resource
/// check guards an action on a resource already in hand.
#[async_trait]
pub trait ResourceCheck: Send + Sync {
    /// Short description used in logs.
    fn describe(&self) -> String;

    /// Returns `true` if `principal` may act on the resource.
    async fn permits(&self, principal: &Principal) -> AppResult<bool>;
}

/// The resource belongs to a specific principal.
#[derive(Debug, Clone, Copy)]
pub struct OwnedBy(pub Uuid);

#[async_trait]
impl ResourceCheck for OwnedBy {
    fn describe(&self) -> String {
        format!("owned by {}", self.0)
    }

    async fn permits(&self, principal: &Principal) -> AppResult<bool> {
        Ok(principal.id == self.0)
    }
}

/// The resource belongs to a specific tenant.
#[derive(Debug, Clone, Copy)]
pub struct TenantMember(pub Uuid);

#[async_trait]
impl ResourceCheck for TenantMember {
    fn describe(&self) -> String {
        format!("tenant {}", self.0)
    }

    async fn permits(&self, principal: &Principal) -> AppResult<bool> {
        Ok(principal.tenant_id == Some(self.0))
    }
}
