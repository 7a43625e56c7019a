//! Principal entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use warden_core::error::AppError;
use warden_core::traits::{ScopeValue, TenantScoped};

/// An authenticated actor: a user or service account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Principal {
    /// Unique principal identifier.
    pub id: Uuid,
    /// Owning tenant. `None` only for super principals.
    pub tenant_id: Option<Uuid>,
    /// Unique login name.
    pub username: String,
    /// Argon2 password hash.
    #[serde(skip_serializing)]
    pub password_hash: String,
    /// Exempt from tenant scoping and permission checks.
    pub is_super: bool,
    /// Inactive principals cannot authenticate.
    pub is_active: bool,
    /// Directly assigned role ids (loaded from `principal_roles`).
    #[sqlx(skip)]
    #[serde(default)]
    pub role_ids: Vec<Uuid>,
    /// When the principal was created.
    pub created_at: DateTime<Utc>,
    /// When the principal was last updated.
    pub updated_at: DateTime<Utc>,
}

impl Principal {
    /// Checks the super/tenant invariant: a non-super principal must
    /// belong to a tenant.
    pub fn validate_invariants(&self) -> Result<(), AppError> {
        if !self.is_super && self.tenant_id.is_none() {
            return Err(AppError::invalid_state(format!(
                "Principal {} is not super but has no tenant",
                self.id
            )));
        }
        Ok(())
    }

    /// Returns `true` if the principal holds the given role directly.
    pub fn has_role(&self, role_id: Uuid) -> bool {
        self.role_ids.contains(&role_id)
    }
}

impl TenantScoped for Principal {
    const TABLE: &'static str = "principals";
    const TENANT_COLUMN: Option<&'static str> = Some("tenant_id");

    fn column_value(&self, column: &str) -> Option<ScopeValue> {
        match column {
            "id" => Some(self.id.into()),
            "tenant_id" => Some(self.tenant_id.into()),
            "username" => Some(self.username.as_str().into()),
            "is_super" => Some(self.is_super.into()),
            "is_active" => Some(self.is_active.into()),
            _ => None,
        }
    }
}

/// Data required to create a new principal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePrincipal {
    /// Owning tenant (`None` only together with `is_super`).
    pub tenant_id: Option<Uuid>,
    /// Desired username.
    pub username: String,
    /// Pre-hashed password.
    pub password_hash: String,
    /// Super-principal flag.
    pub is_super: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn principal(tenant_id: Option<Uuid>, is_super: bool) -> Principal {
        Principal {
            id: Uuid::new_v4(),
            tenant_id,
            username: "alice".to_string(),
            password_hash: String::new(),
            is_super,
            is_active: true,
            role_ids: Vec::new(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_non_super_without_tenant_is_invalid() {
        let err = principal(None, false).validate_invariants().unwrap_err();
        assert_eq!(err.kind, warden_core::ErrorKind::InvalidState);
    }

    #[test]
    fn test_super_without_tenant_is_valid() {
        assert!(principal(None, true).validate_invariants().is_ok());
        assert!(principal(Some(Uuid::new_v4()), false)
            .validate_invariants()
            .is_ok());
    }

    #[test]
    fn test_password_hash_not_serialized() {
        let mut p = principal(Some(Uuid::new_v4()), false);
        p.password_hash = "$argon2id$secret".to_string();
        let json = serde_json::to_string(&p).unwrap();
        assert!(!json.contains("argon2id"));
    }

    #[test]
    fn test_tenant_column_value() {
        let tenant = Uuid::new_v4();
        let p = principal(Some(tenant), false);
        assert_eq!(p.column_value("tenant_id"), Some(ScopeValue::Uuid(tenant)));
        assert_eq!(p.column_value("nope"), None);
    }
}
