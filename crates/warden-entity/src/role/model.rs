//! Role and permission grant models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use warden_core::traits::{ScopeValue, TenantScoped};

/// A role in the inheritance forest.
///
/// A role inherits every grant of its ancestors. `parent_role_id` is not
/// guaranteed to point at an existing role, nor to be acyclic; resolvers
/// must tolerate both.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Role {
    /// Unique role identifier.
    pub id: Uuid,
    /// Unique role name (e.g. `"editor"`).
    pub name: String,
    /// Parent role, if any.
    pub parent_role_id: Option<Uuid>,
    /// Permission codes granted directly to this role.
    pub permissions: Vec<String>,
    /// When the role was created.
    pub created_at: DateTime<Utc>,
}

impl Role {
    /// Creates a role value with the given direct grants.
    pub fn new(name: impl Into<String>, parent_role_id: Option<Uuid>, permissions: &[&str]) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            parent_role_id,
            permissions: permissions.iter().map(|p| p.to_string()).collect(),
            created_at: Utc::now(),
        }
    }
}

// Roles are shared across tenants.
impl TenantScoped for Role {
    const TABLE: &'static str = "roles";
    const SOURCE: &'static str = "(SELECT r.id, r.name, r.parent_role_id, r.created_at, \
        COALESCE(array_agg(rp.permission_code) \
                 FILTER (WHERE rp.permission_code IS NOT NULL), '{}') AS permissions \
        FROM roles r LEFT JOIN role_permissions rp ON rp.role_id = r.id \
        GROUP BY r.id) AS roles";
    const TENANT_COLUMN: Option<&'static str> = None;

    fn column_value(&self, column: &str) -> Option<ScopeValue> {
        match column {
            "id" => Some(self.id.into()),
            "name" => Some(self.name.as_str().into()),
            "parent_role_id" => Some(self.parent_role_id.into()),
            _ => None,
        }
    }
}

/// A single permission code granted to a role.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, FromRow)]
pub struct PermissionGrant {
    /// The role holding the grant.
    pub role_id: Uuid,
    /// Opaque permission code (e.g. `"write:doc"`).
    pub permission_code: String,
}
