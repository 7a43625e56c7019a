//! Tenant-scoping contract for persisted entities.
//!
//! An entity declares whether it carries a tenant attribute. Entities
//! with `TENANT_COLUMN = None` are global and bypass tenant scoping;
//! everything else is filtered by the tenant of the acting principal.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A typed value usable in a query predicate.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScopeValue {
    /// UUID column value.
    Uuid(Uuid),
    /// Text column value.
    Text(String),
    /// Integer column value.
    Int(i64),
    /// Boolean column value.
    Bool(bool),
    /// SQL `NULL`.
    Null,
}

impl From<Uuid> for ScopeValue {
    fn from(value: Uuid) -> Self {
        Self::Uuid(value)
    }
}

impl From<Option<Uuid>> for ScopeValue {
    fn from(value: Option<Uuid>) -> Self {
        value.map_or(Self::Null, Self::Uuid)
    }
}

impl From<&str> for ScopeValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for ScopeValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i64> for ScopeValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<bool> for ScopeValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

/// Declares how an entity participates in tenant scoping.
///
/// Column names are trusted, compile-time identifiers; they are written
/// into SQL verbatim while values are always bound as parameters.
pub trait TenantScoped {
    /// Table the entity is stored in.
    const TABLE: &'static str;

    /// Relation scoped reads select from. Defaults to `TABLE`; entities
    /// whose rows carry joined columns override it with an aliased
    /// subquery exposing the same column names as `column_value`.
    const SOURCE: &'static str = Self::TABLE;

    /// Column holding the tenant id, or `None` for global entities.
    const TENANT_COLUMN: Option<&'static str>;

    /// Returns the value of `column` for this row, used when a query is
    /// evaluated against already-loaded rows. `None` for unknown columns.
    fn column_value(&self, column: &str) -> Option<ScopeValue>;
}
