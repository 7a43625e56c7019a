//! # warden-entity
//!
//! Domain entity models for Warden. Every struct in this crate represents
//! a database table row or a request-scoped value object. Database
//! entities additionally derive `sqlx::FromRow`.

pub mod principal;
pub mod role;
pub mod tenant;

pub use principal::Principal;
pub use role::{PermissionGrant, Role};
pub use tenant::TenantContext;
