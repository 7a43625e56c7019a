//! # warden-database
//!
//! PostgreSQL connection management, repositories for principals and roles,
//! and the tenant-scoped query model every tenant-owned read goes through.

pub mod connection;
pub mod migration;
pub mod repositories;
pub mod scope;

pub use connection::DatabasePool;
pub use scope::{SelectQuery, ScopedQuery, TenantScopeEnforcer, with_tenant_scope};
