//! Tenant-scoped query model.
//!
//! A [`SelectQuery`] describes a read against a [`TenantScoped`] entity but
//! cannot be executed. Only the [`TenantScopeEnforcer`] turns it into a
//! [`ScopedQuery`], and only a `ScopedQuery` can reach the database. This
//! makes "forgot to scope" a type error rather than a data leak.
//!
//! [`TenantScoped`]: warden_core::traits::TenantScoped

pub mod enforcer;
pub mod query;

pub use enforcer::{TenantScopeEnforcer, with_tenant_scope};
pub use query::{Predicate, ScopeMode, ScopedQuery, SelectQuery};
