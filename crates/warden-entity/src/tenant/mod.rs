//! Request-scoped tenant context.

pub mod context;

pub use context::TenantContext;
