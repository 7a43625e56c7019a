//! Core traits defined in `warden-core` and implemented by other crates.

pub mod cache;
pub mod tenant;

pub use cache::CacheProvider;
pub use tenant::{ScopeValue, TenantScoped};
