//! Role-hierarchy permissions: resolution, caching and administration.

pub mod admin;
pub mod cache;
pub mod resolver;

pub use admin::RoleAdministration;
pub use cache::PermissionCache;
pub use resolver::PermissionResolver;
