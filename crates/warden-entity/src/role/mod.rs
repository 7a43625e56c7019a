//! Role hierarchy and permission grant entities.

pub mod model;

pub use model::{PermissionGrant, Role};
