//! # warden-auth
//!
//! Authentication and authorization for Warden.
//!
//! ## Modules
//!
//! - `password`: Argon2id password hashing
//! - `token`: signed bearer token issuance and verification
//! - `revocation`: token revocation with a local fallback during cache outages
//! - `rbac`: role-hierarchy permission resolution, caching and administration
//! - `store`: storage seams (Postgres repositories and an in-memory store)
//! - `gate`: the `AccessGate` composing all of the above

mod bounded;

pub mod gate;
pub mod password;
pub mod rbac;
pub mod revocation;
pub mod store;
pub mod token;

pub use gate::{AccessGate, OwnedBy, ResourceCheck, TenantMember};
pub use password::PasswordHasher;
pub use rbac::{PermissionCache, PermissionResolver, RoleAdministration};
pub use revocation::RevocationRegistry;
pub use store::{MemoryAccessStore, PermissionStore, PrincipalDirectory};
pub use token::{Claims, IssuedToken, TokenError, TokenService};
