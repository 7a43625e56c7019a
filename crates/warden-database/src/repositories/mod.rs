//! Concrete repository implementations.

pub mod principal;
pub mod role;

pub use principal::PrincipalRepository;
pub use role::RoleRepository;
