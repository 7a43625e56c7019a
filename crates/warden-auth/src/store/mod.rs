//! Storage seams used by the resolver and the gate.
//!
//! Production wiring uses the Postgres repositories from `warden-database`;
//! [`MemoryAccessStore`] backs tests and single-process setups.

pub mod directory;
pub mod memory;
pub mod permission;

pub use directory::PrincipalDirectory;
pub use memory::MemoryAccessStore;
pub use permission::PermissionStore;
