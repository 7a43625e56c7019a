//! Token revocation.

pub mod registry;

pub use registry::{RevocationBackend, RevocationRegistry};
