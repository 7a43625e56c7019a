//! The access gate: authentication and authorization entry point.

pub mod access;
pub mod resource;

pub use access::AccessGate;
pub use resource::{OwnedBy, ResourceCheck, TenantMember};

/// Message of every authentication failure. Callers cannot tell a bad
/// signature from an expired, revoked or unknown-subject token.
pub const UNAUTHENTICATED: &str = "Invalid or expired credentials";

/// Message of every authorization failure.
pub const FORBIDDEN: &str = "Insufficient permissions";
