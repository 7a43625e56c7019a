//! Signed bearer tokens.

pub mod claims;
pub mod service;

pub use claims::{Claims, TokenError};
pub use service::{IssuedToken, RevocationHandle, TokenService};
