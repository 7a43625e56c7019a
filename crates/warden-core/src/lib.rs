//! # warden-core
//!
//! Core crate for Warden. Contains the unified error system, configuration
//! schemas, and the traits implemented by the infrastructure crates
//! (cache backends, tenant-scoped entities).
//!
//! This crate has **no** internal dependencies on other Warden crates.

pub mod config;
pub mod error;
pub mod result;
pub mod traits;

pub use error::{AppError, ErrorKind};
pub use result::AppResult;
