//! Principal domain entities.

pub mod model;

pub use model::{CreatePrincipal, Principal};
