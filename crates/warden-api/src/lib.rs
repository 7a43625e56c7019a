//! # warden-api
//!
//! HTTP API layer for Warden built on Axum.
//!
//! Exposes login, logout and identity endpoints, the `Authenticated`
//! extractor that runs every protected request through the access gate,
//! and the mapping of access-control errors to HTTP responses.

pub mod dto;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod router;
pub mod state;

pub use error::ApiError;
pub use router::build_router;
pub use state::AppState;
