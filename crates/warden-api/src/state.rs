//! Application state shared across all handlers and extractors.

use std::sync::Arc;

use warden_auth::AccessGate;
use warden_cache::CacheManager;
use warden_core::config::AppConfig;
use warden_database::DatabasePool;

/// Application state containing all shared dependencies.
///
/// Passed to every Axum handler via `State<AppState>`.
/// All fields are cheap to clone.
#[derive(Debug, Clone)]
pub struct AppState {
    // ── Configuration ────────────────────────────────────────
    /// Application configuration
    pub config: Arc<AppConfig>,

    // ── Infrastructure ───────────────────────────────────────
    /// PostgreSQL pool; `None` when running on the in-memory store
    pub database: Option<DatabasePool>,
    /// Cache manager (Redis or in-memory)
    pub cache: Arc<CacheManager>,

    // ── Auth ─────────────────────────────────────────────────
    /// Authentication and authorization entry point
    pub gate: Arc<AccessGate>,
}
