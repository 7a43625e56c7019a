//! Health check handler.

use std::time::Duration;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;

use warden_core::traits::CacheProvider;

use crate::dto::response::{ApiResponse, HealthResponse};
use crate::state::AppState;

/// GET /health
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<ApiResponse<HealthResponse>>) {
    let cache_timeout = Duration::from_millis(state.config.cache.operation_timeout_ms);
    let cache_ok = matches!(
        tokio::time::timeout(cache_timeout, state.cache.health_check()).await,
        Ok(Ok(true))
    );

    let (database, database_ok) = match &state.database {
        Some(db) => match db.health_check().await {
            Ok(()) => ("connected", true),
            Err(e) => {
                tracing::warn!(error = %e, "Database health check failed");
                ("unreachable", false)
            }
        },
        None => ("disabled", true),
    };

    let healthy = cache_ok && database_ok;
    let status = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(ApiResponse::ok(HealthResponse {
            status: if healthy { "ok" } else { "degraded" }.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            cache: if cache_ok { "connected" } else { "unreachable" }.to_string(),
            database: database.to_string(),
        })),
    )
}
