//! Auth handlers: login, logout, me.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;

use crate::dto::request::LoginRequest;
use crate::dto::response::{ApiResponse, LoginResponse, MeResponse};
use crate::error::ApiError;
use crate::extractors::Authenticated;
use crate::state::AppState;

/// POST /api/auth/login
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<ApiResponse<LoginResponse>>, ApiError> {
    let issued = state.gate.login(&req.username, &req.password).await?;

    Ok(Json(ApiResponse::ok(LoginResponse {
        access_token: issued.token,
        token_type: "Bearer".to_string(),
        expires_at: issued.expires_at,
    })))
}

/// POST /api/auth/logout
pub async fn logout(State(state): State<AppState>, auth: Authenticated) -> StatusCode {
    let backend = state.gate.logout(&auth.token).await;
    tracing::info!(
        principal_id = %auth.principal.id,
        backend = ?backend,
        "Principal logged out"
    );
    StatusCode::NO_CONTENT
}

/// GET /api/auth/me
pub async fn me(
    State(state): State<AppState>,
    auth: Authenticated,
) -> Result<Json<ApiResponse<MeResponse>>, ApiError> {
    let permissions = state.gate.permissions(&auth.principal).await?;

    Ok(Json(ApiResponse::ok(MeResponse {
        id: auth.principal.id,
        username: auth.principal.username,
        tenant_id: auth.tenant.tenant_id,
        is_super: auth.tenant.is_super,
        permissions,
    })))
}
