//! Response DTOs.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Standard success response wrapper.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T: Serialize> {
    /// Whether the request was successful.
    pub success: bool,
    /// Response data.
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    /// Creates a successful response.
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

/// Login response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    /// Signed bearer token.
    pub access_token: String,
    /// Always `"Bearer"`.
    pub token_type: String,
    /// Token expiration.
    pub expires_at: DateTime<Utc>,
}

/// The authenticated principal and its effective permissions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeResponse {
    /// Principal ID.
    pub id: Uuid,
    /// Username.
    pub username: String,
    /// Owning tenant.
    pub tenant_id: Option<Uuid>,
    /// Super-principal flag.
    pub is_super: bool,
    /// Effective permission codes, sorted.
    pub permissions: BTreeSet<String>,
}

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// `"ok"` or `"degraded"`.
    pub status: String,
    /// Crate version.
    pub version: String,
    /// Cache reachability.
    pub cache: String,
    /// Database reachability, `"disabled"` without a database.
    pub database: String,
}
