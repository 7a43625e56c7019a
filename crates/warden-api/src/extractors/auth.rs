//! `Authenticated` extractor: resolves the bearer token to a principal and
//! derives the request's tenant context.

use axum::extract::FromRequestParts;
use axum::http::header;
use axum::http::request::Parts;

use warden_database::scope::TenantScopeEnforcer;
use warden_entity::principal::Principal;
use warden_entity::tenant::TenantContext;

use crate::error::ApiError;
use crate::state::AppState;

/// The authenticated caller of a request.
#[derive(Debug, Clone)]
pub struct Authenticated {
    /// The active principal behind the token.
    pub principal: Principal,
    /// Tenant context for this request only.
    pub tenant: TenantContext,
    /// The raw bearer token, kept for logout.
    pub token: String,
}

impl Authenticated {
    /// Query scope enforcer bound to this request's tenant context.
    pub fn scope(&self) -> TenantScopeEnforcer {
        TenantScopeEnforcer::from_context(self.tenant)
    }
}

impl FromRequestParts<AppState> for Authenticated {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header_value = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok());

        let principal = state.gate.authenticate_bearer(header_value).await?;

        let token = header_value
            .and_then(|h| h.strip_prefix("Bearer "))
            .map(str::trim)
            .unwrap_or_default()
            .to_string();

        let tenant = state.gate.tenant_context(&principal);

        Ok(Self {
            principal,
            tenant,
            token,
        })
    }
}
