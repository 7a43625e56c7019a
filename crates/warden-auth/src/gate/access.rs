//! Access gate composing tokens, revocation, principals and permissions.

use std::collections::BTreeSet;
use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::{debug, error, info, warn};

use warden_core::error::AppError;
use warden_core::result::AppResult;
use warden_database::scope::TenantScopeEnforcer;
use warden_entity::principal::Principal;
use warden_entity::tenant::TenantContext;

use super::resource::ResourceCheck;
use super::{FORBIDDEN, UNAUTHENTICATED};
use crate::password::PasswordHasher;
use crate::rbac::PermissionResolver;
use crate::revocation::{RevocationBackend, RevocationRegistry};
use crate::store::PrincipalDirectory;
use crate::token::{IssuedToken, TokenService};

/// Single entry point for authentication and authorization.
///
/// Every denial carries a fixed message; the reason is only logged.
#[derive(Clone)]
pub struct AccessGate {
    tokens: Arc<TokenService>,
    revocations: Arc<RevocationRegistry>,
    directory: Arc<dyn PrincipalDirectory>,
    resolver: PermissionResolver,
    hasher: PasswordHasher,
}

impl std::fmt::Debug for AccessGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessGate")
            .field("tokens", &self.tokens)
            .field("resolver", &self.resolver)
            .finish()
    }
}

impl AccessGate {
    /// Creates the gate.
    pub fn new(
        tokens: Arc<TokenService>,
        revocations: Arc<RevocationRegistry>,
        directory: Arc<dyn PrincipalDirectory>,
        resolver: PermissionResolver,
    ) -> Self {
        Self {
            tokens,
            revocations,
            directory,
            resolver,
            hasher: PasswordHasher::new(),
        }
    }

    /// The token service.
    pub fn tokens(&self) -> &TokenService {
        &self.tokens
    }

    /// The revocation registry.
    pub fn revocations(&self) -> &RevocationRegistry {
        &self.revocations
    }

    /// The permission resolver.
    pub fn resolver(&self) -> &PermissionResolver {
        &self.resolver
    }

    /// Resolves a bearer token to an active principal.
    ///
    /// Bad signature, expiry, revocation, unknown subject and inactive
    /// subject all fail with the same `Unauthenticated` error. A principal
    /// that is neither super nor bound to a tenant fails `InvalidState`.
    pub async fn authenticate(&self, token: &str) -> AppResult<Principal> {
        let claims = self.tokens.verify(token).map_err(|e| {
            debug!(reason = %e, "Token rejected");
            AppError::from(e)
        })?;

        if self.revocations.is_revoked(token).await {
            debug!(token_id = %claims.jti, "Revoked token presented");
            return Err(AppError::unauthenticated(UNAUTHENTICATED));
        }

        let Some(principal) = self.directory.find_by_id(claims.sub).await? else {
            debug!(principal_id = %claims.sub, "Token subject not found");
            return Err(AppError::unauthenticated(UNAUTHENTICATED));
        };

        if !principal.is_active {
            debug!(principal_id = %principal.id, "Inactive principal presented a token");
            return Err(AppError::unauthenticated(UNAUTHENTICATED));
        }

        principal.validate_invariants().inspect_err(|e| {
            error!(principal_id = %principal.id, error = %e, "Principal violates tenant invariant");
        })?;

        Ok(principal)
    }

    /// Parses an `Authorization` header value (`Bearer <token>`) and
    /// authenticates the token.
    pub async fn authenticate_bearer(&self, header: Option<&str>) -> AppResult<Principal> {
        let token = header
            .and_then(|h| h.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| AppError::unauthenticated(UNAUTHENTICATED))?;
        self.authenticate(token).await
    }

    /// Requires `principal` to hold `code`.
    pub async fn authorize<'a>(
        &self,
        principal: &'a Principal,
        code: &str,
    ) -> AppResult<&'a Principal> {
        if self.resolver.check_permission(principal, code).await? {
            return Ok(principal);
        }
        info!(principal_id = %principal.id, code, "Permission denied");
        Err(AppError::forbidden(FORBIDDEN))
    }

    /// Requires `principal` to pass a per-resource check. Super principals
    /// always pass.
    pub async fn authorize_resource<'a, C: ResourceCheck + ?Sized>(
        &self,
        principal: &'a Principal,
        check: &C,
    ) -> AppResult<&'a Principal> {
        if principal.is_super || check.permits(principal).await? {
            return Ok(principal);
        }
        info!(
            principal_id = %principal.id,
            resource = %check.describe(),
            "Resource access denied"
        );
        Err(AppError::forbidden(FORBIDDEN))
    }

    /// Verifies credentials and issues a token.
    pub async fn login(&self, username: &str, password: &str) -> AppResult<IssuedToken> {
        let principal = self.directory.find_by_username(username).await?;

        // Unknown usernames pay for a verification too.
        let matches = self
            .hasher
            .verify_password_blocking(password, principal.as_ref().map(|p| p.password_hash.as_str()))
            .await?;

        let Some(principal) = principal else {
            debug!(username, "Login for unknown username");
            return Err(AppError::unauthenticated(UNAUTHENTICATED));
        };

        if !matches {
            warn!(principal_id = %principal.id, "Login with wrong password");
            return Err(AppError::unauthenticated(UNAUTHENTICATED));
        }

        if !principal.is_active {
            debug!(principal_id = %principal.id, "Login for inactive principal");
            return Err(AppError::unauthenticated(UNAUTHENTICATED));
        }

        principal.validate_invariants().inspect_err(|e| {
            error!(principal_id = %principal.id, error = %e, "Principal violates tenant invariant");
        })?;

        let mut extra = Map::new();
        extra.insert("username".to_string(), Value::String(principal.username.clone()));
        let issued = self.tokens.issue(principal.id, extra, None)?;

        info!(principal_id = %principal.id, token_id = %issued.claims.jti, "Principal logged in");
        Ok(issued)
    }

    /// Revokes `token`.
    pub async fn logout(&self, token: &str) -> RevocationBackend {
        self.revocations.revoke(token).await
    }

    /// Effective permissions of `principal`.
    pub async fn permissions(&self, principal: &Principal) -> AppResult<BTreeSet<String>> {
        self.resolver.effective_permissions(principal).await
    }

    /// Tenant context for a request made by `principal`.
    pub fn tenant_context(&self, principal: &Principal) -> TenantContext {
        TenantContext::for_principal(principal)
    }

    /// Query scope enforcer for a request made by `principal`.
    pub fn scope_enforcer(&self, principal: &Principal) -> TenantScopeEnforcer {
        TenantScopeEnforcer::from_context(self.tenant_context(principal))
    }
}
