//! Authentication and authorization configuration.

use serde::{Deserialize, Serialize};

/// Placeholder signing secret shipped in the default configuration.
pub const DEFAULT_JWT_SECRET: &str = "CHANGE_ME_IN_PRODUCTION";

/// Token signing, revocation, and permission-cache configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Secret key for token signing (HMAC-SHA256).
    #[serde(default = "default_jwt_secret")]
    pub jwt_secret: String,
    /// Default access token TTL in minutes.
    #[serde(default = "default_access_ttl")]
    pub access_token_ttl_minutes: u64,
    /// Clock-skew leeway applied to expiry checks, in seconds.
    #[serde(default = "default_leeway")]
    pub token_leeway_seconds: u64,
    /// Minimum lifetime of a revocation entry in seconds.
    #[serde(default = "default_revocation_min_ttl")]
    pub revocation_min_ttl_seconds: u64,
    /// Lifetime of a revocation entry when the token carries no expiry.
    #[serde(default = "default_revocation_default_ttl")]
    pub revocation_default_ttl_seconds: u64,
    /// Upper bound on how long a resolved permission set stays cached.
    #[serde(default = "default_permission_cache_ttl")]
    pub permission_cache_ttl_seconds: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: default_jwt_secret(),
            access_token_ttl_minutes: default_access_ttl(),
            token_leeway_seconds: default_leeway(),
            revocation_min_ttl_seconds: default_revocation_min_ttl(),
            revocation_default_ttl_seconds: default_revocation_default_ttl(),
            permission_cache_ttl_seconds: default_permission_cache_ttl(),
        }
    }
}

impl AuthConfig {
    /// Returns `true` while the placeholder secret is still in place.
    pub fn uses_default_secret(&self) -> bool {
        self.jwt_secret == DEFAULT_JWT_SECRET
    }
}

fn default_jwt_secret() -> String {
    DEFAULT_JWT_SECRET.to_string()
}

fn default_access_ttl() -> u64 {
    15
}

fn default_leeway() -> u64 {
    5
}

fn default_revocation_min_ttl() -> u64 {
    60
}

fn default_revocation_default_ttl() -> u64 {
    86400
}

fn default_permission_cache_ttl() -> u64 {
    300
}
