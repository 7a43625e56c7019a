//! Token issuance and verification (HS256).

use std::time::Duration;

use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::Deserialize;
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use warden_core::config::AuthConfig;
use warden_core::error::AppError;
use warden_core::result::AppResult;

use super::claims::{Claims, RESERVED_CLAIMS, TokenError};

/// A freshly signed token and the claims it carries.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    /// Compact JWS string to hand to the client.
    pub token: String,
    /// The signed claims.
    pub claims: Claims,
    /// Expiry of the token.
    pub expires_at: DateTime<Utc>,
}

/// What the revocation registry keys an entry by.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevocationHandle {
    /// Token unique id, or the SHA-256 hex digest of the whole token.
    pub id: String,
    /// Expiry (seconds since epoch), when readable.
    pub expires_at: Option<i64>,
}

/// Only the fields revocation needs; everything optional.
#[derive(Debug, Deserialize)]
struct HandleClaims {
    jti: Option<String>,
    exp: Option<i64>,
}

/// Issues and verifies signed bearer tokens.
///
/// Stateless apart from the secret; verification never touches I/O.
#[derive(Clone)]
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    /// Full validation: signature, algorithm, expiry with leeway.
    validation: Validation,
    /// Signature only; used to read ids from tokens that may have expired.
    handle_validation: Validation,
    default_ttl: Duration,
}

impl std::fmt::Debug for TokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenService")
            .field("validation", &self.validation)
            .field("default_ttl", &self.default_ttl)
            .finish()
    }
}

impl TokenService {
    /// Creates a token service from auth configuration.
    pub fn new(config: &AuthConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.leeway = config.token_leeway_seconds;

        let mut handle_validation = Validation::new(Algorithm::HS256);
        handle_validation.validate_exp = false;
        handle_validation.required_spec_claims.clear();

        Self {
            encoding_key: EncodingKey::from_secret(config.jwt_secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            validation,
            handle_validation,
            default_ttl: Duration::from_secs(config.access_token_ttl_minutes * 60),
        }
    }

    /// Issues a token for `subject` carrying `extra` claims.
    ///
    /// `ttl` defaults to the configured access-token lifetime. Extra claims
    /// may not reuse the reserved names `sub`, `iat`, `exp`, `jti`.
    pub fn issue(
        &self,
        subject: Uuid,
        extra: Map<String, Value>,
        ttl: Option<Duration>,
    ) -> AppResult<IssuedToken> {
        if let Some(name) = RESERVED_CLAIMS.iter().find(|n| extra.contains_key(**n)) {
            return Err(AppError::validation(format!(
                "Claim '{name}' is reserved"
            )));
        }

        let ttl = chrono::Duration::from_std(ttl.unwrap_or(self.default_ttl))
            .map_err(|_| AppError::validation("Token TTL out of range"))?;
        let now = Utc::now();
        let expires_at = now + ttl;

        let claims = Claims {
            sub: subject,
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
            jti: Uuid::new_v4(),
            extra,
        };
        let token = self.sign(&claims)?;

        Ok(IssuedToken {
            token,
            expires_at: claims.expires_at(),
            claims,
        })
    }

    /// Signs arbitrary claims as-is.
    pub fn sign(&self, claims: &Claims) -> AppResult<String> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key)
            .map_err(|e| AppError::internal(format!("Failed to encode token: {e}")))
    }

    /// Verifies signature and expiry and returns the claims.
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::InvalidToken,
            })
    }

    /// Derives the revocation key of a token.
    ///
    /// Expired tokens still yield their unique id, so that revoking an
    /// expired token and checking it later agree. Tokens whose id cannot
    /// be read are keyed by a digest of the full token string.
    pub fn revocation_handle(&self, token: &str) -> RevocationHandle {
        let decoded = decode::<HandleClaims>(token, &self.decoding_key, &self.handle_validation)
            .ok()
            .map(|data| data.claims);

        match decoded {
            Some(HandleClaims {
                jti: Some(jti),
                exp,
            }) if !jti.is_empty() => RevocationHandle {
                id: jti,
                expires_at: exp,
            },
            other => RevocationHandle {
                id: hex::encode(Sha256::digest(token.as_bytes())),
                expires_at: other.and_then(|c| c.exp),
            },
        }
    }
}
