//! Dual-backend revocation registry.
//!
//! Entries go to the shared cache under `revoked-token:<id>` with a TTL that
//! outlives the token. If the cache is missing, slow or failing, the id is
//! kept in an in-process set instead. That set has no TTL and lives as long
//! as the registry, so a revocation made during an outage is visible on
//! this node only and is lost on restart.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use warden_cache::CacheManager;
use warden_cache::keys;
use warden_core::config::{AuthConfig, CacheConfig};
use warden_core::traits::CacheProvider;

use crate::bounded::within;
use crate::token::TokenService;

/// Value stored under every revocation key.
pub const REVOKED_SENTINEL: &str = "revoked";

/// Where a revocation was recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevocationBackend {
    /// The shared cache, visible to every node.
    Shared,
    /// The in-process fallback set of this node.
    Local,
}

/// Blacklist of revoked tokens.
///
/// Constructed once at startup and injected wherever revocation is needed.
#[derive(Debug)]
pub struct RevocationRegistry {
    tokens: Arc<TokenService>,
    cache: Option<Arc<CacheManager>>,
    fallback: Mutex<HashSet<String>>,
    min_ttl: Duration,
    default_ttl: Duration,
    leeway: Duration,
    operation_timeout: Duration,
}

impl RevocationRegistry {
    /// Creates a registry. `cache` is `None` when no shared backend is
    /// configured, in which case every revocation is local.
    pub fn new(
        tokens: Arc<TokenService>,
        cache: Option<Arc<CacheManager>>,
        auth: &AuthConfig,
        cache_config: &CacheConfig,
    ) -> Self {
        Self {
            tokens,
            cache,
            fallback: Mutex::new(HashSet::new()),
            min_ttl: Duration::from_secs(auth.revocation_min_ttl_seconds),
            default_ttl: Duration::from_secs(auth.revocation_default_ttl_seconds),
            leeway: Duration::from_secs(auth.token_leeway_seconds),
            operation_timeout: Duration::from_millis(cache_config.operation_timeout_ms),
        }
    }

    /// Revokes `token`. Never fails: if the shared write does not succeed
    /// the token is revoked locally.
    pub async fn revoke(&self, token: &str) -> RevocationBackend {
        let handle = self.tokens.revocation_handle(token);
        let ttl = self.entry_ttl(handle.expires_at);
        let key = keys::revoked_token(&handle.id);

        if let Some(cache) = &self.cache {
            match within(
                self.operation_timeout,
                cache.set(&key, REVOKED_SENTINEL, ttl),
            )
            .await
            {
                Ok(()) => {
                    info!(token_id = %handle.id, ttl_secs = ttl.as_secs(), "Token revoked");
                    return RevocationBackend::Shared;
                }
                Err(e) => {
                    warn!(
                        token_id = %handle.id,
                        error = %e,
                        "Shared revocation failed, revoking on this node only"
                    );
                }
            }
        }

        self.fallback.lock().await.insert(handle.id);
        RevocationBackend::Local
    }

    /// Returns `true` if `token` was revoked. Never fails.
    pub async fn is_revoked(&self, token: &str) -> bool {
        let handle = self.tokens.revocation_handle(token);

        if let Some(cache) = &self.cache {
            let key = keys::revoked_token(&handle.id);
            match within(self.operation_timeout, cache.exists(&key)).await {
                Ok(true) => return true,
                Ok(false) => {}
                Err(e) => {
                    debug!(error = %e, "Revocation lookup degraded to local set");
                }
            }
        }

        self.fallback.lock().await.contains(&handle.id)
    }

    /// Number of ids held in the local fallback set.
    pub async fn local_entries(&self) -> usize {
        self.fallback.lock().await.len()
    }

    /// Time until the token stops verifying (expiry plus the verification
    /// leeway), floored at `min_ttl`; `default_ttl` when the token has no
    /// readable expiry.
    fn entry_ttl(&self, expires_at: Option<i64>) -> Duration {
        match expires_at {
            Some(exp) => {
                let leeway = i64::try_from(self.leeway.as_secs()).unwrap_or(i64::MAX);
                let accepted_until = exp.saturating_add(leeway);
                let remaining =
                    u64::try_from(accepted_until.saturating_sub(Utc::now().timestamp())).unwrap_or(0);
                Duration::from_secs(remaining).max(self.min_ttl)
            }
            None => self.default_ttl,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> RevocationRegistry {
        let auth = AuthConfig::default();
        RevocationRegistry::new(
            Arc::new(TokenService::new(&auth)),
            None,
            &auth,
            &CacheConfig::default(),
        )
    }

    #[test]
    fn test_entry_ttl_floor_and_default() {
        let registry = registry();
        let now = Utc::now().timestamp();

        assert_eq!(registry.entry_ttl(None), Duration::from_secs(86400));
        assert_eq!(registry.entry_ttl(Some(now - 100)), Duration::from_secs(60));
        assert_eq!(registry.entry_ttl(Some(now + 10)), Duration::from_secs(60));
    }

    #[test]
    fn test_entry_ttl_covers_verification_leeway() {
        let registry = registry();
        let leeway = AuthConfig::default().token_leeway_seconds;
        let now = Utc::now().timestamp();

        let long = registry.entry_ttl(Some(now + 900));
        assert!(long >= Duration::from_secs(899 + leeway));
        assert!(long <= Duration::from_secs(900 + leeway));
    }

    #[test]
    fn test_entry_ttl_without_floor_outlives_acceptance_window() {
        let auth = AuthConfig {
            revocation_min_ttl_seconds: 1,
            token_leeway_seconds: 30,
            ..AuthConfig::default()
        };
        let registry = RevocationRegistry::new(
            Arc::new(TokenService::new(&auth)),
            None,
            &auth,
            &CacheConfig::default(),
        );
        let now = Utc::now().timestamp();

        // Expiring in 3s: still accepted for 3s + 30s of leeway.
        assert!(registry.entry_ttl(Some(now + 3)) >= Duration::from_secs(32));
        // Expired 10s ago: still inside the leeway for ~20s more.
        let overdue = registry.entry_ttl(Some(now - 10));
        assert!(overdue >= Duration::from_secs(19) && overdue <= Duration::from_secs(20));
        // Past the leeway entirely: only the floor remains.
        assert_eq!(registry.entry_ttl(Some(now - 60)), Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_without_shared_cache_revocation_is_local() {
        let registry = registry();
        assert!(!registry.is_revoked("some-token").await);

        assert_eq!(registry.revoke("some-token").await, RevocationBackend::Local);
        assert!(registry.is_revoked("some-token").await);
        assert!(!registry.is_revoked("other-token").await);
        assert_eq!(registry.local_entries().await, 1);
    }
}
