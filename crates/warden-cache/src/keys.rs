//! Cache key builders for all Warden cache entries.
//!
//! Providers add their own deployment prefix (e.g. `warden:`); the keys
//! here are the logical, namespaced part.

use uuid::Uuid;

// ── Revocation keys ────────────────────────────────────────

/// Namespace of revocation markers.
pub const REVOKED_TOKEN_PREFIX: &str = "revoked-token:";

/// Cache key marking a token unique id as revoked.
pub fn revoked_token(token_id: &str) -> String {
    format!("{REVOKED_TOKEN_PREFIX}{token_id}")
}

/// Returns `true` for keys that must stay until their TTL runs out and
/// may never be dropped to make room. Revocation markers are the only
/// such keys: losing one early would re-admit a revoked token.
pub fn is_pinned(key: &str) -> bool {
    key.starts_with(REVOKED_TOKEN_PREFIX)
}

// ── Permission keys ────────────────────────────────────────

/// Cache key for the resolved permission set of a principal.
pub fn principal_permissions(principal_id: Uuid) -> String {
    format!("perm:principal:{principal_id}")
}

/// Pattern matching every cached permission set.
pub fn all_principal_permissions() -> String {
    "perm:principal:*".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_revoked_token_key() {
        assert_eq!(revoked_token("abc"), "revoked-token:abc");
    }

    #[test]
    fn test_only_revocation_keys_are_pinned() {
        assert!(is_pinned(&revoked_token("abc")));
        assert!(!is_pinned(&principal_permissions(Uuid::new_v4())));
    }

    #[test]
    fn test_permission_key_matches_pattern_prefix() {
        let key = principal_permissions(Uuid::nil());
        assert_eq!(
            key,
            "perm:principal:00000000-0000-0000-0000-000000000000"
        );
        let prefix = all_principal_permissions();
        assert!(key.starts_with(prefix.trim_end_matches('*')));
    }
}
