mod common;

use chrono::Utc;
use serde_json::Map;
use uuid::Uuid;

use warden_auth::gate::{FORBIDDEN, UNAUTHENTICATED};
use warden_auth::token::Claims;
use warden_auth::{OwnedBy, PasswordHasher, TenantMember};
use warden_core::ErrorKind;
use warden_database::SelectQuery;
use warden_database::scope::ScopeMode;
use warden_entity::principal::Principal;
use warden_entity::role::Role;

use common::{Harness, principal, super_principal};

async fn registered(h: &Harness, username: &str, password: &str) -> Principal {
    let mut p = principal(Some(Uuid::new_v4()), Vec::new());
    p.username = username.to_string();
    p.password_hash = PasswordHasher::new().hash_password(password).unwrap();
    h.store.insert_principal(p.clone()).await;
    p
}

fn assert_unauthenticated(result: Result<impl std::fmt::Debug, warden_core::AppError>) {
    let err = result.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Unauthenticated);
    assert_eq!(err.message, UNAUTHENTICATED);
}

#[tokio::test]
async fn login_then_authenticate() {
    let h = Harness::new();
    let alice = registered(&h, "alice", "wonderland").await;

    let issued = h.gate.login("alice", "wonderland").await.unwrap();
    assert_eq!(issued.claims.sub, alice.id);
    assert_eq!(issued.claims.claim("username").unwrap(), "alice");

    let principal = h.gate.authenticate(&issued.token).await.unwrap();
    assert_eq!(principal.id, alice.id);
}

#[tokio::test]
async fn login_failures_are_uniform() {
    let h = Harness::new();
    let alice = registered(&h, "alice", "wonderland").await;

    assert_unauthenticated(h.gate.login("alice", "looking-glass").await);
    assert_unauthenticated(h.gate.login("mallory", "wonderland").await);

    h.store.set_active(alice.id, false).await.unwrap();
    assert_unauthenticated(h.gate.login("alice", "wonderland").await);
}

#[tokio::test]
async fn unknown_username_costs_a_password_verification() {
    let h = Harness::new();
    registered(&h, "alice", "wonderland").await;

    let started = std::time::Instant::now();
    assert_unauthenticated(h.gate.login("alice", "looking-glass").await);
    let wrong_password = started.elapsed();

    let started = std::time::Instant::now();
    assert_unauthenticated(h.gate.login("mallory", "wonderland").await);
    let unknown_user = started.elapsed();

    // Both paths run one Argon2 verification; allow generous jitter.
    assert!(
        unknown_user * 3 >= wrong_password,
        "unknown user {unknown_user:?} vs wrong password {wrong_password:?}"
    );
}

#[tokio::test]
async fn logout_revokes_the_token() {
    let h = Harness::new();
    let alice = principal(Some(Uuid::new_v4()), Vec::new());
    h.store.insert_principal(alice.clone()).await;
    let token = h.tokens.issue(alice.id, Map::new(), None).unwrap().token;

    assert!(h.gate.authenticate(&token).await.is_ok());
    h.gate.logout(&token).await;
    assert_unauthenticated(h.gate.authenticate(&token).await);
}

#[tokio::test]
async fn rejected_tokens_share_one_outcome() {
    let h = Harness::new();
    let alice = principal(Some(Uuid::new_v4()), Vec::new());
    h.store.insert_principal(alice.clone()).await;

    // Malformed.
    assert_unauthenticated(h.gate.authenticate("garbage").await);

    // Expired.
    let now = Utc::now().timestamp();
    let expired = h
        .tokens
        .sign(&Claims {
            sub: alice.id,
            iat: now - 7200,
            exp: now - 3600,
            jti: Uuid::new_v4(),
            extra: Map::new(),
        })
        .unwrap();
    assert_unauthenticated(h.gate.authenticate(&expired).await);

    // Unknown subject.
    let stranger = h.tokens.issue(Uuid::new_v4(), Map::new(), None).unwrap().token;
    assert_unauthenticated(h.gate.authenticate(&stranger).await);

    // Inactive subject.
    let token = h.tokens.issue(alice.id, Map::new(), None).unwrap().token;
    h.store.set_active(alice.id, false).await.unwrap();
    assert_unauthenticated(h.gate.authenticate(&token).await);
}

#[tokio::test]
async fn principal_breaking_tenant_invariant_is_invalid_state() {
    let h = Harness::new();
    let broken = principal(None, Vec::new());
    h.store.insert_principal(broken.clone()).await;
    let token = h.tokens.issue(broken.id, Map::new(), None).unwrap().token;

    let err = h.gate.authenticate(&token).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::InvalidState);
}

#[tokio::test]
async fn bearer_header_parsing() {
    let h = Harness::new();
    let alice = principal(Some(Uuid::new_v4()), Vec::new());
    h.store.insert_principal(alice.clone()).await;
    let token = h.tokens.issue(alice.id, Map::new(), None).unwrap().token;

    let header = format!("Bearer {token}");
    let found = h.gate.authenticate_bearer(Some(&header)).await.unwrap();
    assert_eq!(found.id, alice.id);

    assert_unauthenticated(h.gate.authenticate_bearer(None).await);
    assert_unauthenticated(h.gate.authenticate_bearer(Some(&token)).await);
    assert_unauthenticated(h.gate.authenticate_bearer(Some("Bearer ")).await);
}

#[tokio::test]
async fn authorize_checks_inherited_permissions() {
    let h = Harness::new();
    let viewer = h.store.insert_role(Role::new("viewer", None, &["read:doc"])).await;
    let editor = h
        .store
        .insert_role(Role::new("editor", Some(viewer), &["write:doc"]))
        .await;
    let alice = principal(Some(Uuid::new_v4()), vec![editor]);

    assert!(h.gate.authorize(&alice, "read:doc").await.is_ok());
    assert!(h.gate.authorize(&alice, "write:doc").await.is_ok());

    let err = h.gate.authorize(&alice, "delete:doc").await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Forbidden);
    assert_eq!(err.message, FORBIDDEN);

    assert!(h.gate.authorize(&super_principal(), "delete:doc").await.is_ok());
}

#[tokio::test]
async fn resource_checks() {
    let h = Harness::new();
    let tenant = Uuid::new_v4();
    let alice = principal(Some(tenant), Vec::new());

    assert!(h.gate.authorize_resource(&alice, &OwnedBy(alice.id)).await.is_ok());
    assert!(h.gate.authorize_resource(&alice, &TenantMember(tenant)).await.is_ok());

    let err = h
        .gate
        .authorize_resource(&alice, &OwnedBy(Uuid::new_v4()))
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Forbidden);
    let err = h
        .gate
        .authorize_resource(&alice, &TenantMember(Uuid::new_v4()))
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Forbidden);

    let root = super_principal();
    assert!(h.gate.authorize_resource(&root, &OwnedBy(Uuid::new_v4())).await.is_ok());
}

#[tokio::test]
async fn scope_enforcer_limits_reads_to_the_callers_tenant() {
    let h = Harness::new();
    let acme = Uuid::new_v4();
    let globex = Uuid::new_v4();
    let alice = principal(Some(acme), Vec::new());
    let bob = principal(Some(acme), Vec::new());
    let eve = principal(Some(globex), Vec::new());
    for p in [&alice, &bob, &eve] {
        h.store.insert_principal(p.clone()).await;
    }

    let enforcer = h.gate.scope_enforcer(&alice);
    let scoped = enforcer.apply(SelectQuery::<Principal>::new()).unwrap();
    assert_eq!(scoped.mode(), ScopeMode::Tenant(acme));

    let visible = h.store.list_principals(&scoped).await;
    assert_eq!(visible.len(), 2);
    assert!(visible.iter().all(|p| p.tenant_id == Some(acme)));

    let snooping = SelectQuery::<Principal>::new().filter_eq("tenant_id", globex);
    let err = enforcer.apply(snooping).unwrap_err();
    assert_eq!(err.kind, ErrorKind::Forbidden);

    let root = super_principal();
    let everything = h
        .gate
        .scope_enforcer(&root)
        .apply(SelectQuery::<Principal>::new())
        .unwrap();
    assert_eq!(h.store.list_principals(&everything).await.len(), 3);
}

#[tokio::test]
async fn tenant_context_reflects_the_principal() {
    let h = Harness::new();
    let tenant = Uuid::new_v4();
    let alice = principal(Some(tenant), Vec::new());

    let ctx = h.gate.tenant_context(&alice);
    assert_eq!(ctx.tenant_id, Some(tenant));
    assert!(!ctx.is_super);
    assert_eq!(ctx.principal_id, Some(alice.id));
}
