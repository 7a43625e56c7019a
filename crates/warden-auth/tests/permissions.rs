mod common;

use std::collections::BTreeSet;
use std::sync::Arc;

use uuid::Uuid;

use warden_auth::store::{MemoryAccessStore, PermissionStore, PrincipalDirectory};
use warden_core::ErrorKind;
use warden_entity::role::Role;

use common::{BrokenStore, Harness, principal, super_principal};

fn set(codes: &[&str]) -> BTreeSet<String> {
    codes.iter().map(|c| c.to_string()).collect()
}

/// `viewer {read:doc}` <- `editor {write:doc}`; returns (viewer, editor).
async fn editor_viewer(store: &MemoryAccessStore) -> (Uuid, Uuid) {
    let viewer = store.insert_role(Role::new("viewer", None, &["read:doc"])).await;
    let editor = store
        .insert_role(Role::new("editor", Some(viewer), &["write:doc"]))
        .await;
    (viewer, editor)
}

#[tokio::test]
async fn super_principal_holds_every_permission() {
    let h = Harness::new();
    let root = super_principal();

    assert!(h.resolver.check_permission(&root, "anything:at_all").await.unwrap());
    assert_eq!(
        h.resolver.effective_permissions(&root).await.unwrap(),
        set(&["*"])
    );
}

#[tokio::test]
async fn editor_inherits_viewer_grants() {
    let h = Harness::new();
    let (_, editor) = editor_viewer(&h.store).await;
    let alice = principal(Some(Uuid::new_v4()), vec![editor]);
    h.store.insert_principal(alice.clone()).await;

    assert!(h.resolver.check_permission(&alice, "read:doc").await.unwrap());
    assert!(h.resolver.check_permission(&alice, "write:doc").await.unwrap());
    assert!(!h.resolver.check_permission(&alice, "delete:doc").await.unwrap());

    let cached = h.permission_cache.get(alice.id).await.unwrap();
    assert_eq!(cached, Some(set(&["read:doc", "write:doc"])));
}

#[tokio::test]
async fn cyclic_hierarchy_terminates_with_full_union() {
    let h = Harness::new();
    let mut a = Role::new("a", None, &["a:perm"]);
    let b = Role::new("b", Some(a.id), &["b:perm"]);
    a.parent_role_id = Some(b.id);
    let a_id = h.store.insert_role(a).await;
    h.store.insert_role(b).await;

    let p = principal(Some(Uuid::new_v4()), vec![a_id]);
    assert_eq!(
        h.resolver.effective_permissions(&p).await.unwrap(),
        set(&["a:perm", "b:perm"])
    );
}

#[tokio::test]
async fn self_parent_and_dangling_parent_are_tolerated() {
    let h = Harness::new();
    let mut own = Role::new("own", None, &["own:perm"]);
    own.parent_role_id = Some(own.id);
    let own_id = h.store.insert_role(own).await;
    let orphan = h
        .store
        .insert_role(Role::new("orphan", Some(Uuid::new_v4()), &["orphan:perm"]))
        .await;

    let p = principal(Some(Uuid::new_v4()), vec![own_id, orphan, Uuid::new_v4()]);
    assert_eq!(
        h.resolver.effective_permissions(&p).await.unwrap(),
        set(&["orphan:perm", "own:perm"])
    );
}

#[tokio::test]
async fn no_roles_caches_an_empty_set() {
    let h = Harness::new();
    let p = principal(Some(Uuid::new_v4()), Vec::new());

    assert!(!h.resolver.check_permission(&p, "read:doc").await.unwrap());
    assert_eq!(
        h.permission_cache.get(p.id).await.unwrap(),
        Some(BTreeSet::new())
    );
}

#[tokio::test]
async fn role_order_does_not_matter() {
    let h = Harness::new();
    let (viewer, editor) = editor_viewer(&h.store).await;

    let forward = principal(Some(Uuid::new_v4()), vec![viewer, editor]);
    let backward = principal(Some(Uuid::new_v4()), vec![editor, viewer]);
    assert_eq!(
        h.resolver.effective_permissions(&forward).await.unwrap(),
        h.resolver.effective_permissions(&backward).await.unwrap()
    );
}

#[tokio::test]
async fn cache_hit_is_served_without_traversal() {
    let h = Harness::new();
    let (viewer, editor) = editor_viewer(&h.store).await;
    let alice = principal(Some(Uuid::new_v4()), vec![editor]);
    h.store.insert_principal(alice.clone()).await;

    assert!(h.resolver.check_permission(&alice, "read:doc").await.unwrap());

    // Bypass the administration path: the cached set stays authoritative.
    h.store.remove_grant(viewer, "read:doc").await.unwrap();
    assert!(h.resolver.check_permission(&alice, "read:doc").await.unwrap());
}

#[tokio::test]
async fn grant_on_ancestor_invalidates_descendant_principals() {
    let h = Harness::new();
    let (viewer, editor) = editor_viewer(&h.store).await;
    let alice = principal(Some(Uuid::new_v4()), vec![editor]);
    let bob = principal(Some(Uuid::new_v4()), vec![viewer]);
    h.store.insert_principal(alice.clone()).await;
    h.store.insert_principal(bob.clone()).await;

    assert!(!h.resolver.check_permission(&alice, "share:doc").await.unwrap());
    assert!(!h.resolver.check_permission(&bob, "share:doc").await.unwrap());

    h.admin.grant_permission(viewer, "share:doc").await.unwrap();
    assert_eq!(h.permission_cache.get(alice.id).await.unwrap(), None);
    assert_eq!(h.permission_cache.get(bob.id).await.unwrap(), None);

    assert!(h.resolver.check_permission(&alice, "share:doc").await.unwrap());
    assert!(h.resolver.check_permission(&bob, "share:doc").await.unwrap());

    h.admin.revoke_permission(viewer, "share:doc").await.unwrap();
    assert!(!h.resolver.check_permission(&alice, "share:doc").await.unwrap());
}

#[tokio::test]
async fn reparenting_invalidates_the_subtree() {
    let h = Harness::new();
    let (_, editor) = editor_viewer(&h.store).await;
    let alice = principal(Some(Uuid::new_v4()), vec![editor]);
    h.store.insert_principal(alice.clone()).await;

    assert!(h.resolver.check_permission(&alice, "read:doc").await.unwrap());

    h.admin.set_parent(editor, None).await.unwrap();
    assert!(!h.resolver.check_permission(&alice, "read:doc").await.unwrap());
    assert!(h.resolver.check_permission(&alice, "write:doc").await.unwrap());
}

#[tokio::test]
async fn assignment_changes_invalidate_the_principal() {
    let h = Harness::new();
    let (viewer, _) = editor_viewer(&h.store).await;
    let carol = principal(Some(Uuid::new_v4()), Vec::new());
    h.store.insert_principal(carol.clone()).await;

    assert!(!h.resolver.check_permission(&carol, "read:doc").await.unwrap());

    h.admin.assign_role(carol.id, viewer).await.unwrap();
    assert_eq!(h.permission_cache.get(carol.id).await.unwrap(), None);
    let carol = h.store.find_by_id(carol.id).await.unwrap().unwrap();
    assert!(h.resolver.check_permission(&carol, "read:doc").await.unwrap());

    h.admin.unassign_role(carol.id, viewer).await.unwrap();
    let carol = h.store.find_by_id(carol.id).await.unwrap().unwrap();
    assert!(!h.resolver.check_permission(&carol, "read:doc").await.unwrap());
}

#[tokio::test]
async fn concurrent_misses_leave_one_correct_set() {
    let h = Harness::new();
    let (_, editor) = editor_viewer(&h.store).await;
    let alice = principal(Some(Uuid::new_v4()), vec![editor]);

    let (read, delete) = tokio::join!(
        h.resolver.check_permission(&alice, "read:doc"),
        h.resolver.check_permission(&alice, "delete:doc"),
    );
    assert!(read.unwrap());
    assert!(!delete.unwrap());

    assert_eq!(
        h.permission_cache.get(alice.id).await.unwrap(),
        Some(set(&["read:doc", "write:doc"]))
    );
}

#[tokio::test]
async fn cache_outage_degrades_to_direct_check_without_caching() {
    let h = Harness::new();
    let (_, editor) = editor_viewer(&h.store).await;
    let alice = principal(Some(Uuid::new_v4()), vec![editor]);
    h.store.insert_principal(alice.clone()).await;

    h.flaky.set_down(true);
    assert!(h.resolver.check_permission(&alice, "read:doc").await.unwrap());
    assert!(!h.resolver.check_permission(&alice, "delete:doc").await.unwrap());

    h.flaky.set_down(false);
    assert_eq!(h.permission_cache.get(alice.id).await.unwrap(), None);
}

#[tokio::test]
async fn traversal_failure_degrades_to_direct_check() {
    let inner = MemoryAccessStore::new();
    let (_, editor) = editor_viewer(&inner).await;
    let alice = principal(Some(Uuid::new_v4()), vec![editor]);
    inner.insert_principal(alice.clone()).await;

    let store: Arc<dyn PermissionStore> = Arc::new(BrokenStore {
        inner,
        direct_fails: false,
    });
    let h = Harness::with_permission_store(store);

    assert!(h.resolver.check_permission(&alice, "read:doc").await.unwrap());
    assert!(!h.resolver.check_permission(&alice, "delete:doc").await.unwrap());
    assert_eq!(h.permission_cache.get(alice.id).await.unwrap(), None);
}

#[tokio::test]
async fn fallback_failure_is_propagated_not_guessed() {
    let inner = MemoryAccessStore::new();
    let (_, editor) = editor_viewer(&inner).await;
    let alice = principal(Some(Uuid::new_v4()), vec![editor]);

    let store: Arc<dyn PermissionStore> = Arc::new(BrokenStore {
        inner,
        direct_fails: true,
    });
    let h = Harness::with_permission_store(store);

    let err = h
        .resolver
        .check_permission(&alice, "read:doc")
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Database);
}

#[tokio::test]
async fn invalidation_failure_is_reported() {
    let h = Harness::new();
    let (viewer, _) = editor_viewer(&h.store).await;
    h.store
        .insert_principal(principal(Some(Uuid::new_v4()), vec![viewer]))
        .await;

    h.flaky.set_down(true);
    let err = h
        .admin
        .grant_permission(viewer, "share:doc")
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Cache);

    // The grant itself was applied.
    let role = h.store.role(viewer).await.unwrap();
    assert!(role.permissions.contains(&"share:doc".to_string()));
}
