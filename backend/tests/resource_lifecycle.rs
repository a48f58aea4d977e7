//! Resource mutations: permissions, grants, idempotent deletes and cascades.

mod common;

use rstest::rstest;

use vault_backend::domain::ports::{
    CreateAssetRequest, DeleteAssetRequest, DeleteCollectionRequest, GetAssetRequest,
    GrantRequest, MembershipCommand, ResourceCommand, ResourceQuery, UpsertGrantRequest,
};
use vault_backend::domain::purge::PURGE_PAGE_SIZE;
use vault_backend::domain::{ErrorCode, GrantScope, PermissionFlags};
use vault_backend::test_support::{TestHarness, caller};

use common::{add_delegate, create_asset, create_collection, create_vault, subscribe_premium, usage};

#[rstest]
#[tokio::test]
async fn deleting_an_asset_twice_decrements_once() {
    let harness = TestHarness::new();
    let owner = caller("owner");
    let vault = create_vault(&harness, &owner, "Photos").await;
    let collection = create_collection(&harness, &owner, &vault, "Summer").await;
    let asset = create_asset(&harness, &owner, &vault, &collection, "Beach").await;
    create_asset(&harness, &owner, &vault, &collection, "Dunes").await;
    assert_eq!(usage(&harness, &owner, &vault).await.assets_count, 2);

    let request = || DeleteAssetRequest {
        caller: owner.clone(),
        vault_id: vault.id.clone(),
        asset_id: asset.id.clone(),
    };
    let first = harness.resources().delete_asset(request()).await.expect("deleted");
    let second = harness.resources().delete_asset(request()).await.expect("no-op");

    assert!(first.deleted);
    assert!(!second.deleted);
    assert_eq!(usage(&harness, &owner, &vault).await.assets_count, 1);
}

#[rstest]
#[tokio::test]
async fn deleting_a_collection_removes_its_assets_and_grants() {
    let harness = TestHarness::new();
    let owner = caller("owner");
    subscribe_premium(&harness, &owner).await;
    let vault = create_vault(&harness, &owner, "Recipes").await;
    let doomed = create_collection(&harness, &owner, &vault, "Desserts").await;
    let kept = create_collection(&harness, &owner, &vault, "Mains").await;
    for title in ["Tart", "Mousse", "Sorbet"] {
        create_asset(&harness, &owner, &vault, &doomed, title).await;
    }
    let survivor = create_asset(&harness, &owner, &vault, &kept, "Stew").await;
    let (delegate, _) =
        add_delegate(&harness, &owner, &vault, "delegate", PermissionFlags::VIEW_ONLY).await;
    let grant = GrantRequest {
        caller: owner.clone(),
        vault_id: vault.id.clone(),
        user_id: delegate.user_id.clone(),
        scope: GrantScope::Collection,
        scope_id: doomed.id.to_string(),
    };
    harness
        .members()
        .upsert_grant(UpsertGrantRequest {
            grant: grant.clone(),
            permissions: PermissionFlags::ALL,
        })
        .await
        .expect("grant stored");

    let outcome = harness
        .resources()
        .delete_collection(DeleteCollectionRequest {
            caller: owner.clone(),
            vault_id: vault.id.clone(),
            collection_id: doomed.id.clone(),
        })
        .await
        .expect("collection deleted");

    assert!(outcome.deleted);
    assert_eq!(outcome.assets_deleted, 3);
    let counters = usage(&harness, &owner, &vault).await;
    assert_eq!(counters.assets_count, 1);
    assert_eq!(counters.collections_count, 1);
    let removed = harness.members().delete_grant(grant).await.expect("grant lookup");
    assert!(!removed, "collection grants are purged with the collection");
    harness
        .resources()
        .get_asset(GetAssetRequest {
            caller: owner.clone(),
            vault_id: vault.id.clone(),
            asset_id: survivor.id,
        })
        .await
        .expect("assets in other collections survive");
}

#[rstest]
#[tokio::test]
async fn cascade_delete_walks_every_page() {
    let harness = TestHarness::with_quotas(false);
    let owner = caller("owner");
    let vault = create_vault(&harness, &owner, "Archive").await;
    let doomed = create_collection(&harness, &owner, &vault, "Bulk").await;
    let total = PURGE_PAGE_SIZE + 50;
    for index in 0..total {
        create_asset(&harness, &owner, &vault, &doomed, &format!("Page {index}")).await;
    }

    let outcome = harness
        .resources()
        .delete_collection(DeleteCollectionRequest {
            caller: owner.clone(),
            vault_id: vault.id.clone(),
            collection_id: doomed.id.clone(),
        })
        .await
        .expect("collection deleted");

    assert!(outcome.deleted);
    assert_eq!(outcome.assets_deleted, total as u64);
    let counters = usage(&harness, &owner, &vault).await;
    assert_eq!((counters.collections_count, counters.assets_count), (0, 0));
}

#[rstest]
#[tokio::test]
async fn scoped_grants_extend_a_view_only_delegate() {
    let harness = TestHarness::new();
    let owner = caller("owner");
    subscribe_premium(&harness, &owner).await;
    let vault = create_vault(&harness, &owner, "Shared").await;
    let open = create_collection(&harness, &owner, &vault, "Open").await;
    let closed = create_collection(&harness, &owner, &vault, "Closed").await;
    let (delegate, _) =
        add_delegate(&harness, &owner, &vault, "delegate", PermissionFlags::VIEW_ONLY).await;
    harness
        .members()
        .upsert_grant(UpsertGrantRequest {
            grant: GrantRequest {
                caller: owner.clone(),
                vault_id: vault.id.clone(),
                user_id: delegate.user_id.clone(),
                scope: GrantScope::Collection,
                scope_id: open.id.to_string(),
            },
            permissions: PermissionFlags {
                view: true,
                create: true,
                delete: false,
            },
        })
        .await
        .expect("grant stored");

    let create_in = |collection_id| CreateAssetRequest {
        caller: delegate.clone(),
        vault_id: vault.id.clone(),
        collection_id,
        title: "Note".to_owned(),
        body: Some("hello".to_owned()),
        media_url: None,
    };
    harness
        .resources()
        .create_asset(create_in(open.id.clone()))
        .await
        .expect("grant allows create");
    let denied = harness
        .resources()
        .create_asset(create_in(closed.id.clone()))
        .await
        .expect_err("baseline is view-only");

    assert_eq!(denied.code(), ErrorCode::Forbidden);
    assert_eq!(denied.message(), "Create permission required");
}

#[rstest]
#[tokio::test]
async fn outsiders_cannot_read_a_vault() {
    let harness = TestHarness::new();
    let owner = caller("owner");
    let vault = create_vault(&harness, &owner, "Private").await;
    let collection = create_collection(&harness, &owner, &vault, "Docs").await;
    let asset = create_asset(&harness, &owner, &vault, &collection, "Passport").await;

    let denied = harness
        .resources()
        .get_asset(GetAssetRequest {
            caller: caller("stranger"),
            vault_id: vault.id.clone(),
            asset_id: asset.id,
        })
        .await
        .expect_err("not a member");

    assert_eq!(denied.code(), ErrorCode::Forbidden);
    assert_eq!(denied.message(), "not a member");
}
