//! Moving assets and collections between vaults.

mod common;

use mockable::Clock;
use rstest::rstest;

use vault_backend::domain::move_service::MOVE_PAGE_SIZE;
use vault_backend::domain::ports::{
    DocumentStore, GetAssetRequest, GrantRequest, ListAssetsRequest, MembershipCommand,
    MoveAssetRequest, MoveCollectionRequest, MoveCommand, MoveJobRequest, ResourceQuery,
    UpsertGrantRequest, encode_value,
};
use vault_backend::domain::{
    Asset, ErrorCode, GrantScope, JobId, MoveJob, MovePhase, PermissionFlags, paths,
};
use vault_backend::test_support::{TestHarness, caller};

use common::{add_delegate, create_asset, create_collection, create_vault, subscribe_premium, usage};

#[rstest]
#[tokio::test]
async fn cross_vault_asset_move_updates_both_vaults() {
    let harness = TestHarness::new();
    let owner = caller("owner");
    subscribe_premium(&harness, &owner).await;
    let source = create_vault(&harness, &owner, "Source").await;
    let target = create_vault(&harness, &owner, "Target").await;
    let from = create_collection(&harness, &owner, &source, "Inbox").await;
    let to = create_collection(&harness, &owner, &target, "Archive").await;
    let asset = create_asset(&harness, &owner, &source, &from, "Invoice").await;
    let (delegate, _) =
        add_delegate(&harness, &owner, &source, "delegate", PermissionFlags::VIEW_ONLY).await;
    let grant = GrantRequest {
        caller: owner.clone(),
        vault_id: source.id.clone(),
        user_id: delegate.user_id.clone(),
        scope: GrantScope::Asset,
        scope_id: asset.id.to_string(),
    };
    harness
        .members()
        .upsert_grant(UpsertGrantRequest {
            grant: grant.clone(),
            permissions: PermissionFlags::ALL,
        })
        .await
        .expect("asset grant stored");

    let moved = harness
        .moves()
        .move_asset(MoveAssetRequest {
            caller: owner.clone(),
            source_vault_id: source.id.clone(),
            asset_id: asset.id.clone(),
            target_vault_id: target.id.clone(),
            target_collection_id: to.id.clone(),
        })
        .await
        .expect("asset moved");

    assert!(!moved.renamed);
    assert_eq!(moved.asset.id, asset.id);
    assert_eq!(moved.asset.collection_id, to.id);
    let provenance = moved.asset.moved_from.expect("provenance recorded");
    assert_eq!(provenance.vault_id, source.id);
    assert_eq!(provenance.collection_id, from.id);
    assert_eq!(provenance.moved_by, owner.user_id);
    assert_eq!(usage(&harness, &owner, &source).await.assets_count, 0);
    assert_eq!(usage(&harness, &owner, &target).await.assets_count, 1);

    let gone = harness
        .resources()
        .get_asset(GetAssetRequest {
            caller: owner.clone(),
            vault_id: source.id.clone(),
            asset_id: asset.id.clone(),
        })
        .await
        .expect_err("asset left the source vault");
    assert_eq!(gone.code(), ErrorCode::NotFound);
    let removed = harness.members().delete_grant(grant).await.expect("grant lookup");
    assert!(!removed, "source asset grants are purged");
}

#[rstest]
#[tokio::test]
async fn collection_move_job_runs_to_completion() {
    let harness = TestHarness::new();
    let owner = caller("owner");
    let source = create_vault(&harness, &owner, "Source").await;
    let target = create_vault(&harness, &owner, "Target").await;
    let collection = create_collection(&harness, &owner, &source, "Letters").await;
    for title in ["One", "Two", "Three", "Four"] {
        create_asset(&harness, &owner, &source, &collection, title).await;
    }

    let job = harness
        .moves()
        .move_collection(MoveCollectionRequest {
            caller: owner.clone(),
            source_vault_id: source.id.clone(),
            collection_id: collection.id.clone(),
            target_vault_id: target.id.clone(),
        })
        .await
        .expect("move completes");

    assert_eq!(job.phase, MovePhase::Completed);
    assert_eq!(job.moved_assets, 4);
    assert_eq!(job.renamed_assets, 0);
    assert_eq!(job.target_collection_id, collection.id);

    let source_usage = usage(&harness, &owner, &source).await;
    let target_usage = usage(&harness, &owner, &target).await;
    assert_eq!(
        (source_usage.collections_count, source_usage.assets_count),
        (0, 0)
    );
    assert_eq!(
        (target_usage.collections_count, target_usage.assets_count),
        (1, 4)
    );

    let page = harness
        .resources()
        .list_assets(ListAssetsRequest {
            caller: owner.clone(),
            vault_id: target.id.clone(),
            collection_id: Some(job.target_collection_id.clone()),
            cursor: None,
            limit: 50,
        })
        .await
        .expect("target assets listed");
    assert_eq!(page.items.len(), 4);
    assert!(page.items.iter().all(|asset| {
        asset
            .moved_from
            .as_ref()
            .is_some_and(|from| from.vault_id == source.id)
    }));

    let resumed = harness
        .moves()
        .resume_move(MoveJobRequest {
            caller: owner.clone(),
            vault_id: source.id.clone(),
            job_id: job.id.clone(),
        })
        .await
        .expect("completed job resumes as a no-op");
    assert_eq!(resumed.phase, MovePhase::Completed);
    assert_eq!(resumed.moved_assets, 4);
}

#[rstest]
#[tokio::test]
async fn collections_cannot_move_within_one_vault() {
    let harness = TestHarness::new();
    let owner = caller("owner");
    let vault = create_vault(&harness, &owner, "Solo").await;
    let collection = create_collection(&harness, &owner, &vault, "Stay").await;

    let error = harness
        .moves()
        .move_collection(MoveCollectionRequest {
            caller: owner.clone(),
            source_vault_id: vault.id.clone(),
            collection_id: collection.id.clone(),
            target_vault_id: vault.id.clone(),
        })
        .await
        .expect_err("same-vault move rejected");

    assert_eq!(error.code(), ErrorCode::InvalidRequest);
}

#[rstest]
#[tokio::test]
async fn moves_require_ownership_of_both_vaults() {
    let harness = TestHarness::new();
    let owner = caller("owner");
    let other = caller("other");
    let source = create_vault(&harness, &owner, "Mine").await;
    let target = create_vault(&harness, &other, "Theirs").await;
    let collection = create_collection(&harness, &owner, &source, "Keep").await;

    let error = harness
        .moves()
        .move_collection(MoveCollectionRequest {
            caller: owner.clone(),
            source_vault_id: source.id.clone(),
            collection_id: collection.id.clone(),
            target_vault_id: target.id.clone(),
        })
        .await
        .expect_err("target vault belongs to someone else");

    assert_eq!(error.code(), ErrorCode::Forbidden);
    assert_eq!(usage(&harness, &owner, &source).await.collections_count, 1);
}

#[rstest]
#[tokio::test]
async fn same_vault_asset_move_records_provenance() {
    let harness = TestHarness::new();
    let owner = caller("owner");
    let vault = create_vault(&harness, &owner, "Home").await;
    let from = create_collection(&harness, &owner, &vault, "Inbox").await;
    let to = create_collection(&harness, &owner, &vault, "Filed").await;
    let asset = create_asset(&harness, &owner, &vault, &from, "Receipt").await;

    let moved = harness
        .moves()
        .move_asset(MoveAssetRequest {
            caller: owner.clone(),
            source_vault_id: vault.id.clone(),
            asset_id: asset.id.clone(),
            target_vault_id: vault.id.clone(),
            target_collection_id: to.id.clone(),
        })
        .await
        .expect("asset refiled");

    assert!(!moved.renamed);
    assert_eq!(moved.asset.id, asset.id);
    assert_eq!(moved.asset.collection_id, to.id);
    let provenance = moved.asset.moved_from.expect("provenance recorded");
    assert_eq!(provenance.vault_id, vault.id);
    assert_eq!(provenance.collection_id, from.id);
    assert_eq!(provenance.asset_id, Some(asset.id.clone()));
    assert_eq!(provenance.moved_by, owner.user_id);
    assert_eq!(usage(&harness, &owner, &vault).await.assets_count, 1);
}

#[rstest]
#[tokio::test]
async fn colliding_asset_id_is_reminted_in_the_target() {
    let harness = TestHarness::new();
    let owner = caller("owner");
    let source = create_vault(&harness, &owner, "Source").await;
    let target = create_vault(&harness, &owner, "Target").await;
    let from = create_collection(&harness, &owner, &source, "Inbox").await;
    let to = create_collection(&harness, &owner, &target, "Archive").await;
    let asset = create_asset(&harness, &owner, &source, &from, "Invoice").await;
    let occupant = Asset {
        collection_id: to.id.clone(),
        title: "Already here".to_owned(),
        ..asset.clone()
    };
    let occupied = paths::asset(&target.id, &asset.id);
    harness
        .store
        .set(&occupied, encode_value(&occupant).expect("asset encodes"), false)
        .await
        .expect("occupant stored");

    let moved = harness
        .moves()
        .move_asset(MoveAssetRequest {
            caller: owner.clone(),
            source_vault_id: source.id.clone(),
            asset_id: asset.id.clone(),
            target_vault_id: target.id.clone(),
            target_collection_id: to.id.clone(),
        })
        .await
        .expect("asset moved");

    assert!(moved.renamed);
    assert_ne!(moved.asset.id, asset.id);
    assert_eq!(moved.asset.title, "Invoice");
    let kept: Asset = harness
        .store
        .get(&occupied)
        .await
        .expect("store reachable")
        .expect("occupant kept")
        .decode()
        .expect("asset decodes");
    assert_eq!(kept.title, "Already here");
    let relocated = harness
        .store
        .get(&paths::asset(&target.id, &moved.asset.id))
        .await
        .expect("store reachable");
    assert!(relocated.is_some());
}

#[rstest]
#[tokio::test]
async fn collection_move_spans_several_pages() {
    let harness = TestHarness::with_quotas(false);
    let owner = caller("owner");
    let source = create_vault(&harness, &owner, "Source").await;
    let target = create_vault(&harness, &owner, "Target").await;
    let collection = create_collection(&harness, &owner, &source, "Scans").await;
    let total = MOVE_PAGE_SIZE * 2 + 50;
    for index in 0..total {
        create_asset(&harness, &owner, &source, &collection, &format!("Scan {index}")).await;
    }

    let job = harness
        .moves()
        .move_collection(MoveCollectionRequest {
            caller: owner.clone(),
            source_vault_id: source.id.clone(),
            collection_id: collection.id.clone(),
            target_vault_id: target.id.clone(),
        })
        .await
        .expect("move completes");

    assert_eq!(job.phase, MovePhase::Completed);
    assert_eq!(job.moved_assets, total as u64);
    let source_usage = usage(&harness, &owner, &source).await;
    let target_usage = usage(&harness, &owner, &target).await;
    assert_eq!(
        (source_usage.collections_count, source_usage.assets_count),
        (0, 0)
    );
    assert_eq!(
        (target_usage.collections_count, target_usage.assets_count),
        (1, total as u64)
    );
}

#[rstest]
#[tokio::test]
async fn failed_move_resumes_from_the_recorded_phase() {
    let harness = TestHarness::new();
    let owner = caller("owner");
    let source = create_vault(&harness, &owner, "Source").await;
    let target = create_vault(&harness, &owner, "Target").await;
    let collection = create_collection(&harness, &owner, &source, "Letters").await;
    for title in ["One", "Two", "Three"] {
        create_asset(&harness, &owner, &source, &collection, title).await;
    }
    // The destination was created before the migration step failed.
    let destination = create_collection(&harness, &owner, &target, "Letters").await;
    let now = harness.clock.utc();
    let failed = MoveJob {
        id: JobId::generate(),
        actor_id: owner.user_id.clone(),
        source_vault_id: source.id.clone(),
        source_collection_id: collection.id.clone(),
        target_vault_id: target.id.clone(),
        target_collection_id: destination.id.clone(),
        phase: MovePhase::Failed,
        resume_phase: Some(MovePhase::MigratingAssets),
        cursor: None,
        moved_assets: 5,
        renamed_assets: 0,
        error: Some("Service unavailable".to_owned()),
        created_at: now,
        updated_at: now,
    };
    harness
        .store
        .set(
            &paths::move_job(&source.id, &failed.id),
            encode_value(&failed).expect("job encodes"),
            false,
        )
        .await
        .expect("failed job stored");

    let resumed = harness
        .moves()
        .resume_move(MoveJobRequest {
            caller: owner.clone(),
            vault_id: source.id.clone(),
            job_id: failed.id.clone(),
        })
        .await
        .expect("job resumes");

    assert_eq!(resumed.phase, MovePhase::Completed);
    assert_eq!(resumed.moved_assets, 8);
    assert!(resumed.resume_phase.is_none());
    assert!(resumed.error.is_none());
    let source_usage = usage(&harness, &owner, &source).await;
    let target_usage = usage(&harness, &owner, &target).await;
    assert_eq!(
        (source_usage.collections_count, source_usage.assets_count),
        (0, 0)
    );
    assert_eq!(
        (target_usage.collections_count, target_usage.assets_count),
        (1, 3)
    );
}
