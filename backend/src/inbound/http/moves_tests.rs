//! Tests for cross-vault move handlers.

use actix_web::http::StatusCode;
use actix_web::test::TestRequest;
use chrono::{TimeZone, Utc};
use rstest::rstest;
use serde_json::json;

use super::*;
use crate::domain::ports::MoveAssetResponse;
use crate::domain::{Asset, AssetId, UserId};
use crate::inbound::http::test_utils::{MockPorts, authorized, send};

fn job(phase: MovePhase) -> MoveJob {
    let at = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).single().expect("valid time");
    MoveJob {
        id: JobId::new("job-1").expect("job id"),
        actor_id: UserId::new("alice").expect("user id"),
        source_vault_id: VaultId::new("v1").expect("vault id"),
        source_collection_id: CollectionId::new("c1").expect("collection id"),
        target_vault_id: VaultId::new("v2").expect("vault id"),
        target_collection_id: CollectionId::new("c1").expect("collection id"),
        phase,
        resume_phase: None,
        cursor: None,
        moved_assets: 2,
        renamed_assets: 0,
        error: None,
        created_at: at,
        updated_at: at,
    }
}

#[rstest]
#[actix_web::test]
async fn move_asset_requires_target_collection() {
    let ports = MockPorts::new().authenticated_as("alice");
    let (status, body) = send(
        ports,
        authorized(TestRequest::post().uri("/api/v1/vaults/v1/assets/a1/move"))
            .set_json(json!({ "targetVaultId": "v2" })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["field"], "targetCollectionId");
}

#[rstest]
#[actix_web::test]
async fn move_asset_reports_renames() {
    let mut ports = MockPorts::new().authenticated_as("alice");
    ports
        .moves
        .expect_move_asset()
        .withf(|request| {
            request.source_vault_id.as_str() == "v1"
                && request.asset_id.as_str() == "a1"
                && request.target_vault_id.as_str() == "v2"
                && request.target_collection_id.as_str() == "c9"
        })
        .returning(|request| {
            let at = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).single().expect("valid time");
            Ok(MoveAssetResponse {
                asset: Asset {
                    id: AssetId::new("a1-moved").expect("asset id"),
                    collection_id: request.target_collection_id,
                    title: "Beach".to_owned(),
                    body: None,
                    media_url: None,
                    owner_id: UserId::new("alice").expect("user id"),
                    created_at: at,
                    last_edited_at: at,
                    moved_from: None,
                },
                source_vault_id: request.source_vault_id,
                target_vault_id: request.target_vault_id,
                renamed: true,
            })
        });

    let (status, body) = send(
        ports,
        authorized(TestRequest::post().uri("/api/v1/vaults/v1/assets/a1/move"))
            .set_json(json!({ "targetVaultId": "v2", "targetCollectionId": "c9" })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["renamed"], true);
    assert_eq!(body["asset"]["collectionId"], "c9");
    assert_eq!(body["targetVaultId"], "v2");
}

#[rstest]
#[case(MovePhase::Completed, StatusCode::OK)]
#[case(MovePhase::Failed, StatusCode::ACCEPTED)]
#[actix_web::test]
async fn collection_move_status_follows_job_phase(
    #[case] phase: MovePhase,
    #[case] expected: StatusCode,
) {
    let mut ports = MockPorts::new().authenticated_as("alice");
    ports
        .moves
        .expect_move_collection()
        .times(1)
        .returning(move |_| Ok(job(phase)));

    let (status, body) = send(
        ports,
        authorized(TestRequest::post().uri("/api/v1/vaults/v1/collections/c1/move"))
            .set_json(json!({ "targetVaultId": "v2" })),
    )
    .await;

    assert_eq!(status, expected);
    assert_eq!(body["job"]["id"], "job-1");
    assert_eq!(body["job"]["movedAssets"], 2);
}

#[rstest]
#[actix_web::test]
async fn resume_addresses_the_job_under_its_source_vault() {
    let mut ports = MockPorts::new().authenticated_as("alice");
    ports
        .moves
        .expect_resume_move()
        .withf(|request| request.vault_id.as_str() == "v1" && request.job_id.as_str() == "job-1")
        .returning(|_| Ok(job(MovePhase::Completed)));

    let (status, body) = send(
        ports,
        authorized(TestRequest::post().uri("/api/v1/vaults/v1/move-jobs/job-1/resume")),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["job"]["phase"], "completed");
}

#[rstest]
#[actix_web::test]
async fn move_job_lookup_is_read_only() {
    let mut ports = MockPorts::new().authenticated_as("alice");
    ports
        .moves
        .expect_move_job()
        .returning(|_| Ok(job(MovePhase::MigratingAssets)));

    let (status, body) = send(
        ports,
        authorized(TestRequest::get().uri("/api/v1/vaults/v1/move-jobs/job-1")),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["job"]["phase"], "migratingAssets");
}
