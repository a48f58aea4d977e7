//! Tests for vault lifecycle handlers.

use std::time::Duration;

use actix_web::http::StatusCode;
use actix_web::test::TestRequest;
use chrono::{TimeZone, Utc};
use mockall::predicate::eq;
use rstest::rstest;
use serde_json::json;

use super::*;
use crate::domain::ports::DeleteVaultResponse;
use crate::domain::{ErrorCode, Vault};
use crate::inbound::http::rate_limit::{RateLimiter, RateRule};
use crate::inbound::http::test_utils::{MockPorts, authorized, caller, send};

fn vault(id: &str, owner: &str) -> Vault {
    let at = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).single().expect("valid time");
    Vault {
        id: VaultId::new(id).expect("vault id"),
        owner_id: UserId::new(owner).expect("user id"),
        name: "Family photos".to_owned(),
        created_at: at,
        updated_at: at,
    }
}

#[rstest]
#[actix_web::test]
async fn create_vault_returns_created_envelope() {
    let mut ports = MockPorts::new().authenticated_as("alice");
    ports
        .vaults
        .expect_create_vault()
        .withf(|request| request.caller == caller("alice") && request.name == "Family photos")
        .times(1)
        .returning(|_| Ok(vault("v1", "alice")));

    let (status, body) = send(
        ports,
        authorized(TestRequest::post().uri("/api/v1/vaults"))
            .set_json(json!({ "name": "Family photos" })),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["ok"], true);
    assert_eq!(body["vault"]["id"], "v1");
    assert_eq!(body["vault"]["ownerId"], "alice");
}

#[rstest]
#[actix_web::test]
async fn create_vault_requires_a_name() {
    let ports = MockPorts::new().authenticated_as("alice");
    let (status, body) = send(
        ports,
        authorized(TestRequest::post().uri("/api/v1/vaults")).set_json(json!({})),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "invalid_request");
    assert_eq!(body["field"], "name");
    assert!(body["traceId"].is_string());
}

#[rstest]
#[actix_web::test]
async fn requests_without_credentials_are_rejected() {
    let ports = MockPorts::new();
    let (status, body) = send(ports, TestRequest::get().uri("/api/v1/vaults")).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Missing bearer credential");
}

#[rstest]
#[actix_web::test]
async fn unknown_tokens_are_rejected() {
    let ports = MockPorts::new().authenticated_as("alice");
    let (status, body) = send(
        ports,
        TestRequest::get()
            .uri("/api/v1/vaults")
            .insert_header(("Authorization", "Bearer nope")),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], ErrorCode::Unauthorized.as_str());
}

#[rstest]
#[actix_web::test]
async fn delete_vault_reports_documents_removed() {
    let mut ports = MockPorts::new().authenticated_as("alice");
    ports
        .vaults
        .expect_delete_vault()
        .withf(|request| request.vault_id.as_str() == "v1")
        .returning(|request| {
            Ok(DeleteVaultResponse {
                vault_id: request.vault_id,
                documents_deleted: 42,
            })
        });

    let (status, body) = send(
        ports,
        authorized(TestRequest::post().uri("/api/v1/vaults/v1/delete")),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "ok": true, "vaultId": "v1", "documentsDeleted": 42 }));
}

#[rstest]
#[actix_web::test]
async fn non_owner_delete_surfaces_forbidden() {
    let mut ports = MockPorts::new().authenticated_as("bob");
    ports
        .vaults
        .expect_delete_vault()
        .returning(|_| Err(Error::forbidden("Only the vault owner can delete the vault")));

    let (status, body) = send(
        ports,
        authorized(TestRequest::post().uri("/api/v1/vaults/v1/delete")),
    )
    .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "Only the vault owner can delete the vault");
}

#[rstest]
#[actix_web::test]
async fn vault_deletes_are_rate_limited() {
    let mut ports = MockPorts::new().authenticated_as("alice");
    ports.rate_limiter = RateLimiter::new([(
        RateClass::VaultDelete,
        RateRule::new(1, Duration::from_secs(3600)),
    )]);
    ports.vaults.expect_delete_vault().times(1).returning(|request| {
        Ok(DeleteVaultResponse {
            vault_id: request.vault_id,
            documents_deleted: 0,
        })
    });

    let app = actix_web::test::init_service(
        actix_web::App::new()
            .app_data(web::Data::new(ports.into_state()))
            .service(web::scope("/api/v1").configure(crate::inbound::http::configure_api)),
    )
    .await;
    let first = actix_web::test::call_service(
        &app,
        authorized(TestRequest::post().uri("/api/v1/vaults/v1/delete")).to_request(),
    )
    .await;
    assert_eq!(first.status(), StatusCode::OK);

    let second = actix_web::test::call_service(
        &app,
        authorized(TestRequest::post().uri("/api/v1/vaults/v2/delete")).to_request(),
    )
    .await;
    assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(
        second
            .headers()
            .get(actix_web::http::header::RETRY_AFTER)
            .and_then(|value| value.to_str().ok()),
        Some("3600")
    );
}

#[rstest]
#[actix_web::test]
async fn transfer_ownership_validates_the_new_owner() {
    let ports = MockPorts::new().authenticated_as("alice");
    let (status, body) = send(
        ports,
        authorized(TestRequest::post().uri("/api/v1/vaults/v1/transfer-ownership"))
            .set_json(json!({ "newOwnerId": "bad/id" })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["field"], "newOwnerId");
}

#[rstest]
#[actix_web::test]
async fn transfer_ownership_passes_ids_through() {
    let mut ports = MockPorts::new().authenticated_as("alice");
    ports
        .vaults
        .expect_transfer_ownership()
        .with(eq(TransferOwnershipRequest {
            caller: caller("alice"),
            vault_id: VaultId::new("v1").expect("vault id"),
            new_owner_id: UserId::new("bob").expect("user id"),
        }))
        .returning(|_| Ok(vault("v1", "bob")));

    let (status, body) = send(
        ports,
        authorized(TestRequest::post().uri("/api/v1/vaults/v1/transfer-ownership"))
            .set_json(json!({ "newOwnerId": "bob" })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["vault"]["ownerId"], "bob");
}
