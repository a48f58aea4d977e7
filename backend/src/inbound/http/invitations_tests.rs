//! Tests for invitation handlers.

use actix_web::http::StatusCode;
use actix_web::test::TestRequest;
use chrono::{TimeZone, Utc};
use rstest::rstest;
use serde_json::json;

use super::*;
use crate::domain::ports::{AcceptInvitationResponse, CreateInvitationResponse};
use crate::domain::{Error, Invitation, Membership, UserId, VaultId};
use crate::inbound::http::test_utils::{MockPorts, authorized, caller, send};

const CODE_RAW: &str = "v1.Zk3mQ8rT2vX9bN4cL7pW1sYd";

fn invitation() -> Invitation {
    let at = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).single().expect("valid time");
    Invitation::pending(
        InvitationCode::parse(CODE_RAW).expect("code"),
        "bob@example.com".to_owned(),
        UserId::new("alice").expect("user id"),
        PermissionFlags::VIEW_ONLY,
        at,
    )
}

#[rstest]
#[actix_web::test]
async fn create_invitation_forwards_permissions() {
    let mut ports = MockPorts::new().authenticated_as("alice");
    ports
        .invitations
        .expect_create_invitation()
        .withf(|request| {
            request.email == "bob@example.com"
                && request.permissions
                    == Some(PermissionFlags {
                        view: true,
                        create: true,
                        delete: false,
                    })
        })
        .returning(|_| {
            Ok(CreateInvitationResponse {
                invitation: invitation(),
                email_sent: true,
            })
        });

    let (status, body) = send(
        ports,
        authorized(TestRequest::post().uri("/api/v1/vaults/v1/invitations")).set_json(json!({
            "email": "bob@example.com",
            "permissions": { "view": true, "create": true },
        })),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["emailSent"], true);
    assert_eq!(body["invitation"]["status"], "PENDING");
    assert_eq!(body["invitation"]["code"], CODE_RAW);
}

#[rstest]
#[actix_web::test]
async fn basic_tier_invites_need_payment() {
    let mut ports = MockPorts::new().authenticated_as("alice");
    ports.invitations.expect_create_invitation().returning(|_| {
        Err(Error::payment_required("Inviting delegates requires a paid plan")
            .with_details(json!({ "tier": "BASIC" })))
    });

    let (status, body) = send(
        ports,
        authorized(TestRequest::post().uri("/api/v1/vaults/v1/invitations"))
            .set_json(json!({ "email": "bob@example.com" })),
    )
    .await;

    assert_eq!(status, StatusCode::PAYMENT_REQUIRED);
    assert_eq!(body["tier"], "BASIC");
}

#[rstest]
#[actix_web::test]
async fn accept_rejects_malformed_codes() {
    let ports = MockPorts::new().authenticated_as("bob");
    let (status, body) = send(
        ports,
        authorized(TestRequest::post().uri("/api/v1/invitations/accept"))
            .set_json(json!({ "code": "no-separator" })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["field"], "code");
}

#[rstest]
#[actix_web::test]
async fn accept_reports_existing_membership() {
    let mut ports = MockPorts::new().authenticated_as("bob");
    ports
        .invitations
        .expect_accept_invitation()
        .withf(|request| request.caller == caller("bob") && request.code.as_str() == CODE_RAW)
        .returning(|_| {
            let at = Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).single().expect("valid time");
            Ok(AcceptInvitationResponse {
                vault_id: VaultId::new("v1").expect("vault id"),
                membership: Membership::owner(UserId::new("bob").expect("user id"), None, at),
                already_member: true,
            })
        });

    let (status, body) = send(
        ports,
        authorized(TestRequest::post().uri("/api/v1/invitations/accept"))
            .set_json(json!({ "code": CODE_RAW })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["alreadyMember"], true);
    assert_eq!(body["vaultId"], "v1");
}

#[rstest]
#[actix_web::test]
async fn expired_invitations_are_gone() {
    let mut ports = MockPorts::new().authenticated_as("bob");
    ports
        .invitations
        .expect_accept_invitation()
        .returning(|_| Err(Error::gone("Invitation has expired")));

    let (status, body) = send(
        ports,
        authorized(TestRequest::post().uri("/api/v1/invitations/accept"))
            .set_json(json!({ "code": CODE_RAW })),
    )
    .await;

    assert_eq!(status, StatusCode::GONE);
    assert_eq!(body["code"], "gone");
}

#[rstest]
#[actix_web::test]
async fn revoke_parses_code_from_path() {
    let mut ports = MockPorts::new().authenticated_as("alice");
    ports
        .invitations
        .expect_revoke_invitation()
        .withf(|request| request.code.vault_id().as_str() == "v1")
        .returning(|_| Ok(invitation()));

    let (status, body) = send(
        ports,
        authorized(TestRequest::post().uri(&format!("/api/v1/invitations/{CODE_RAW}/revoke"))),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["invitation"]["vaultId"], "v1");
}

#[rstest]
#[actix_web::test]
async fn list_invitations_wraps_results() {
    let mut ports = MockPorts::new().authenticated_as("alice");
    ports
        .invitations
        .expect_list_invitations()
        .returning(|_| Ok(vec![invitation()]));

    let (status, body) = send(
        ports,
        authorized(TestRequest::get().uri("/api/v1/vaults/v1/invitations")),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["invitations"][0]["email"], "bob@example.com");
}
