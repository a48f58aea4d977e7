//! Tests for membership and grant handlers.

use actix_web::http::StatusCode;
use actix_web::test::TestRequest;
use chrono::{TimeZone, Utc};
use mockall::predicate::eq;
use rstest::rstest;
use serde_json::json;

use super::*;
use crate::domain::{Membership, MembershipStatus, PermissionGrant, Role};
use crate::inbound::http::test_utils::{MockPorts, authorized, caller, send};

fn delegate(user_id: &str, permissions: PermissionFlags) -> Membership {
    let at = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).single().expect("valid time");
    Membership {
        user_id: UserId::new(user_id).expect("user id"),
        role: Role::Delegate,
        status: MembershipStatus::Active,
        permissions,
        email: None,
        joined_at: at,
        updated_at: at,
    }
}

#[rstest]
#[actix_web::test]
async fn list_members_wraps_results() {
    let mut ports = MockPorts::new().authenticated_as("alice");
    ports
        .members
        .expect_list_members()
        .withf(|who, vault_id| *who == caller("alice") && vault_id.as_str() == "v1")
        .returning(|_, _| Ok(vec![delegate("bob", PermissionFlags::VIEW_ONLY)]));

    let (status, body) = send(
        ports,
        authorized(TestRequest::get().uri("/api/v1/vaults/v1/members")),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["members"][0]["role"], "DELEGATE");
}

#[rstest]
#[actix_web::test]
async fn update_permissions_sends_flags() {
    let flags = PermissionFlags {
        view: true,
        create: true,
        delete: false,
    };
    let mut ports = MockPorts::new().authenticated_as("alice");
    ports
        .members
        .expect_update_permissions()
        .with(eq(UpdatePermissionsRequest {
            caller: caller("alice"),
            vault_id: VaultId::new("v1").expect("vault id"),
            user_id: UserId::new("bob").expect("user id"),
            permissions: flags,
        }))
        .returning(move |_| Ok(delegate("bob", flags)));

    let (status, body) = send(
        ports,
        authorized(TestRequest::put().uri("/api/v1/vaults/v1/members/bob/permissions"))
            .set_json(json!({ "view": true, "create": true })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["membership"]["permissions"]["create"], true);
}

#[rstest]
#[actix_web::test]
async fn owners_cannot_leave_their_vault() {
    let mut ports = MockPorts::new().authenticated_as("alice");
    ports
        .members
        .expect_remove_member()
        .returning(|_| Err(Error::forbidden("The owner cannot leave the vault")));

    let (status, _) = send(
        ports,
        authorized(TestRequest::delete().uri("/api/v1/vaults/v1/members/alice")),
    )
    .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[rstest]
#[case("collection", GrantScope::Collection)]
#[case("ASSET", GrantScope::Asset)]
#[actix_web::test]
async fn grant_scope_is_case_insensitive(#[case] raw: &'static str, #[case] scope: GrantScope) {
    let mut ports = MockPorts::new().authenticated_as("alice");
    ports
        .members
        .expect_upsert_grant()
        .withf(move |request| {
            request.grant.scope == scope
                && request.grant.scope_id == "r1"
                && request.grant.user_id.as_str() == "bob"
                && request.permissions == PermissionFlags::VIEW_ONLY
        })
        .returning(|request| {
            let at = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).single().expect("valid time");
            Ok(PermissionGrant {
                scope: request.grant.scope,
                scope_id: request.grant.scope_id,
                user_id: request.grant.user_id,
                permissions: request.permissions,
                updated_at: at,
            })
        });

    let (status, body) = send(
        ports,
        authorized(TestRequest::put().uri(&format!("/api/v1/vaults/v1/grants/{raw}/r1/bob")))
            .set_json(json!({ "view": true })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["grant"]["scopeId"], "r1");
}

#[rstest]
#[actix_web::test]
async fn unknown_grant_scope_is_rejected() {
    let ports = MockPorts::new().authenticated_as("alice");
    let (status, body) = send(
        ports,
        authorized(TestRequest::delete().uri("/api/v1/vaults/v1/grants/vault/r1/bob")),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["field"], "scope");
}

#[rstest]
#[actix_web::test]
async fn deleting_a_missing_grant_succeeds() {
    let mut ports = MockPorts::new().authenticated_as("alice");
    ports.members.expect_delete_grant().returning(|_| Ok(false));

    let (status, body) = send(
        ports,
        authorized(TestRequest::delete().uri("/api/v1/vaults/v1/grants/asset/a1/bob")),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "ok": true, "deleted": false }));
}
