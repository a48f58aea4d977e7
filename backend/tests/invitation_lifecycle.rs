//! Invitation create, accept, expiry and revocation.

mod common;

use rstest::rstest;

use vault_backend::domain::ports::{
    AcceptInvitationRequest, CreateInvitationRequest, DocumentStore, InvitationCommand,
    InvitationRequest,
};
use vault_backend::domain::{
    Caller, ErrorCode, INVITATION_TTL_DAYS, Invitation, InvitationStatus, PermissionFlags, Role,
    VaultId, paths,
};
use vault_backend::test_support::{TestHarness, caller};

use common::{create_vault, subscribe_premium, usage};

fn invite(owner: &Caller, vault_id: &VaultId, email: &str) -> CreateInvitationRequest {
    CreateInvitationRequest {
        caller: owner.clone(),
        vault_id: vault_id.clone(),
        email: email.to_owned(),
        permissions: None,
    }
}

#[rstest]
#[tokio::test]
async fn basic_owners_must_upgrade_before_inviting() {
    let harness = TestHarness::new();
    let owner = caller("owner");
    let vault = create_vault(&harness, &owner, "Family").await;

    let error = harness
        .invitations()
        .create_invitation(invite(&owner, &vault.id, "friend@example.com"))
        .await
        .expect_err("BASIC plans cannot delegate");

    assert_eq!(error.code(), ErrorCode::PaymentRequired);
    assert!(harness.email.sent().is_empty());
}

#[rstest]
#[tokio::test]
async fn owners_cannot_invite_themselves() {
    let harness = TestHarness::new();
    let owner = caller("owner");
    subscribe_premium(&harness, &owner).await;
    let vault = create_vault(&harness, &owner, "Family").await;

    let error = harness
        .invitations()
        .create_invitation(invite(&owner, &vault.id, "OWNER@example.com"))
        .await
        .expect_err("self invitation rejected");

    assert_eq!(error.code(), ErrorCode::InvalidRequest);
}

#[rstest]
#[tokio::test]
async fn accepted_invitation_creates_one_membership() {
    let harness = TestHarness::new();
    let owner = caller("owner");
    let friend = caller("friend");
    subscribe_premium(&harness, &owner).await;
    let vault = create_vault(&harness, &owner, "Family").await;

    let created = harness
        .invitations()
        .create_invitation(invite(&owner, &vault.id, "friend@example.com"))
        .await
        .expect("invitation created");
    assert!(created.email_sent);
    assert_eq!(created.invitation.status, InvitationStatus::Pending);
    assert_eq!(created.invitation.permissions, PermissionFlags::VIEW_ONLY);
    assert_eq!(
        created.invitation.expires_at - created.invitation.created_at,
        chrono::TimeDelta::days(INVITATION_TTL_DAYS)
    );
    assert!(
        harness
            .email
            .sent()
            .iter()
            .any(|email| email.to == "friend@example.com")
    );

    let accept = || AcceptInvitationRequest {
        caller: friend.clone(),
        code: created.invitation.code.clone(),
    };
    let first = harness
        .invitations()
        .accept_invitation(accept())
        .await
        .expect("first accept");
    let again = harness
        .invitations()
        .accept_invitation(accept())
        .await
        .expect("repeat accept is idempotent");

    assert!(!first.already_member);
    assert_eq!(first.membership.role, Role::Delegate);
    assert!(again.already_member);
    assert_eq!(usage(&harness, &owner, &vault).await.delegates_count, 1);
}

#[rstest]
#[tokio::test]
async fn invitations_are_bound_to_the_invited_address() {
    let harness = TestHarness::new();
    let owner = caller("owner");
    subscribe_premium(&harness, &owner).await;
    let vault = create_vault(&harness, &owner, "Family").await;
    let created = harness
        .invitations()
        .create_invitation(invite(&owner, &vault.id, "friend@example.com"))
        .await
        .expect("invitation created");

    let error = harness
        .invitations()
        .accept_invitation(AcceptInvitationRequest {
            caller: caller("intruder"),
            code: created.invitation.code,
        })
        .await
        .expect_err("wrong recipient");

    assert_eq!(error.code(), ErrorCode::Forbidden);
    assert_eq!(usage(&harness, &owner, &vault).await.delegates_count, 0);
}

#[rstest]
#[tokio::test]
async fn lapsed_invitations_expire_on_accept() {
    let harness = TestHarness::new();
    let owner = caller("owner");
    subscribe_premium(&harness, &owner).await;
    let vault = create_vault(&harness, &owner, "Family").await;
    let created = harness
        .invitations()
        .create_invitation(invite(&owner, &vault.id, "friend@example.com"))
        .await
        .expect("invitation created");

    harness.clock.advance_days(INVITATION_TTL_DAYS + 1);
    let error = harness
        .invitations()
        .accept_invitation(AcceptInvitationRequest {
            caller: caller("friend"),
            code: created.invitation.code.clone(),
        })
        .await
        .expect_err("invitation lapsed");

    assert_eq!(error.code(), ErrorCode::Gone);
    let stored: Invitation = harness
        .store
        .get(&paths::invitation(&created.invitation.code))
        .await
        .expect("store reachable")
        .expect("invitation kept")
        .decode()
        .expect("invitation decodes");
    assert_eq!(stored.status, InvitationStatus::Expired);
}

#[rstest]
#[tokio::test]
async fn accepted_invitations_cannot_be_revoked() {
    let harness = TestHarness::new();
    let owner = caller("owner");
    subscribe_premium(&harness, &owner).await;
    let vault = create_vault(&harness, &owner, "Family").await;
    let pending = harness
        .invitations()
        .create_invitation(invite(&owner, &vault.id, "pending@example.com"))
        .await
        .expect("pending invitation");
    let used = harness
        .invitations()
        .create_invitation(invite(&owner, &vault.id, "friend@example.com"))
        .await
        .expect("used invitation");
    harness
        .invitations()
        .accept_invitation(AcceptInvitationRequest {
            caller: caller("friend"),
            code: used.invitation.code.clone(),
        })
        .await
        .expect("accepted");

    let revoked = harness
        .invitations()
        .revoke_invitation(InvitationRequest {
            caller: owner.clone(),
            code: pending.invitation.code.clone(),
        })
        .await
        .expect("pending invitation revoked");
    assert_eq!(revoked.status, InvitationStatus::Revoked);

    for code in [pending.invitation.code, used.invitation.code] {
        let error = harness
            .invitations()
            .revoke_invitation(InvitationRequest {
                caller: owner.clone(),
                code,
            })
            .await
            .expect_err("no longer pending");
        assert_eq!(error.code(), ErrorCode::Conflict);
    }
}
