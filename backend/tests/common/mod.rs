//! Shared setup for the service-level integration tests.
#![allow(dead_code, reason = "each test crate uses a different subset")]

use vault_backend::domain::ports::{
    AcceptInvitationRequest, BillingCommand, CreateAssetRequest, CreateCollectionRequest,
    CreateInvitationRequest, CreateVaultRequest, InvitationCommand, ReceiptVerification,
    ResourceCommand, SubmitReceiptRequest, VaultCommand, VaultQuery, VaultRequest,
};
use vault_backend::domain::{
    Asset, Caller, Collection, Membership, PermissionFlags, SubscriptionStatus, UsageCounters,
    Vault,
};
use vault_backend::test_support::{TestHarness, caller};

pub const PREMIUM_RECEIPT: &str = "receipt-premium";
pub const LAPSED_RECEIPT: &str = "receipt-lapsed";

/// Register the receipts used by these tests.
pub fn register_receipts(harness: &TestHarness) {
    harness.receipts.register(
        PREMIUM_RECEIPT,
        ReceiptVerification {
            status: SubscriptionStatus::Active,
            product_id: "app.vault.premium.monthly".to_owned(),
            expires_at: None,
            transaction_id: "txn-premium".to_owned(),
        },
    );
    harness.receipts.register(
        LAPSED_RECEIPT,
        ReceiptVerification {
            status: SubscriptionStatus::Canceled,
            product_id: "app.vault.premium.monthly".to_owned(),
            expires_at: None,
            transaction_id: "txn-lapsed".to_owned(),
        },
    );
}

/// Give `owner` an active PREMIUM subscription.
pub async fn subscribe_premium(harness: &TestHarness, owner: &Caller) {
    register_receipts(harness);
    harness
        .billing()
        .submit_receipt(SubmitReceiptRequest {
            caller: owner.clone(),
            receipt: PREMIUM_RECEIPT.to_owned(),
        })
        .await
        .expect("premium receipt accepted");
}

pub async fn create_vault(harness: &TestHarness, owner: &Caller, name: &str) -> Vault {
    harness
        .vaults()
        .create_vault(CreateVaultRequest {
            caller: owner.clone(),
            name: name.to_owned(),
        })
        .await
        .expect("vault created")
}

pub async fn create_collection(
    harness: &TestHarness,
    owner: &Caller,
    vault: &Vault,
    name: &str,
) -> Collection {
    harness
        .resources()
        .create_collection(CreateCollectionRequest {
            caller: owner.clone(),
            vault_id: vault.id.clone(),
            name: name.to_owned(),
            description: None,
        })
        .await
        .expect("collection created")
}

pub async fn create_asset(
    harness: &TestHarness,
    owner: &Caller,
    vault: &Vault,
    collection: &Collection,
    title: &str,
) -> Asset {
    harness
        .resources()
        .create_asset(CreateAssetRequest {
            caller: owner.clone(),
            vault_id: vault.id.clone(),
            collection_id: collection.id.clone(),
            title: title.to_owned(),
            body: None,
            media_url: None,
        })
        .await
        .expect("asset created")
}

/// Invite and accept `user_id` into `vault`; the owner must be on a paid plan.
pub async fn add_delegate(
    harness: &TestHarness,
    owner: &Caller,
    vault: &Vault,
    user_id: &str,
    permissions: PermissionFlags,
) -> (Caller, Membership) {
    let delegate = caller(user_id);
    let created = harness
        .invitations()
        .create_invitation(CreateInvitationRequest {
            caller: owner.clone(),
            vault_id: vault.id.clone(),
            email: delegate.email.clone().expect("test callers carry an email"),
            permissions: Some(permissions),
        })
        .await
        .expect("invitation created");
    let accepted = harness
        .invitations()
        .accept_invitation(AcceptInvitationRequest {
            caller: delegate.clone(),
            code: created.invitation.code,
        })
        .await
        .expect("invitation accepted");
    (delegate, accepted.membership)
}

pub async fn usage(harness: &TestHarness, owner: &Caller, vault: &Vault) -> UsageCounters {
    harness
        .vaults()
        .describe_vault(VaultRequest {
            caller: owner.clone(),
            vault_id: vault.id.clone(),
        })
        .await
        .expect("vault described")
        .usage
}
