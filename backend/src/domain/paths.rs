//! Document layout.
//!
//! ```text
//! vaults/{v}                              vault record (ownerId)
//! vaults/{v}/members/{uid}                memberships
//! vaults/{v}/grants/{scope}:{id}:{uid}    scoped permission grants
//! vaults/{v}/collections/{c}              collections
//! vaults/{v}/assets/{a}                   assets (carry collectionId)
//! vaults/{v}/usage/counters               cached usage counters
//! vaults/{v}/dailyQuota/{YYYY-MM-DD}      daily rate quota counters
//! vaults/{v}/auditEvents/{e}              vault audit log
//! vaults/{v}/invitations/{code}           invitations
//! vaults/{v}/moveJobs/{j}                 collection move jobs
//! users/{uid}                             profile
//! users/{uid}/settings/notifications      notification preferences
//! users/{uid}/auditEvents/{e}             account audit log
//! subscriptions/{uid}                     per-user subscription
//! vaultSubscriptions/{v}                  legacy per-vault subscription
//! emailEvents/{sha256(dedupeKey)}         notification dedupe records
//! deletionJobs/{j}                        account deletion jobs
//! ```

use chrono::NaiveDate;

use super::ports::{CollectionPath, DocPath};
use super::vault::quota_day_key;
use super::{AssetId, CollectionId, GrantScope, InvitationCode, JobId, UserId, VaultId};

pub const VAULTS: &str = "vaults";
pub const MEMBERS: &str = "members";
pub const GRANTS: &str = "grants";
pub const COLLECTIONS: &str = "collections";
pub const ASSETS: &str = "assets";
pub const USAGE: &str = "usage";
pub const DAILY_QUOTA: &str = "dailyQuota";
pub const AUDIT_EVENTS: &str = "auditEvents";
pub const INVITATIONS: &str = "invitations";
pub const MOVE_JOBS: &str = "moveJobs";
pub const USERS: &str = "users";
pub const SETTINGS: &str = "settings";
pub const SUBSCRIPTIONS: &str = "subscriptions";
pub const VAULT_SUBSCRIPTIONS: &str = "vaultSubscriptions";
pub const EMAIL_EVENTS: &str = "emailEvents";
pub const DELETION_JOBS: &str = "deletionJobs";

/// Vault subcollections in teardown order; memberships go last.
pub const VAULT_TEARDOWN_ORDER: [&str; 9] = [
    ASSETS,
    COLLECTIONS,
    GRANTS,
    INVITATIONS,
    MOVE_JOBS,
    AUDIT_EVENTS,
    DAILY_QUOTA,
    USAGE,
    MEMBERS,
];

pub fn vaults() -> CollectionPath {
    CollectionPath::root(VAULTS)
}

pub fn vault(vault_id: &VaultId) -> DocPath {
    vaults().doc(vault_id.as_str())
}

pub fn vault_child(vault_id: &VaultId, name: &str) -> CollectionPath {
    vault(vault_id).collection(name)
}

/// Vault owning a document nested under `vaults/{v}/...`.
pub fn vault_id_of(path: &DocPath) -> Option<VaultId> {
    let mut segments = path.as_str().split('/');
    match (segments.next(), segments.next()) {
        (Some(VAULTS), Some(id)) => VaultId::new(id).ok(),
        _ => None,
    }
}

pub fn members(vault_id: &VaultId) -> CollectionPath {
    vault_child(vault_id, MEMBERS)
}

pub fn member(vault_id: &VaultId, user_id: &UserId) -> DocPath {
    members(vault_id).doc(user_id.as_str())
}

pub fn grants(vault_id: &VaultId) -> CollectionPath {
    vault_child(vault_id, GRANTS)
}

/// Id prefix shared by every grant on one resource.
pub fn grant_prefix(scope: GrantScope, scope_id: &str) -> String {
    format!("{}:{scope_id}:", scope.as_str())
}

pub fn grant(vault_id: &VaultId, scope: GrantScope, scope_id: &str, user_id: &UserId) -> DocPath {
    grants(vault_id).doc(&format!("{}{user_id}", grant_prefix(scope, scope_id)))
}

pub fn collections(vault_id: &VaultId) -> CollectionPath {
    vault_child(vault_id, COLLECTIONS)
}

pub fn collection(vault_id: &VaultId, collection_id: &CollectionId) -> DocPath {
    collections(vault_id).doc(collection_id.as_str())
}

pub fn assets(vault_id: &VaultId) -> CollectionPath {
    vault_child(vault_id, ASSETS)
}

pub fn asset(vault_id: &VaultId, asset_id: &AssetId) -> DocPath {
    assets(vault_id).doc(asset_id.as_str())
}

pub fn counters(vault_id: &VaultId) -> DocPath {
    vault_child(vault_id, USAGE).doc("counters")
}

pub fn daily_quota(vault_id: &VaultId, date: NaiveDate) -> DocPath {
    vault_child(vault_id, DAILY_QUOTA).doc(&quota_day_key(date))
}

pub fn vault_audit_events(vault_id: &VaultId) -> CollectionPath {
    vault_child(vault_id, AUDIT_EVENTS)
}

pub fn invitations(vault_id: &VaultId) -> CollectionPath {
    vault_child(vault_id, INVITATIONS)
}

pub fn invitation(code: &InvitationCode) -> DocPath {
    invitations(code.vault_id()).doc(code.as_str())
}

pub fn move_job(vault_id: &VaultId, job_id: &JobId) -> DocPath {
    vault_child(vault_id, MOVE_JOBS).doc(job_id.as_str())
}

pub fn user(user_id: &UserId) -> DocPath {
    CollectionPath::root(USERS).doc(user_id.as_str())
}

pub fn notification_settings(user_id: &UserId) -> DocPath {
    user(user_id).collection(SETTINGS).doc("notifications")
}

pub fn user_settings(user_id: &UserId) -> CollectionPath {
    user(user_id).collection(SETTINGS)
}

pub fn user_audit_events(user_id: &UserId) -> CollectionPath {
    user(user_id).collection(AUDIT_EVENTS)
}

pub fn subscription(user_id: &UserId) -> DocPath {
    CollectionPath::root(SUBSCRIPTIONS).doc(user_id.as_str())
}

pub fn vault_subscription(vault_id: &VaultId) -> DocPath {
    CollectionPath::root(VAULT_SUBSCRIPTIONS).doc(vault_id.as_str())
}

pub fn email_events() -> CollectionPath {
    CollectionPath::root(EMAIL_EVENTS)
}

pub fn deletion_jobs() -> CollectionPath {
    CollectionPath::root(DELETION_JOBS)
}

pub fn deletion_job(job_id: &JobId) -> DocPath {
    deletion_jobs().doc(job_id.as_str())
}
