//! Domain ports and supporting types for the hexagonal boundary.
//!
//! Driven ports (store, identity, email, receipts, caches, queues) describe
//! what the domain needs from adapters. Driving ports describe the use cases
//! the inbound HTTP layer calls.

mod macros;
pub(crate) use macros::define_port_error;

mod account_command;
mod billing_command;
mod dedupe_cache;
mod deletion_job_queue;
mod document_store;
mod email_sender;
mod identity;
mod invitation_command;
mod membership_command;
mod move_command;
mod receipt_verifier;
mod resource_command;
mod vault_command;

#[cfg(test)]
pub use account_command::MockAccountCommand;
pub use account_command::AccountCommand;
#[cfg(test)]
pub use billing_command::MockBillingCommand;
pub use billing_command::{BillingCommand, SubmitReceiptRequest, SubmitReceiptResponse};
#[cfg(test)]
pub use dedupe_cache::MockDedupeCache;
pub use dedupe_cache::{DedupeCache, NoopDedupeCache};
#[cfg(test)]
pub use deletion_job_queue::{MockDeletionJobHandler, MockDeletionJobQueue};
pub use deletion_job_queue::{DeletionJobHandler, DeletionJobQueue, JobDispatchError};
pub use document_store::{
    CollectionPath, DocPath, Document, DocumentStore, FieldFilter, MAX_WRITE_GROUP_SIZE, Query,
    QueryScope, StoreError, TxOutcome, TxPlan, TxSnapshot, WriteOp, decode_value, encode_value,
    merge_shallow, patch, run_transaction,
};
#[cfg(test)]
pub use email_sender::MockEmailSender;
pub use email_sender::{DisabledEmailSender, EmailDelivery, EmailError, EmailSender, OutboundEmail};
#[cfg(test)]
pub use identity::{MockIdentityDirectory, MockIdentityVerifier};
pub use identity::{FixtureIdentityDirectory, IdentityDirectory, IdentityError, IdentityVerifier};
#[cfg(test)]
pub use invitation_command::MockInvitationCommand;
pub use invitation_command::{
    AcceptInvitationRequest, AcceptInvitationResponse, CreateInvitationRequest,
    CreateInvitationResponse, InvitationCommand, InvitationRequest, ListInvitationsRequest,
};
#[cfg(test)]
pub use membership_command::MockMembershipCommand;
pub use membership_command::{
    GrantRequest, MemberRequest, MembershipCommand, UpdatePermissionsRequest, UpsertGrantRequest,
};
#[cfg(test)]
pub use move_command::MockMoveCommand;
pub use move_command::{
    MoveAssetRequest, MoveAssetResponse, MoveCollectionRequest, MoveCommand, MoveJobRequest,
};
#[cfg(test)]
pub use receipt_verifier::MockReceiptVerifier;
pub use receipt_verifier::{
    DisabledReceiptVerifier, ReceiptError, ReceiptVerification, ReceiptVerifier,
};
#[cfg(test)]
pub use resource_command::{MockResourceCommand, MockResourceQuery};
pub use resource_command::{
    CreateAssetRequest, CreateCollectionRequest, DeleteAssetRequest, DeleteAssetResponse,
    DeleteCollectionRequest, DeleteCollectionResponse, GetAssetRequest, ListAssetsRequest,
    ListCollectionsRequest, ResourceCommand, ResourceQuery,
};
#[cfg(test)]
pub use vault_command::{MockVaultCommand, MockVaultQuery};
pub use vault_command::{
    CreateVaultRequest, DeleteVaultResponse, LimitsView, TransferOwnershipRequest, VaultCommand,
    VaultDetails, VaultListing, VaultQuery, VaultRequest,
};
