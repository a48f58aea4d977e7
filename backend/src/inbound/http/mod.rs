//! HTTP inbound adapter exposing REST endpoints.
//!
//! Handlers authenticate through [`auth::Authenticated`], charge the edge rate
//! limiter, translate JSON into driving-port requests and render the success
//! or error envelope. Business rules stay in the domain services.

pub mod account;
pub mod auth;
pub mod billing;
pub mod error;
pub mod health;
pub mod invitations;
pub mod members;
pub mod moves;
pub mod rate_limit;
pub mod resources;
pub mod response;
pub mod schemas;
pub mod state;
#[cfg(test)]
pub mod test_utils;
pub mod validation;
pub mod vaults;

use actix_web::web;

pub use error::ApiResult;
use error::payload_error;

/// Register every authenticated API route on `cfg`.
///
/// Callers mount this under `/api/v1`. Extractor failures for JSON bodies,
/// paths and queries render through the standard error envelope.
pub fn configure_api(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(|err, _| payload_error(err).into()))
        .app_data(web::PathConfig::default().error_handler(|err, _| payload_error(err).into()))
        .app_data(web::QueryConfig::default().error_handler(|err, _| payload_error(err).into()))
        .service(vaults::create_vault)
        .service(vaults::list_vaults)
        .service(vaults::describe_vault)
        .service(vaults::delete_vault)
        .service(vaults::transfer_ownership)
        .service(resources::list_collections)
        .service(resources::create_collection)
        .service(resources::delete_collection)
        .service(resources::list_assets)
        .service(resources::create_asset)
        .service(resources::get_asset)
        .service(resources::delete_asset)
        .service(moves::move_asset)
        .service(moves::move_collection)
        .service(moves::get_move_job)
        .service(moves::resume_move_job)
        .service(invitations::create_invitation)
        .service(invitations::list_invitations)
        .service(invitations::accept_invitation)
        .service(invitations::revoke_invitation)
        .service(members::list_members)
        .service(members::remove_member)
        .service(members::update_permissions)
        .service(members::upsert_grant)
        .service(members::delete_grant)
        .service(account::request_deletion)
        .service(account::deletion_job)
        .service(billing::submit_receipt)
        .service(billing::subscription);
}
