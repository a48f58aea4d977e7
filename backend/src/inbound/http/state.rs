//! Shared HTTP adapter state.
//!
//! HTTP handlers accept this state via `actix_web::web::Data` so they only
//! depend on domain ports (use-cases) and remain testable without I/O.

use std::sync::Arc;

use crate::domain::ports::{
    AccountCommand, BillingCommand, IdentityVerifier, InvitationCommand, MembershipCommand,
    MoveCommand, ResourceCommand, ResourceQuery, VaultCommand, VaultQuery,
};
use crate::inbound::http::rate_limit::RateLimiter;

/// Parameter object bundling the use-case ports handlers call.
#[derive(Clone)]
pub struct HttpStatePorts {
    pub vaults: Arc<dyn VaultCommand>,
    pub vaults_query: Arc<dyn VaultQuery>,
    pub resources: Arc<dyn ResourceCommand>,
    pub resources_query: Arc<dyn ResourceQuery>,
    pub moves: Arc<dyn MoveCommand>,
    pub invitations: Arc<dyn InvitationCommand>,
    pub members: Arc<dyn MembershipCommand>,
    pub account: Arc<dyn AccountCommand>,
    pub billing: Arc<dyn BillingCommand>,
}

/// Dependency bundle for HTTP handlers.
#[derive(Clone)]
pub struct HttpState {
    pub vaults: Arc<dyn VaultCommand>,
    pub vaults_query: Arc<dyn VaultQuery>,
    pub resources: Arc<dyn ResourceCommand>,
    pub resources_query: Arc<dyn ResourceQuery>,
    pub moves: Arc<dyn MoveCommand>,
    pub invitations: Arc<dyn InvitationCommand>,
    pub members: Arc<dyn MembershipCommand>,
    pub account: Arc<dyn AccountCommand>,
    pub billing: Arc<dyn BillingCommand>,
    pub identity: Arc<dyn IdentityVerifier>,
    pub rate_limiter: Arc<RateLimiter>,
}

impl HttpState {
    /// Construct state from the use-case ports, the identity verifier that
    /// authenticates bearer tokens, and the edge rate limiter.
    pub fn new(
        ports: HttpStatePorts,
        identity: Arc<dyn IdentityVerifier>,
        rate_limiter: Arc<RateLimiter>,
    ) -> Self {
        let HttpStatePorts {
            vaults,
            vaults_query,
            resources,
            resources_query,
            moves,
            invitations,
            members,
            account,
            billing,
        } = ports;
        Self {
            vaults,
            vaults_query,
            resources,
            resources_query,
            moves,
            invitations,
            members,
            account,
            billing,
            identity,
            rate_limiter,
        }
    }
}
