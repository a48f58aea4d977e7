//! Test helpers for inbound HTTP components.
//!
//! Handlers are exercised against mockall doubles of every driving port. A
//! port left without expectations panics when called, so each test only wires
//! the calls it expects.

use std::sync::Arc;

use actix_web::http::StatusCode;
use actix_web::http::header::AUTHORIZATION;
use actix_web::test::{self as actix_test, TestRequest};
use actix_web::{App, web};
use serde_json::Value;

use crate::Trace;
use crate::domain::ports::{
    IdentityError, MockAccountCommand, MockBillingCommand,
    MockIdentityVerifier, MockInvitationCommand, MockMembershipCommand, MockMoveCommand,
    MockResourceCommand, MockResourceQuery, MockVaultCommand, MockVaultQuery,
};
use crate::domain::{Caller, UserId};
use crate::inbound::http::configure_api;
use crate::inbound::http::rate_limit::RateLimiter;
use crate::inbound::http::state::{HttpState, HttpStatePorts};

/// Bearer token the mock identity verifier accepts.
pub(crate) const TOKEN: &str = "test-token";

pub(crate) fn caller(user_id: &str) -> Caller {
    Caller::new(
        UserId::new(user_id).expect("valid user id"),
        Some(format!("{user_id}@example.com")),
    )
}

/// Mock ports for one handler test.
pub(crate) struct MockPorts {
    pub vaults: MockVaultCommand,
    pub vaults_query: MockVaultQuery,
    pub resources: MockResourceCommand,
    pub resources_query: MockResourceQuery,
    pub moves: MockMoveCommand,
    pub invitations: MockInvitationCommand,
    pub members: MockMembershipCommand,
    pub account: MockAccountCommand,
    pub billing: MockBillingCommand,
    pub identity: MockIdentityVerifier,
    pub rate_limiter: RateLimiter,
}

impl MockPorts {
    pub(crate) fn new() -> Self {
        Self {
            vaults: MockVaultCommand::new(),
            vaults_query: MockVaultQuery::new(),
            resources: MockResourceCommand::new(),
            resources_query: MockResourceQuery::new(),
            moves: MockMoveCommand::new(),
            invitations: MockInvitationCommand::new(),
            members: MockMembershipCommand::new(),
            account: MockAccountCommand::new(),
            billing: MockBillingCommand::new(),
            identity: MockIdentityVerifier::new(),
            rate_limiter: RateLimiter::disabled(),
        }
    }

    /// Accept [`TOKEN`] as `user_id`; reject every other token.
    pub(crate) fn authenticated_as(mut self, user_id: &str) -> Self {
        let who = caller(user_id);
        self.identity.expect_verify().returning(move |token| {
            if token == TOKEN {
                Ok(who.clone())
            } else {
                Err(IdentityError::invalid_token("unknown token"))
            }
        });
        self
    }

    pub(crate) fn into_state(self) -> HttpState {
        HttpState::new(
            HttpStatePorts {
                vaults: Arc::new(self.vaults),
                vaults_query: Arc::new(self.vaults_query),
                resources: Arc::new(self.resources),
                resources_query: Arc::new(self.resources_query),
                moves: Arc::new(self.moves),
                invitations: Arc::new(self.invitations),
                members: Arc::new(self.members),
                account: Arc::new(self.account),
                billing: Arc::new(self.billing),
            },
            Arc::new(self.identity),
            Arc::new(self.rate_limiter),
        )
    }
}

/// Attach the test bearer token.
pub(crate) fn authorized(request: TestRequest) -> TestRequest {
    request.insert_header((AUTHORIZATION, format!("Bearer {TOKEN}")))
}

/// Run `request` through the API routes and decode the JSON body.
pub(crate) async fn send(ports: MockPorts, request: TestRequest) -> (StatusCode, Value) {
    let app = actix_test::init_service(
        App::new()
            .app_data(web::Data::new(ports.into_state()))
            .wrap(Trace)
            .service(web::scope("/api/v1").configure(configure_api)),
    )
    .await;
    let response = actix_test::call_service(&app, request.to_request()).await;
    let status = response.status();
    let body = actix_test::read_body(response).await;
    let value = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).expect("JSON body")
    };
    (status, value)
}
