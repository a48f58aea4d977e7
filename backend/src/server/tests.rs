//! Tests for the server bootstrap, covering readiness signalling and route
//! mounting.

use std::net::SocketAddr;
use std::sync::Arc;

use actix_web::http::StatusCode;
use actix_web::{test, web};
use rstest::{fixture, rstest};

use vault_backend::inbound::http::health::HealthState;
use vault_backend::inbound::http::rate_limit::RateLimiter;
use vault_backend::inbound::http::state::{HttpState, HttpStatePorts};
use vault_backend::outbound::http::DevTokenVerifier;
use vault_backend::test_support::TestHarness;

use super::{build_app, create_server};

#[fixture]
fn health_state() -> web::Data<HealthState> {
    web::Data::new(HealthState::new())
}

#[fixture]
fn http_state() -> web::Data<HttpState> {
    let harness = TestHarness::new();
    let ports: HttpStatePorts = harness.ports();
    web::Data::new(HttpState::new(
        ports,
        Arc::new(DevTokenVerifier),
        Arc::new(RateLimiter::disabled()),
    ))
}

#[fixture]
fn bind_address() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 0))
}

#[rstest]
#[actix_rt::test]
async fn create_server_marks_ready(
    health_state: web::Data<HealthState>,
    http_state: web::Data<HttpState>,
    bind_address: SocketAddr,
) {
    assert!(!health_state.is_ready(), "state should start unready");

    let server = create_server(health_state.clone(), http_state, bind_address)
        .expect("server should bind to an ephemeral port");

    assert!(health_state.is_ready(), "server creation marks readiness");
    let handle = server.handle();
    actix_rt::spawn(server);
    handle.stop(false).await;
}

#[rstest]
#[actix_rt::test]
async fn api_routes_require_a_bearer_token(
    health_state: web::Data<HealthState>,
    http_state: web::Data<HttpState>,
) {
    let app = test::init_service(build_app(health_state, http_state)).await;

    let res = test::call_service(&app, test::TestRequest::get().uri("/api/v1/vaults").to_request()).await;

    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[rstest]
#[actix_rt::test]
async fn dev_token_callers_can_create_and_list_vaults(
    health_state: web::Data<HealthState>,
    http_state: web::Data<HttpState>,
) {
    let app = test::init_service(build_app(health_state, http_state)).await;

    let create = test::TestRequest::post()
        .uri("/api/v1/vaults")
        .insert_header(("Authorization", "Bearer dev:alice:alice@example.com"))
        .set_json(serde_json::json!({ "name": "Recipes" }))
        .to_request();
    let res = test::call_service(&app, create).await;
    assert_eq!(res.status(), StatusCode::CREATED);

    let list = test::TestRequest::get()
        .uri("/api/v1/vaults")
        .insert_header(("Authorization", "Bearer dev:alice"))
        .to_request();
    let body: serde_json::Value = test::call_and_read_body_json(&app, list).await;
    assert_eq!(body["vaults"].as_array().map(Vec::len), Some(1));
}

#[rstest]
#[actix_rt::test]
async fn probes_are_served_outside_the_api_scope(health_state: web::Data<HealthState>, http_state: web::Data<HttpState>) {
    health_state.mark_ready();
    let app = test::init_service(build_app(health_state, http_state)).await;

    let res = test::call_service(&app, test::TestRequest::get().uri("/health/ready").to_request()).await;

    assert_eq!(res.status(), StatusCode::OK);
}
