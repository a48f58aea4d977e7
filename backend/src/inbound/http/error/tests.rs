//! Tests for HTTP error mapping.

use super::*;
use actix_web::body::to_bytes;
use rstest::{fixture, rstest};
use serde_json::json;

const TRACE_ID: &str = "00000000-0000-0000-0000-000000000000";

#[fixture]
fn quota_error() -> Error {
    Error::too_many_requests("Daily writeOps quota exceeded")
        .with_trace_id(TRACE_ID)
        .with_details(json!({
            "field": "writeOps",
            "tier": "BASIC",
            "limit": 200,
            "current": 200,
            "error": "must not leak over the message",
        }))
}

async fn render(error: &Error) -> (StatusCode, Option<String>, Value) {
    let response = ResponseError::error_response(error);
    let status = response.status();
    let trace = response
        .headers()
        .get(TRACE_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned);
    let bytes = to_bytes(response.into_body())
        .await
        .expect("reading response body succeeds");
    let body = serde_json::from_slice(&bytes).expect("error body is JSON");
    (status, trace, body)
}

#[rstest]
#[case(Error::invalid_request("bad"), StatusCode::BAD_REQUEST)]
#[case(Error::unauthorized("no auth"), StatusCode::UNAUTHORIZED)]
#[case(Error::payment_required("upgrade"), StatusCode::PAYMENT_REQUIRED)]
#[case(Error::forbidden("denied"), StatusCode::FORBIDDEN)]
#[case(Error::not_found("missing"), StatusCode::NOT_FOUND)]
#[case(Error::conflict("again"), StatusCode::CONFLICT)]
#[case(Error::gone("expired"), StatusCode::GONE)]
#[case(Error::too_many_requests("slow down"), StatusCode::TOO_MANY_REQUESTS)]
#[case(Error::service_unavailable("store down"), StatusCode::SERVICE_UNAVAILABLE)]
#[case(Error::internal("boom"), StatusCode::INTERNAL_SERVER_ERROR)]
fn status_code_matches_error_code(#[case] err: Error, #[case] status: StatusCode) {
    assert_eq!(ResponseError::status_code(&err), status);
}

#[rstest]
#[actix_web::test]
async fn details_are_flattened_into_the_envelope(quota_error: Error) {
    let (status, trace, body) = render(&quota_error).await;

    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(trace.as_deref(), Some(TRACE_ID));
    assert_eq!(body["error"], "Daily writeOps quota exceeded");
    assert_eq!(body["code"], "too_many_requests");
    assert_eq!(body["traceId"], TRACE_ID);
    assert_eq!(body["tier"], "BASIC");
    assert_eq!(body["limit"], 200);
    assert_eq!(body["current"], 200);
}

#[rstest]
#[actix_web::test]
async fn internal_errors_are_redacted() {
    let err = Error::internal("connection string leaked")
        .with_trace_id(TRACE_ID)
        .with_details(json!({ "secret": "x" }));
    let (status, _, body) = render(&err).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        body,
        json!({ "error": "Internal server error", "code": "internal_error", "traceId": TRACE_ID })
    );
}

#[rstest]
#[actix_web::test]
async fn rate_limit_errors_carry_retry_after() {
    let err = Error::too_many_requests("Rate limit exceeded")
        .with_details(json!({ "class": "write", "retryAfterSeconds": 7 }));
    let response = ResponseError::error_response(&err);
    let retry = response
        .headers()
        .get(actix_web::http::header::RETRY_AFTER)
        .and_then(|value| value.to_str().ok());
    assert_eq!(retry, Some("7"));
}

#[rstest]
fn non_object_details_are_nested() {
    let err = Error::invalid_request("bad").with_details(json!(["a", "b"]));
    let body = envelope(&err);
    assert_eq!(body["details"], json!(["a", "b"]));
}
