//! Success envelope shared by every JSON handler.
//!
//! Bodies render as `{ "ok": true, ... }` with the payload's top-level fields
//! merged in. Payloads that are not JSON objects land under `data`.

use actix_web::HttpResponse;
use actix_web::http::StatusCode;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::domain::Error;
use crate::inbound::http::ApiResult;

fn envelope(payload: Value) -> Value {
    let mut body = Map::new();
    body.insert("ok".to_owned(), Value::Bool(true));
    match payload {
        Value::Object(fields) => {
            for (key, value) in fields {
                if key != "ok" {
                    body.insert(key, value);
                }
            }
        }
        Value::Null => {}
        other => {
            body.insert("data".to_owned(), other);
        }
    }
    Value::Object(body)
}

/// Render `payload` inside the success envelope with `status`.
pub(crate) fn respond<T: Serialize>(status: StatusCode, payload: &T) -> ApiResult<HttpResponse> {
    let value = serde_json::to_value(payload)
        .map_err(|err| Error::internal(format!("failed to encode response: {err}")))?;
    Ok(HttpResponse::build(status).json(envelope(value)))
}

/// `200 OK` shorthand for [`respond`].
pub(crate) fn ok<T: Serialize>(payload: &T) -> ApiResult<HttpResponse> {
    respond(StatusCode::OK, payload)
}

/// `201 Created` shorthand for [`respond`].
pub(crate) fn created<T: Serialize>(payload: &T) -> ApiResult<HttpResponse> {
    respond(StatusCode::CREATED, payload)
}

/// `202 Accepted` for work that has not finished yet.
pub(crate) fn accepted<T: Serialize>(payload: &T) -> ApiResult<HttpResponse> {
    respond(StatusCode::ACCEPTED, payload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    #[rstest]
    #[case(json!({ "vaultId": "v1" }), json!({ "ok": true, "vaultId": "v1" }))]
    #[case(json!({ "ok": false, "n": 1 }), json!({ "ok": true, "n": 1 }))]
    #[case(json!([1, 2]), json!({ "ok": true, "data": [1, 2] }))]
    #[case(Value::Null, json!({ "ok": true }))]
    fn payloads_merge_into_the_envelope(#[case] payload: Value, #[case] expected: Value) {
        assert_eq!(envelope(payload), expected);
    }
}
