//! HTTP adapter mapping for domain errors.
//!
//! Errors render as `{ "error": message, "code": code, "traceId": id, ... }`
//! with the domain error's detail fields flattened into the envelope so
//! clients can read `tier`, `limit`, `current` or `field` directly.

use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use serde_json::{Map, Value, json};
use tracing::error;

use crate::domain::{Error, ErrorCode, TRACE_ID_HEADER};

/// Convenient result alias for HTTP handlers.
pub type ApiResult<T> = Result<T, Error>;

const RESERVED_KEYS: [&str; 3] = ["error", "code", "traceId"];

fn status_for(code: ErrorCode) -> StatusCode {
    match code {
        ErrorCode::InvalidRequest => StatusCode::BAD_REQUEST,
        ErrorCode::Unauthorized => StatusCode::UNAUTHORIZED,
        ErrorCode::PaymentRequired => StatusCode::PAYMENT_REQUIRED,
        ErrorCode::Forbidden => StatusCode::FORBIDDEN,
        ErrorCode::NotFound => StatusCode::NOT_FOUND,
        ErrorCode::Conflict => StatusCode::CONFLICT,
        ErrorCode::Gone => StatusCode::GONE,
        ErrorCode::TooManyRequests => StatusCode::TOO_MANY_REQUESTS,
        ErrorCode::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        ErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Build the JSON error envelope. Internal errors lose message and details.
pub(crate) fn envelope(error: &Error) -> Value {
    let internal = error.code() == ErrorCode::InternalError;
    let mut body = Map::new();
    body.insert(
        "error".to_owned(),
        Value::from(if internal {
            "Internal server error"
        } else {
            error.message()
        }),
    );
    body.insert("code".to_owned(), Value::from(error.code().as_str()));
    if let Some(id) = error.trace_id() {
        body.insert("traceId".to_owned(), Value::from(id));
    }
    if internal {
        return Value::Object(body);
    }
    match error.details() {
        Some(Value::Object(details)) => {
            for (key, value) in details {
                if !RESERVED_KEYS.contains(&key.as_str()) {
                    body.insert(key.clone(), value.clone());
                }
            }
        }
        Some(other) => {
            body.insert("details".to_owned(), other.clone());
        }
        None => {}
    }
    Value::Object(body)
}

impl ResponseError for Error {
    fn status_code(&self) -> StatusCode {
        status_for(self.code())
    }

    fn error_response(&self) -> HttpResponse {
        let mut builder = HttpResponse::build(self.status_code());
        if let Some(id) = self.trace_id() {
            builder.insert_header((TRACE_ID_HEADER, id.to_owned()));
        }
        if let Some(retry) = self
            .details()
            .and_then(|details| details.get("retryAfterSeconds"))
            .and_then(Value::as_u64)
        {
            builder.insert_header((actix_web::http::header::RETRY_AFTER, retry.to_string()));
        }
        builder.json(envelope(self))
    }
}

impl From<actix_web::Error> for Error {
    fn from(err: actix_web::Error) -> Self {
        error!(error = %err, "actix error promoted to domain error");
        Error::internal("Internal server error")
    }
}

/// JSON error handler for malformed bodies, paths and queries.
pub fn payload_error(message: impl std::fmt::Display) -> Error {
    Error::invalid_request(format!("Malformed request: {message}"))
        .with_details(json!({ "reason": "malformed_request" }))
}

#[cfg(test)]
mod tests;
