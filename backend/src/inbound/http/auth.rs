//! Bearer authentication for HTTP handlers.
//!
//! Keep the HTTP modules focused on request/response mapping by concentrating
//! credential parsing, identity verification and rate-limit keying here.

use actix_web::http::header::AUTHORIZATION;
use actix_web::{FromRequest, HttpRequest, dev::Payload, web};
use futures_util::future::LocalBoxFuture;

use crate::domain::{Caller, Error};
use crate::inbound::http::rate_limit::{RateClass, RateKey};
use crate::inbound::http::state::HttpState;

/// Authenticated request context.
///
/// Extracting this rejects the request with `401` unless it carries a
/// verifiable `Authorization: Bearer <token>` header.
#[derive(Debug, Clone)]
pub struct Authenticated {
    caller: Caller,
    rate_key: RateKey,
}

impl Authenticated {
    pub fn caller(&self) -> &Caller {
        &self.caller
    }

    pub fn into_caller(self) -> Caller {
        self.caller
    }

    /// Charge one request in `class` against this caller's bucket.
    pub fn limit(&self, state: &HttpState, class: RateClass) -> Result<(), Error> {
        state.rate_limiter.check(&self.rate_key, class)
    }
}

/// Pull the token out of an `Authorization` header value.
pub(crate) fn bearer_token(header: Option<&str>) -> Result<&str, Error> {
    let value = header.ok_or_else(|| Error::unauthorized("Missing bearer credential"))?;
    let (scheme, token) = value
        .split_once(' ')
        .ok_or_else(|| Error::unauthorized("Malformed authorization header"))?;
    let token = token.trim();
    if !scheme.eq_ignore_ascii_case("bearer") || token.is_empty() {
        return Err(Error::unauthorized("Malformed authorization header"));
    }
    Ok(token)
}

impl FromRequest for Authenticated {
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let state = req.app_data::<web::Data<HttpState>>().cloned();
        let token = req
            .headers()
            .get(AUTHORIZATION)
            .map(|value| value.to_str().map(str::to_owned));
        let peer = req.connection_info().realip_remote_addr().map(str::to_owned);
        Box::pin(async move {
            let state =
                state.ok_or_else(|| Error::internal("HTTP state is not registered with the app"))?;
            let header = match token {
                Some(Ok(value)) => Some(value),
                Some(Err(_)) => return Err(Error::unauthorized("Malformed authorization header")),
                None => None,
            };
            let token = bearer_token(header.as_deref())?;
            let caller = state.identity.verify(token).await.map_err(Error::from)?;
            let rate_key = RateKey::resolve(Some(&caller), peer.as_deref());
            Ok(Self { caller, rate_key })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ErrorCode;
    use rstest::rstest;

    #[rstest]
    #[case(Some("Bearer abc"), Ok("abc"))]
    #[case(Some("bearer   abc "), Ok("abc"))]
    #[case(None, Err(ErrorCode::Unauthorized))]
    #[case(Some("Basic abc"), Err(ErrorCode::Unauthorized))]
    #[case(Some("Bearer"), Err(ErrorCode::Unauthorized))]
    #[case(Some("Bearer  "), Err(ErrorCode::Unauthorized))]
    fn parses_bearer_headers(
        #[case] header: Option<&str>,
        #[case] expected: Result<&str, ErrorCode>,
    ) {
        assert_eq!(bearer_token(header).map_err(|err| err.code()), expected);
    }

    #[rstest]
    fn missing_header_message_is_stable() {
        let err = bearer_token(None).expect_err("missing header");
        assert_eq!(err.message(), "Missing bearer credential");
    }
}
