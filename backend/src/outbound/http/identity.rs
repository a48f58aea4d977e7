//! Identity provider adapters.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use super::{HttpEndpoint, status_message};
use crate::domain::ports::{IdentityDirectory, IdentityError, IdentityVerifier};
use crate::domain::{Caller, UserId};

#[derive(Debug, Serialize)]
struct VerifyTokenRequest<'a> {
    token: &'a str,
}

#[derive(Debug, Deserialize)]
struct VerifiedIdentityDto {
    uid: String,
    #[serde(default)]
    email: Option<String>,
}

impl VerifiedIdentityDto {
    fn into_caller(self) -> Result<Caller, IdentityError> {
        let user_id = UserId::new(self.uid)
            .map_err(|err| IdentityError::invalid_token(format!("provider returned bad uid: {err}")))?;
        Ok(Caller::new(user_id, self.email.filter(|email| !email.is_empty())))
    }
}

fn map_transport_error(error: reqwest::Error) -> IdentityError {
    IdentityError::unavailable(error.to_string())
}

/// Verifies bearer tokens by posting them to `{base}/v1/tokens:verify`.
pub struct HttpIdentityVerifier {
    client: Client,
    endpoint: HttpEndpoint,
}

impl HttpIdentityVerifier {
    /// # Errors
    ///
    /// Returns an error when the reqwest client cannot be constructed.
    pub fn new(endpoint: HttpEndpoint) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: endpoint.client()?,
            endpoint,
        })
    }
}

#[async_trait]
impl IdentityVerifier for HttpIdentityVerifier {
    async fn verify(&self, token: &str) -> Result<Caller, IdentityError> {
        let request = self
            .client
            .post(self.endpoint.url("v1/tokens:verify"))
            .json(&VerifyTokenRequest { token });
        let response = self
            .endpoint
            .authorize(request)
            .send()
            .await
            .map_err(map_transport_error)?;
        let status = response.status();
        let body = response.bytes().await.map_err(map_transport_error)?;
        match status {
            s if s.is_success() => {
                let dto: VerifiedIdentityDto = serde_json::from_slice(&body).map_err(|err| {
                    IdentityError::unavailable(format!("invalid verify response: {err}"))
                })?;
                dto.into_caller()
            }
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN | StatusCode::BAD_REQUEST => {
                Err(IdentityError::invalid_token(status_message(status, &body)))
            }
            _ => Err(IdentityError::unavailable(status_message(status, &body))),
        }
    }
}

/// Deletes identity records with `DELETE {base}/v1/users/{uid}`.
pub struct HttpIdentityDirectory {
    client: Client,
    endpoint: HttpEndpoint,
}

impl HttpIdentityDirectory {
    /// # Errors
    ///
    /// Returns an error when the reqwest client cannot be constructed.
    pub fn new(endpoint: HttpEndpoint) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: endpoint.client()?,
            endpoint,
        })
    }
}

#[async_trait]
impl IdentityDirectory for HttpIdentityDirectory {
    async fn delete_user(&self, user_id: &UserId) -> Result<(), IdentityError> {
        let url = self.endpoint.url(&format!("v1/users/{user_id}"));
        let response = self
            .endpoint
            .authorize(self.client.delete(url))
            .send()
            .await
            .map_err(map_transport_error)?;
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        if status == StatusCode::NOT_FOUND {
            return Err(IdentityError::not_found(user_id.as_str()));
        }
        let body = response.bytes().await.map_err(map_transport_error)?;
        Err(IdentityError::unavailable(status_message(status, &body)))
    }
}

/// Accepts `dev:{uid}` or `dev:{uid}:{email}` tokens. Local development only.
#[derive(Debug, Default, Clone, Copy)]
pub struct DevTokenVerifier;

#[async_trait]
impl IdentityVerifier for DevTokenVerifier {
    async fn verify(&self, token: &str) -> Result<Caller, IdentityError> {
        let rest = token
            .strip_prefix("dev:")
            .ok_or_else(|| IdentityError::invalid_token("expected a dev: token"))?;
        let (uid, email) = match rest.split_once(':') {
            Some((uid, email)) => (uid, Some(email.to_owned())),
            None => (rest, None),
        };
        let user_id = UserId::new(uid).map_err(|err| IdentityError::invalid_token(err.to_string()))?;
        Ok(Caller::new(user_id, email.filter(|email| !email.is_empty())))
    }
}
