//! Receipt verification against a billing provider.
//!
//! Posts `{receipt}` to `{base}/v1/receipts:verify` and expects
//! `{status, productId, expiresAt?, transactionId}` back.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use super::{HttpEndpoint, status_message};
use crate::domain::SubscriptionStatus;
use crate::domain::ports::{ReceiptError, ReceiptVerification, ReceiptVerifier};

#[derive(Debug, Serialize)]
struct VerifyReceiptRequest<'a> {
    receipt: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReceiptDto {
    status: SubscriptionStatus,
    product_id: String,
    #[serde(default)]
    expires_at: Option<DateTime<Utc>>,
    transaction_id: String,
}

impl From<ReceiptDto> for ReceiptVerification {
    fn from(dto: ReceiptDto) -> Self {
        Self {
            status: dto.status,
            product_id: dto.product_id,
            expires_at: dto.expires_at,
            transaction_id: dto.transaction_id,
        }
    }
}

pub struct HttpReceiptVerifier {
    client: Client,
    endpoint: HttpEndpoint,
}

impl HttpReceiptVerifier {
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

fn parse_receipt(body: &[u8]) -> Result<ReceiptVerification, ReceiptError> {
    serde_json::from_slice::<ReceiptDto>(body)
        .map(ReceiptVerification::from)
        .map_err(|err| ReceiptError::unavailable(format!("invalid verification payload: {err}")))
}

#[async_trait]
impl ReceiptVerifier for HttpReceiptVerifier {
    async fn verify(&self, receipt: &str) -> Result<ReceiptVerification, ReceiptError> {
        let request = self
            .client
            .post(self.endpoint.url("v1/receipts:verify"))
            .json(&VerifyReceiptRequest { receipt });
        let response = self
            .endpoint
            .authorize(request)
            .send()
            .await
            .map_err(|err| ReceiptError::unavailable(err.to_string()))?;
        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|err| ReceiptError::unavailable(err.to_string()))?;
        match status {
            s if s.is_success() => parse_receipt(&body),
            StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY | StatusCode::PAYMENT_REQUIRED => {
                Err(ReceiptError::invalid(status_message(status, &body)))
            }
            _ => Err(ReceiptError::unavailable(status_message(status, &body))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn parses_verification_payload() {
        let body = br#"{
            "status": "active",
            "productId": "vault.pro.monthly",
            "expiresAt": "2026-11-01T00:00:00Z",
            "transactionId": "tx-1"
        }"#;
        let verified = parse_receipt(body).expect("payload decodes");
        assert_eq!(verified.status, SubscriptionStatus::Active);
        assert_eq!(verified.product_id, "vault.pro.monthly");
        assert!(verified.expires_at.is_some());
    }

    #[rstest]
    fn unknown_statuses_decode_as_unknown() {
        let body = br#"{"status":"paused","productId":"p","transactionId":"t"}"#;
        let verified = parse_receipt(body).expect("payload decodes");
        assert_eq!(verified.status, SubscriptionStatus::Unknown);
        assert!(verified.expires_at.is_none());
    }

    #[rstest]
    fn malformed_payloads_are_unavailable_errors() {
        let err = parse_receipt(b"not json").expect_err("rejected");
        assert!(matches!(err, ReceiptError::Unavailable { .. }));
    }
}
