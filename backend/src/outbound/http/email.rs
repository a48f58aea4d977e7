//! Transactional email over an HTTP provider API.
//!
//! Posts `{from, to, subject, text, html}` to `{base}/emails` with the API key
//! as a bearer token.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Serialize;

use super::{HttpEndpoint, status_message};
use crate::domain::ports::{EmailDelivery, EmailError, EmailSender, OutboundEmail};

#[derive(Debug, Serialize)]
struct SendEmailRequest<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    text: &'a str,
    html: &'a str,
}

pub struct HttpEmailSender {
    client: Client,
    endpoint: HttpEndpoint,
    from: String,
}

impl HttpEmailSender {
    /// # Errors
    ///
    /// Returns an error when the reqwest client cannot be constructed.
    pub fn new(endpoint: HttpEndpoint, from: impl Into<String>) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: endpoint.client()?,
            endpoint,
            from: from.into(),
        })
    }
}

fn map_status(status: StatusCode, body: &[u8]) -> EmailError {
    let message = status_message(status, body);
    if status.is_client_error() && status != StatusCode::TOO_MANY_REQUESTS {
        EmailError::rejected(message)
    } else {
        EmailError::unavailable(message)
    }
}

#[async_trait]
impl EmailSender for HttpEmailSender {
    async fn send(&self, email: &OutboundEmail) -> Result<EmailDelivery, EmailError> {
        let payload = SendEmailRequest {
            from: &self.from,
            to: [email.to.as_str()],
            subject: &email.subject,
            text: &email.text,
            html: &email.html,
        };
        let request = self.client.post(self.endpoint.url("emails")).json(&payload);
        let response = self
            .endpoint
            .authorize(request)
            .send()
            .await
            .map_err(|err| EmailError::unavailable(err.to_string()))?;
        let status = response.status();
        if status.is_success() {
            return Ok(EmailDelivery { sent: true });
        }
        let body = response
            .bytes()
            .await
            .map_err(|err| EmailError::unavailable(err.to_string()))?;
        Err(map_status(status, &body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(StatusCode::UNPROCESSABLE_ENTITY, true)]
    #[case(StatusCode::TOO_MANY_REQUESTS, false)]
    #[case(StatusCode::BAD_GATEWAY, false)]
    fn statuses_split_into_rejected_and_unavailable(
        #[case] status: StatusCode,
        #[case] rejected: bool,
    ) {
        let err = map_status(status, b"{\"message\":\"nope\"}");
        assert_eq!(matches!(err, EmailError::Rejected { .. }), rejected);
        assert!(err.to_string().contains(&status.as_u16().to_string()));
    }

    #[rstest]
    fn payload_wraps_recipient_in_a_list() {
        let payload = SendEmailRequest {
            from: "vault@example.com",
            to: ["ann@example.com"],
            subject: "s",
            text: "t",
            html: "<p>t</p>",
        };
        let value = serde_json::to_value(&payload).expect("serialize");
        assert_eq!(value["to"], serde_json::json!(["ann@example.com"]));
    }
}
