//! Reqwest-backed clients for the identity provider, transactional email and
//! billing receipt verification.
//!
//! Each adapter owns transport details only: request shape, bearer
//! authentication, timeouts and status mapping into its port error.

mod email;
mod identity;
mod receipts;

use std::time::Duration;

use reqwest::{Client, RequestBuilder};

pub use email::HttpEmailSender;
pub use identity::{DevTokenVerifier, HttpIdentityDirectory, HttpIdentityVerifier};
pub use receipts::HttpReceiptVerifier;

/// Endpoint, credentials and timeout shared by every HTTP adapter.
#[derive(Debug, Clone)]
pub struct HttpEndpoint {
    pub base_url: reqwest::Url,
    pub api_key: Option<String>,
    pub timeout: Duration,
}

impl HttpEndpoint {
    pub fn new(base_url: reqwest::Url) -> Self {
        Self {
            base_url,
            api_key: None,
            timeout: Duration::from_secs(10),
        }
    }

    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key.filter(|key| !key.trim().is_empty());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn client(&self) -> Result<Client, reqwest::Error> {
        Client::builder().timeout(self.timeout).build()
    }

    /// Join `path` onto the base URL, keeping any base path prefix.
    fn url(&self, path: &str) -> reqwest::Url {
        let mut url = self.base_url.clone();
        let joined = format!(
            "{}/{}",
            url.path().trim_end_matches('/'),
            path.trim_start_matches('/')
        );
        url.set_path(&joined);
        url
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.api_key {
            Some(key) => request.bearer_auth(key),
            None => request,
        }
    }
}

/// Whitespace-collapsed, truncated response body for error messages.
fn body_preview(body: &[u8]) -> String {
    const PREVIEW_CHAR_LIMIT: usize = 160;

    let compact = String::from_utf8_lossy(body)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    let preview = compact.chars().take(PREVIEW_CHAR_LIMIT).collect::<String>();
    if compact.chars().count() > PREVIEW_CHAR_LIMIT {
        format!("{preview}...")
    } else {
        preview
    }
}

fn status_message(status: reqwest::StatusCode, body: &[u8]) -> String {
    let preview = body_preview(body);
    if preview.is_empty() {
        format!("status {}", status.as_u16())
    } else {
        format!("status {}: {preview}", status.as_u16())
    }
}
