//! Service settings loaded via OrthoConfig.
//!
//! Every value can come from `VAULT_*` environment variables, a config file or
//! the command line. Absent endpoints select the local fallbacks: in-memory
//! store, disabled email and receipts, and dev tokens when enabled.

use std::net::SocketAddr;
use std::time::Duration;

use color_eyre::eyre::{Result, WrapErr, eyre};
use ortho_config::OrthoConfig;
use serde::Deserialize;
use url::Url;

use vault_backend::outbound::http::HttpEndpoint;
use vault_backend::outbound::queue::DEFAULT_QUEUE_CAPACITY;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_EMAIL_FROM: &str = "Shared Vaults <no-reply@vaults.invalid>";
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 10;

/// Configuration values for the vault service.
#[derive(Debug, Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "VAULT")]
pub struct ServiceSettings {
    /// Socket address the HTTP server binds to.
    pub bind_addr: Option<String>,
    /// PostgreSQL URL. The in-memory store is used when unset.
    pub database_url: Option<String>,
    /// Maximum pooled database connections.
    pub database_pool_size: Option<u32>,
    /// Operational override that stops daily quotas from being enforced.
    #[ortho_config(default = false)]
    pub quotas_disabled: bool,
    /// Accept `dev:{uid}[:{email}]` bearer tokens when no identity endpoint is set.
    #[ortho_config(default = false)]
    pub dev_tokens: bool,
    /// Identity provider base URL for token verification and user deletion.
    pub identity_url: Option<String>,
    pub identity_api_key: Option<String>,
    /// Transactional email API base URL.
    pub email_url: Option<String>,
    pub email_api_key: Option<String>,
    /// Sender address for outbound email.
    pub email_from: Option<String>,
    /// Receipt verification API base URL.
    pub receipts_url: Option<String>,
    pub receipts_api_key: Option<String>,
    /// Timeout applied to every outbound HTTP call, in seconds.
    pub http_timeout_secs: Option<u64>,
    /// Deletion job ids buffered before new requests wait.
    pub deletion_queue_capacity: Option<usize>,
}

impl ServiceSettings {
    /// Parse the configured bind address.
    pub fn bind_addr(&self) -> Result<SocketAddr> {
        let raw = self.bind_addr.as_deref().unwrap_or(DEFAULT_BIND_ADDR);
        raw.parse()
            .wrap_err_with(|| format!("invalid VAULT_BIND_ADDR: {raw}"))
    }

    pub fn email_from(&self) -> &str {
        self.email_from.as_deref().unwrap_or(DEFAULT_EMAIL_FROM)
    }

    pub fn deletion_queue_capacity(&self) -> usize {
        self.deletion_queue_capacity
            .unwrap_or(DEFAULT_QUEUE_CAPACITY)
            .max(1)
    }

    fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs.unwrap_or(DEFAULT_HTTP_TIMEOUT_SECS))
    }

    fn endpoint(&self, url: Option<&str>, api_key: Option<&String>) -> Result<Option<HttpEndpoint>> {
        let Some(raw) = url.filter(|raw| !raw.trim().is_empty()) else {
            return Ok(None);
        };
        let base_url = Url::parse(raw).map_err(|err| eyre!("invalid endpoint URL {raw}: {err}"))?;
        Ok(Some(
            HttpEndpoint::new(base_url)
                .with_api_key(api_key.cloned())
                .with_timeout(self.http_timeout()),
        ))
    }

    pub fn identity_endpoint(&self) -> Result<Option<HttpEndpoint>> {
        self.endpoint(self.identity_url.as_deref(), self.identity_api_key.as_ref())
    }

    pub fn email_endpoint(&self) -> Result<Option<HttpEndpoint>> {
        self.endpoint(self.email_url.as_deref(), self.email_api_key.as_ref())
    }

    pub fn receipts_endpoint(&self) -> Result<Option<HttpEndpoint>> {
        self.endpoint(self.receipts_url.as_deref(), self.receipts_api_key.as_ref())
    }
}
