//! Builders for the document store, outbound adapters and HTTP state.
//!
//! Storage, email and receipt verification fall back to local implementations
//! when their endpoints are not configured. Identity has no silent fallback:
//! either an identity endpoint or `VAULT_DEV_TOKENS` must be set.

use std::sync::Arc;

use actix_web::web;
use color_eyre::eyre::{Result, WrapErr, eyre};
use mockable::{Clock, DefaultClock};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use vault_backend::domain::ports::{
    DeletionJobHandler, DisabledEmailSender, DisabledReceiptVerifier, DocumentStore, EmailSender,
    FixtureIdentityDirectory, IdentityDirectory, IdentityVerifier, ReceiptVerifier,
};
use vault_backend::domain::{
    AccountDeletionWorker, AccountService, BillingService, Governance, InvitationService,
    MembershipService, MoveService, ResourceService, VaultService,
};
use vault_backend::inbound::http::rate_limit::RateLimiter;
use vault_backend::inbound::http::state::{HttpState, HttpStatePorts};
use vault_backend::outbound::cache::BoundedDedupeCache;
use vault_backend::outbound::http::{
    DevTokenVerifier, HttpEmailSender, HttpIdentityDirectory, HttpIdentityVerifier,
    HttpReceiptVerifier,
};
use vault_backend::outbound::persistence::{
    DbPool, DieselDocumentStore, InMemoryDocumentStore, PoolConfig, run_migrations,
};
use vault_backend::outbound::queue::TokioDeletionQueue;

use super::ServiceSettings;

/// HTTP state plus the background worker it feeds.
pub struct ServiceWiring {
    pub http_state: web::Data<HttpState>,
    pub deletion_worker: JoinHandle<()>,
}

async fn build_store(settings: &ServiceSettings) -> Result<Arc<dyn DocumentStore>> {
    let Some(url) = settings.database_url.as_deref() else {
        warn!("no database configured; documents are held in memory and lost on restart");
        return Ok(Arc::new(InMemoryDocumentStore::new()));
    };
    run_migrations(url)
        .await
        .wrap_err("failed to apply database migrations")?;
    let mut config = PoolConfig::new(url);
    if let Some(size) = settings.database_pool_size {
        config = config.with_max_size(size);
    }
    let pool = DbPool::new(config)
        .await
        .map_err(|err| eyre!("failed to build database pool: {}", err.message()))?;
    info!("document store backed by PostgreSQL");
    Ok(Arc::new(DieselDocumentStore::new(pool)))
}

fn build_identity(
    settings: &ServiceSettings,
) -> Result<(Arc<dyn IdentityVerifier>, Arc<dyn IdentityDirectory>)> {
    if let Some(endpoint) = settings.identity_endpoint()? {
        let verifier = HttpIdentityVerifier::new(endpoint.clone())
            .wrap_err("failed to build identity client")?;
        let directory =
            HttpIdentityDirectory::new(endpoint).wrap_err("failed to build identity client")?;
        return Ok((Arc::new(verifier), Arc::new(directory)));
    }
    if settings.dev_tokens {
        warn!("accepting dev: bearer tokens; never enable this in production");
        return Ok((Arc::new(DevTokenVerifier), Arc::new(FixtureIdentityDirectory)));
    }
    Err(eyre!(
        "no identity provider configured; set VAULT_IDENTITY_URL or VAULT_DEV_TOKENS"
    ))
}

fn build_email(settings: &ServiceSettings) -> Result<Arc<dyn EmailSender>> {
    match settings.email_endpoint()? {
        Some(endpoint) => Ok(Arc::new(
            HttpEmailSender::new(endpoint, settings.email_from())
                .wrap_err("failed to build email client")?,
        )),
        None => {
            warn!("no email endpoint configured; notifications are recorded but not sent");
            Ok(Arc::new(DisabledEmailSender))
        }
    }
}

fn build_receipts(settings: &ServiceSettings) -> Result<Arc<dyn ReceiptVerifier>> {
    match settings.receipts_endpoint()? {
        Some(endpoint) => Ok(Arc::new(
            HttpReceiptVerifier::new(endpoint).wrap_err("failed to build receipt client")?,
        )),
        None => Ok(Arc::new(DisabledReceiptVerifier)),
    }
}

/// Wire domain services over the configured adapters.
///
/// Spawns the account deletion worker and re-enqueues deletion jobs left
/// queued or running by a previous process.
pub async fn build_http_state(settings: &ServiceSettings) -> Result<ServiceWiring> {
    let store = build_store(settings).await?;
    let clock: Arc<dyn Clock> = Arc::new(DefaultClock);
    let (identity, directory) = build_identity(settings)?;
    let email = build_email(settings)?;
    let receipts = build_receipts(settings)?;
    let suppression = Arc::new(BoundedDedupeCache::with_defaults(clock.clone()));

    if settings.quotas_disabled {
        warn!("daily quotas are not enforced");
    }
    let governance = Governance::new(store, clock, email, suppression, !settings.quotas_disabled);

    let worker: Arc<dyn DeletionJobHandler> =
        Arc::new(AccountDeletionWorker::new(governance.clone(), directory));
    let (queue, deletion_worker) =
        TokioDeletionQueue::spawn(worker, settings.deletion_queue_capacity());
    let account = Arc::new(AccountService::new(governance.clone(), Arc::new(queue)));
    match account.recover_pending().await {
        Ok(0) => {}
        Ok(count) => info!(count, "re-enqueued pending account deletions"),
        Err(err) => warn!(error = %err, "account deletion recovery failed"),
    }

    let vaults = Arc::new(VaultService::new(governance.clone()));
    let resources = Arc::new(ResourceService::new(governance.clone()));
    let ports = HttpStatePorts {
        vaults: vaults.clone(),
        vaults_query: vaults,
        resources: resources.clone(),
        resources_query: resources,
        moves: Arc::new(MoveService::new(governance.clone())),
        invitations: Arc::new(InvitationService::new(governance.clone())),
        members: Arc::new(MembershipService::new(governance.clone())),
        account,
        billing: Arc::new(BillingService::new(governance, receipts)),
    };
    let http_state = HttpState::new(ports, identity, Arc::new(RateLimiter::default()));
    Ok(ServiceWiring {
        http_state: web::Data::new(http_state),
        deletion_worker,
    })
}
