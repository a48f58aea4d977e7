//! Service entry-point: loads settings, wires adapters and serves the REST API.

mod server;

use actix_web::web;
use color_eyre::eyre::{Result, WrapErr};
use ortho_config::OrthoConfig;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

use vault_backend::inbound::http::health::HealthState;

use server::{ServiceSettings, ServiceWiring, build_http_state, create_server};

/// Application bootstrap.
#[actix_web::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    if let Err(e) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .try_init()
    {
        warn!(error = %e, "tracing init failed");
    }

    let settings = ServiceSettings::load().wrap_err("failed to load service settings")?;
    let bind_addr = settings.bind_addr()?;
    let ServiceWiring {
        http_state,
        deletion_worker,
    } = build_http_state(&settings).await?;

    let health_state = web::Data::new(HealthState::new());
    let server = create_server(health_state.clone(), http_state, bind_addr)
        .wrap_err_with(|| format!("failed to bind {bind_addr}"))?;
    info!(%bind_addr, "vault service listening");

    let result = server.await;
    health_state.mark_unready();
    deletion_worker.abort();
    result.wrap_err("HTTP server terminated abnormally")
}
