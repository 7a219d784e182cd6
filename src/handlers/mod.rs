//! NATS message handlers

pub mod auth;
pub mod blog;
pub mod career;
pub mod customer;
pub mod dashboard;
pub mod import;
pub mod inquiry;
pub mod message_template;
pub mod ping;
pub mod public;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_nats::{Client, Subject};
use serde::Serialize;
use sqlx::PgPool;
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::Config;
use crate::services::customer_import::{CustomerImportService, CustomerStore, ImportStaging, PgCustomerStore};
use crate::services::rate_limiter::RateLimiter;
use crate::types::{ErrorResponse, SuccessResponse};

/// How often expired staged imports and stale login attempts are dropped
const HOUSEKEEPING_INTERVAL: Duration = Duration::from_secs(60);

/// Start all message handlers and run until Ctrl-C
pub async fn start_handlers(client: Client, pool: PgPool, config: &Config) -> Result<()> {
    info!("Starting message handlers...");

    let jwt_secret = Arc::new(config.jwt_secret.clone());
    let rate_limiter = Arc::new(RateLimiter::for_login());
    let staging = ImportStaging::new(config.import_staging_ttl);
    let store: Arc<dyn CustomerStore> = Arc::new(PgCustomerStore::new(pool.clone()));
    let import_service = CustomerImportService::new(store, staging.clone());
    info!("Import staging TTL: {}s", staging.ttl().as_secs());

    ping::start_handlers(client.clone()).await?;
    auth::start_handlers(
        client.clone(),
        pool.clone(),
        jwt_secret.clone(),
        rate_limiter.clone(),
        import_service.clone(),
    )
    .await?;
    public::start_handlers(client.clone(), pool.clone()).await?;
    dashboard::start_handlers(client.clone(), pool.clone(), jwt_secret.clone()).await?;
    customer::start_handlers(client.clone(), pool.clone(), jwt_secret.clone()).await?;
    import::start_handlers(client.clone(), jwt_secret.clone(), import_service).await?;
    blog::start_handlers(client.clone(), pool.clone(), jwt_secret.clone()).await?;
    message_template::start_handlers(client.clone(), pool.clone(), jwt_secret.clone()).await?;
    career::start_handlers(client.clone(), pool.clone(), jwt_secret.clone()).await?;
    inquiry::start_handlers(client.clone(), pool.clone(), jwt_secret.clone()).await?;

    tokio::spawn(run_housekeeping(staging, rate_limiter));

    info!("All handlers started, waiting for messages");

    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received");

    Ok(())
}

async fn run_housekeeping(staging: ImportStaging, rate_limiter: Arc<RateLimiter>) {
    let mut interval = tokio::time::interval(HOUSEKEEPING_INTERVAL);
    loop {
        interval.tick().await;
        let purged = staging.purge_expired();
        rate_limiter.cleanup();
        if purged > 0 {
            debug!(
                "Purged {} expired staged imports ({} pending, {} login keys tracked)",
                purged,
                staging.len(),
                rate_limiter.tracked_keys()
            );
        }
    }
}

/// Publish an error reply
pub(crate) async fn reply_error(
    client: &Client,
    reply: Subject,
    request_id: Uuid,
    code: &str,
    message: impl Into<String>,
) -> Result<()> {
    let error = ErrorResponse::new(request_id, code, message);
    let _ = client.publish(reply, serde_json::to_vec(&error)?.into()).await;
    Ok(())
}

/// Publish a success reply
pub(crate) async fn reply_success<T: Serialize>(
    client: &Client,
    reply: Subject,
    request_id: Uuid,
    payload: T,
) -> Result<()> {
    let response = SuccessResponse::new(request_id, payload);
    let _ = client.publish(reply, serde_json::to_vec(&response)?.into()).await;
    Ok(())
}
