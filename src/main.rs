mod config;
mod dao;
mod model;
mod routes;
mod shortener;
mod token;
mod utils;
mod validation;

use anyhow::{Context, Result};
use axum::serve;
use config::Config;
use dao::{LinkStore, MemoryLinkStore, PgLinkStore};
use dotenvy::dotenv;
use routes::create_router;
use shortener::Shortener;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;
use validation::SystemResolver;

const DEFAULT_TRACING_LEVEL: &str = "shorturl=debug,tower_http=debug";

#[tokio::main]
async fn main() -> Result<()> {
    _ = dotenv();
    configure_tracing();
    let config = config::load_from_env()?;
    config.print_summary();
    let store = create_link_store(&config).await?;
    let resolver = Arc::new(SystemResolver::new(config.dns_timeout()));
    let shortener = Arc::new(Shortener::new(store, resolver, config.shortener_settings()?));
    let _scheduler = configure_scheduler(&config.cleaning_job_cron, shortener.clone()).await?;
    let listener = create_listener(&config.server_address).await?;
    serve(listener, create_router(shortener))
        .await
        .context("Server failed")
}

fn configure_tracing() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or(DEFAULT_TRACING_LEVEL.into()))
        .with(tracing_subscriber::fmt::layer())
        .init();
}

async fn create_link_store(config: &Config) -> Result<Arc<dyn LinkStore>> {
    let Some(ref database_url) = config.database_url else {
        return Ok(Arc::new(MemoryLinkStore::new()));
    };
    let db_connection_pool = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .connect(database_url)
        .await
        .context("Creating database connection pool failed")?;
    sqlx::migrate!("./migrations")
        .run(&db_connection_pool)
        .await
        .context("Running database migrations failed")?;
    tracing::info!("Database connection successful");
    Ok(Arc::new(PgLinkStore::new(db_connection_pool)))
}

async fn configure_scheduler(cron_expression: &str, shortener: Arc<Shortener>) -> Result<JobScheduler> {
    let scheduler = JobScheduler::new()
        .await
        .map_err(|err| anyhow::anyhow!("Creating scheduler failed: {err:?}"))?;
    scheduler
        .add(create_cleaning_job(cron_expression, shortener)?)
        .await
        .map_err(|err| anyhow::anyhow!("Adding cleaning job to scheduler failed: {err:?}"))?;
    scheduler
        .start()
        .await
        .map_err(|err| anyhow::anyhow!("Starting scheduler failed: {err:?}"))?;
    Ok(scheduler)
}

fn create_cleaning_job(cron_expression: &str, shortener: Arc<Shortener>) -> Result<Job> {
    Job::new_async(cron_expression, move |_, _| {
        let shortener = shortener.clone();
        Box::pin(async move {
            match shortener.purge_expired().await {
                Ok(deleted) => tracing::debug!("Removed {} expired short urls", deleted),
                Err(err) => tracing::error!("Removing expired short urls failed: {}", err),
            }
        })
    })
    .map_err(|err| anyhow::anyhow!("Creating cleaning job from '{cron_expression}' failed: {err:?}"))
}

async fn create_listener(server_address: &str) -> Result<TcpListener> {
    let listener = TcpListener::bind(server_address)
        .await
        .with_context(|| format!("Creating tcp listener on {server_address} failed"))?;
    tracing::info!("Listening on address: {}", server_address);
    Ok(listener)
}
