//! Digest job worker binary.
//!
//! Connects to PostgreSQL, resolves the chat provider from the
//! environment, and polls the digest job queue until interrupted.

use std::sync::Arc;

use anyhow::Context;
use tracing::info;
use tracing_subscriber::EnvFilter;

use newswatch_db::Database;
use newswatch_inference::{LlmTranslator, ProviderConfig};
use newswatch_jobs::{DigestPipeline, JobWorker, WorkerConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let database_url =
        std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
    let db = Database::connect(&database_url).await?;

    let provider = ProviderConfig::from_env();
    let backend = provider.digest_backend()?;
    let translator = Arc::new(LlmTranslator::new(provider.translate_backend()?));

    let pipeline = Arc::new(DigestPipeline::new(
        db.news_items.clone(),
        db.digest_jobs.clone(),
        backend,
        translator,
        provider.digest_enabled,
    ));

    let worker = JobWorker::new(pipeline, WorkerConfig::from_env());
    let handle = worker.start();

    info!("newswatch worker running, press ctrl-c to stop");
    tokio::signal::ctrl_c().await?;

    handle.shutdown().await?;
    info!("shutdown complete");
    Ok(())
}
