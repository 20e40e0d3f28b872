use std::sync::Arc;

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use forumd::activity;
use forumd::config::Config;
use forumd::content::ContentStore;
use forumd::db::Database;
use forumd::forum::ForumService;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {e:#}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    init_tracing()?;

    info!("Starting forumd");

    let config = Config::from_env().context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;

    info!(
        metadata_db = %config.metadata_db_path.display(),
        content_db = %config.content_db_path.display(),
        "Configuration loaded"
    );

    // Ensure data directories exist
    for path in [&config.metadata_db_path, &config.content_db_path] {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.with_context(|| {
                format!("Failed to create data directory: {}", parent.display())
            })?;
        }
    }

    let db = Database::new(&config.metadata_db_path)
        .await
        .context("Failed to initialize metadata store")?;
    info!("Metadata store initialized");

    let content = Arc::new(
        ContentStore::open(&config.content_db_path)
            .context("Failed to initialize content store")?,
    );
    info!("Content store initialized");

    let _service = ForumService::new(db, Arc::clone(&content));

    // Activity retention worker
    let shutdown = CancellationToken::new();
    let prune_handle = tokio::spawn(activity::run_prune_worker(
        Arc::clone(&content),
        config.activity_retention_days,
        config.activity_prune_interval,
        shutdown.clone(),
    ));

    info!("forumd ready");

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;
    info!("Shutdown signal received");

    shutdown.cancel();
    let _ = prune_handle.await;

    info!("forumd stopped");
    Ok(())
}

fn init_tracing() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    Ok(())
}
