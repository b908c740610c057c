use anyhow::{Context, Result};
use axum::Router;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::{fs, path::Path, sync::Arc};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

mod config;
mod errors;
mod handlers;
mod models;
mod routes;
mod services;
mod state;

use services::{
    media::SystemToolRunner, metadata_store::MetadataStore, object_uploader::S3Uploader,
};
use state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // --- Logging setup ---
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // --- Parse config + migrate flag ---
    let (cfg, migrate) = config::AppConfig::from_env_and_args()?;

    tracing::info!(
        port = cfg.port,
        platform = %cfg.platform,
        db_path = %cfg.db_path,
        assets_root = %cfg.assets_root.display(),
        bucket = %cfg.s3_bucket,
        region = %cfg.s3_region,
        "Starting tubely"
    );

    // --- Ensure assets directory exists ---
    ensure_dir(&cfg.assets_root)?;

    // --- Initialize SQLite connection ---
    if let Some(parent) = Path::new(&cfg.db_path).parent() {
        ensure_dir(parent)?;
    }
    let options = SqliteConnectOptions::new()
        .filename(&cfg.db_path)
        .create_if_missing(true);
    let db = Arc::new(
        SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .with_context(|| format!("opening database {}", cfg.db_path))?,
    );

    let store = MetadataStore::new(db);
    store.run_migrations().await?;

    // --- Handle migration mode ---
    if migrate {
        tracing::info!("Database migration complete.");
        return Ok(()); // exit after migration
    }

    // --- Initialize services ---
    let uploader = S3Uploader::new(&cfg.s3_bucket, &cfg.s3_region)?;
    let addr = cfg.addr();
    let state = AppState::new(cfg, store, Arc::new(SystemToolRunner), Arc::new(uploader));

    // --- Build router ---
    let app: Router = routes::routes::routes(state);

    // --- Start server ---
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;

    tracing::info!("Server listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}

fn ensure_dir(path: &Path) -> Result<()> {
    if !path.as_os_str().is_empty() && !path.exists() {
        fs::create_dir_all(path).with_context(|| format!("creating {}", path.display()))?;
        tracing::info!("Created directory {}", path.display());
    }
    Ok(())
}
