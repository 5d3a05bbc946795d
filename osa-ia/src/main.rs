//! osa-ia: shelf image analysis microservice
//!
//! Serves the analysis HTTP API for the UI shell: SKU detection via
//! Gemini, accuracy scoring against ground truth, catalog management, and
//! run history.

use anyhow::{Context, Result};
use tracing::{info, warn, Level};

use osa_ia::{build_router, config, db, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    // Config is read before logging comes up so its level applies; a load
    // failure falls back to defaults and is reported once logging exists
    let (toml_config, config_error) = match config::load_service_config() {
        Ok(cfg) => (cfg, None),
        Err(e) => (Default::default(), Some(e)),
    };

    let level = match toml_config.logging.level.as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };
    tracing_subscriber::fmt().with_max_level(level).init();

    info!(
        "Starting osa-ia (Image Analysis) v{}",
        env!("CARGO_PKG_VERSION")
    );
    info!(
        "Build: {} ({}, {})",
        env!("GIT_HASH"),
        env!("BUILD_PROFILE"),
        env!("BUILD_TIMESTAMP")
    );
    if let Some(e) = config_error {
        warn!("Failed to load TOML config, using defaults: {e}");
    }

    let data_folder = osa_common::config::resolve_data_folder(
        None,
        config::ENV_DATA_FOLDER,
        Some(&toml_config),
    );
    osa_common::config::ensure_data_folder(&data_folder)
        .with_context(|| format!("Failed to create data folder {}", data_folder.display()))?;
    info!("Data folder: {}", data_folder.display());

    let db_path = osa_common::config::database_path(&data_folder);
    let pool = db::init_database_pool(&db_path)
        .await
        .context("Failed to initialize database")?;
    db::catalog::seed_defaults_if_empty(&pool).await?;

    let state = AppState::new(pool, toml_config);
    let app = build_router(state);

    let port = config::resolve_port();
    let addr = format!("127.0.0.1:{port}");
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("osa-ia listening on http://{addr}");

    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}
