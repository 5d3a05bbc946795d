//! Database operations for image analysis
//!
//! Single SQLite file holding the settings key/value store, the persistent
//! SKU catalog, and the append-only analysis run history.

pub mod catalog;
pub mod runs;
pub mod settings;

use std::path::Path;

use anyhow::Result;
use sqlx::sqlite::SqlitePool;
use tracing::info;

/// Open (creating if needed) the database and ensure all tables exist
pub async fn init_database_pool(db_path: &Path) -> Result<SqlitePool> {
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    info!("Connecting to database: {}", db_path.display());

    let pool = SqlitePool::connect(&db_url).await?;
    init_tables(&pool).await?;

    Ok(pool)
}

/// Create all tables and indexes if they do not exist
///
/// Public so tests can prepare an in-memory pool with the same schema.
pub async fn init_tables(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS settings (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        )",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS sku_items (
            position INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            code TEXT,
            facing_touching INTEGER,
            shelf_no INTEGER
        )",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS analysis_runs (
            run_id TEXT PRIMARY KEY,
            date TEXT NOT NULL,
            display_id TEXT NOT NULL,
            ground_truth_skus TEXT NOT NULL,
            predicted_skus TEXT NOT NULL,
            accuracy REAL NOT NULL,
            comparison TEXT NOT NULL,
            detection TEXT NOT NULL,
            image_url TEXT,
            created_at TEXT NOT NULL
        )",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_analysis_runs_date_display
         ON analysis_runs (date, display_id)",
    )
    .execute(pool)
    .await?;

    Ok(())
}
