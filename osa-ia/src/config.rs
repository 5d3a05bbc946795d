//! Service configuration
//!
//! The Google API key can arrive from three places, resolved in priority
//! order: the settings table, the `OSA_GOOGLE_API_KEY` environment
//! variable, then the TOML config file. A key found outside the database
//! is migrated into it on first use, so the settings API becomes the
//! single source of truth afterwards.

use std::path::PathBuf;

use osa_common::config::{default_config_path, load_toml_config, write_toml_config, TomlConfig};
use osa_common::{Error, Result};
use sqlx::sqlite::SqlitePool;
use tracing::{info, warn};

use crate::db;

pub const SERVICE_NAME: &str = "osa-ia";

pub const ENV_GOOGLE_API_KEY: &str = "OSA_GOOGLE_API_KEY";
pub const ENV_DATA_FOLDER: &str = "OSA_DATA_FOLDER";
pub const ENV_CONFIG_PATH: &str = "OSA_CONFIG_PATH";
pub const ENV_PORT: &str = "OSA_IA_PORT";

pub const DEFAULT_PORT: u16 = 8520;

/// Path of this service's TOML config file
///
/// `OSA_CONFIG_PATH` overrides the per-user default location; with no
/// config directory available at all, a file in the working directory is
/// used.
pub fn toml_config_path() -> PathBuf {
    if let Ok(path) = std::env::var(ENV_CONFIG_PATH) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }
    default_config_path(SERVICE_NAME).unwrap_or_else(|| PathBuf::from("osa-ia.toml"))
}

pub fn load_service_config() -> Result<TomlConfig> {
    load_toml_config(&toml_config_path())
}

/// Listen port: `OSA_IA_PORT` when set and parseable, else 8520
pub fn resolve_port() -> u16 {
    std::env::var(ENV_PORT)
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(DEFAULT_PORT)
}

fn is_valid_key(key: &str) -> bool {
    !key.trim().is_empty()
}

/// Resolve the Google API key from database, environment, or TOML
///
/// When more than one source holds a key, a warning names them and the
/// database wins. Keys coming from the environment or TOML are written
/// into the settings table before being returned.
///
/// # Errors
///
/// `Error::Config` with setup guidance when no source has a key.
pub async fn resolve_google_api_key(
    pool: &SqlitePool,
    toml_config: &TomlConfig,
) -> Result<String> {
    let db_key = db::settings::get_google_api_key(pool)
        .await?
        .filter(|k| is_valid_key(k));
    let env_key = std::env::var(ENV_GOOGLE_API_KEY)
        .ok()
        .filter(|k| is_valid_key(k));
    let toml_key = toml_config
        .google_api_key
        .clone()
        .filter(|k| is_valid_key(k));

    let mut sources = Vec::new();
    if db_key.is_some() {
        sources.push("database");
    }
    if env_key.is_some() {
        sources.push("environment");
    }
    if toml_key.is_some() {
        sources.push("TOML config");
    }
    if sources.len() > 1 {
        warn!(
            "Google API key present in multiple sources ({}); {} takes priority",
            sources.join(", "),
            sources[0]
        );
    }

    if let Some(key) = db_key {
        info!("Using Google API key from database");
        return Ok(key);
    }

    if let Some(key) = env_key {
        info!("Using Google API key from {ENV_GOOGLE_API_KEY}; migrating to database");
        db::settings::set_google_api_key(pool, &key).await?;
        return Ok(key);
    }

    if let Some(key) = toml_key {
        info!("Using Google API key from TOML config; migrating to database");
        db::settings::set_google_api_key(pool, &key).await?;
        return Ok(key);
    }

    Err(Error::Config(format!(
        "No Google API key configured. Store one via POST /api/settings/google_api_key, \
         set {ENV_GOOGLE_API_KEY}, or add google_api_key to {}. \
         Keys are issued at https://aistudio.google.com/app/apikey",
        toml_config_path().display()
    )))
}

/// Mirror the stored key into the TOML file
///
/// Keeps hand-editing the file a working configuration path. Callers treat
/// failures as non-fatal; the database copy is authoritative.
pub fn sync_key_to_toml(api_key: &str) -> Result<()> {
    let path = toml_config_path();
    let mut config = load_toml_config(&path)?;
    config.google_api_key = Some(api_key.to_string());
    write_toml_config(&config, &path)
}
