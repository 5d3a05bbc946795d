//! Configuration loading and data folder resolution

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

/// TOML configuration file contents
///
/// Lives at `~/.config/osa/<service>.toml`. All fields optional; the
/// database settings table takes priority over anything configured here.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TomlConfig {
    /// Data folder override (database location)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub root_folder: Option<String>,

    /// Google API key for the vision model
    #[serde(skip_serializing_if = "Option::is_none")]
    pub google_api_key: Option<String>,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Logging section of the TOML config
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter ("trace", "debug", "info", "warn", "error")
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Default configuration file path for a service
///
/// Linux/macOS/Windows: `<config dir>/osa/<service>.toml`
pub fn default_config_path(service: &str) -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("osa").join(format!("{}.toml", service)))
}

/// Load TOML configuration from a file
///
/// Returns `Ok(TomlConfig::default())` when the file does not exist;
/// parse failures are reported, not silently defaulted.
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    if !path.exists() {
        return Ok(TomlConfig::default());
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read TOML failed: {}", e)))?;
    toml::from_str(&content).map_err(|e| Error::Config(format!("Parse TOML failed: {}", e)))
}

/// Write TOML configuration to a file
///
/// Creates parent directories as needed. Writes to a sibling temp file and
/// renames over the target so a crash cannot leave a half-written config.
pub fn write_toml_config(config: &TomlConfig, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let content = toml::to_string_pretty(config)
        .map_err(|e| Error::Config(format!("Serialize TOML failed: {}", e)))?;

    let tmp_path = path.with_extension("toml.tmp");
    std::fs::write(&tmp_path, content)?;
    std::fs::rename(&tmp_path, path)?;

    Ok(())
}

/// Data folder resolution priority order:
/// 1. Explicit override (highest priority)
/// 2. Environment variable
/// 3. TOML config file `root_folder`
/// 4. OS-dependent compiled default (fallback)
pub fn resolve_data_folder(
    explicit: Option<&str>,
    env_var_name: &str,
    toml_config: Option<&TomlConfig>,
) -> PathBuf {
    // Priority 1: Explicit override
    if let Some(path) = explicit {
        info!("Using data folder from explicit override: {path}");
        return PathBuf::from(path);
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(env_var_name) {
        if !path.trim().is_empty() {
            info!("Using data folder from {env_var_name}: {path}");
            return PathBuf::from(path);
        }
    }

    // Priority 3: TOML config file
    if let Some(folder) = toml_config.and_then(|c| c.root_folder.as_deref()) {
        info!("Using data folder from TOML config: {folder}");
        return PathBuf::from(folder);
    }

    // Priority 4: OS-dependent compiled default
    default_data_folder()
}

/// OS-dependent default data folder path
fn default_data_folder() -> PathBuf {
    if cfg!(target_os = "linux") {
        // ~/.local/share/osa (or /var/lib/osa for system-wide)
        dirs::data_local_dir()
            .map(|d| d.join("osa"))
            .unwrap_or_else(|| PathBuf::from("/var/lib/osa"))
    } else if cfg!(target_os = "macos") {
        // ~/Library/Application Support/osa
        dirs::data_dir()
            .map(|d| d.join("osa"))
            .unwrap_or_else(|| PathBuf::from("/Library/Application Support/osa"))
    } else if cfg!(target_os = "windows") {
        // %LOCALAPPDATA%\osa
        dirs::data_local_dir()
            .map(|d| d.join("osa"))
            .unwrap_or_else(|| PathBuf::from("C:\\ProgramData\\osa"))
    } else {
        PathBuf::from("./osa_data")
    }
}

/// Create the data folder if missing
pub fn ensure_data_folder(folder: &Path) -> Result<()> {
    std::fs::create_dir_all(folder)?;
    Ok(())
}

/// Database file path within the data folder
pub fn database_path(folder: &Path) -> PathBuf {
    folder.join("osa.db")
}
