//! TOML bootstrap configuration
//!
//! Settings are read once at startup; changes require a restart. The file is
//! optional: a missing default file logs a warning and built-in defaults are
//! used. An explicitly requested file that cannot be read is an error.
//!
//! Priority (resolved by the service crate):
//! 1. Command-line arguments
//! 2. Environment variables
//! 3. TOML configuration file
//! 4. Built-in defaults

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Name of the application folder under the platform config directory
pub const APP_DIR_NAME: &str = "salesdash";

/// Bootstrap configuration loaded from TOML file
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct TomlConfig {
    pub server: ServerConfig,
    pub ingest: IngestConfig,
    pub csv: CsvConfig,
    pub logging: LoggingConfig,
}

/// HTTP listener settings
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

/// Upload limits
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct IngestConfig {
    /// Largest accepted CSV payload in bytes
    pub max_upload_bytes: usize,

    /// Upper bound on stored summaries (unbounded when absent)
    pub max_summaries: Option<usize>,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            max_upload_bytes: 10 * 1024 * 1024,
            max_summaries: None,
        }
    }
}

/// CSV header schema and delimiter
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct CsvConfig {
    pub delimiter: char,
    pub product_column: String,
    pub quantity_column: String,
    pub unit_price_column: String,
}

impl Default for CsvConfig {
    fn default() -> Self {
        Self {
            delimiter: ',',
            product_column: "productName".to_string(),
            quantity_column: "quantity".to_string(),
            unit_price_column: "pricePerUnit".to_string(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Platform default location: `<config_dir>/salesdash/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(APP_DIR_NAME).join("config.toml"))
}

/// Parse a TOML configuration file
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)?;
    let config = toml::from_str(&content)?;
    info!("Loaded TOML configuration from {}", path.display());
    Ok(config)
}

/// Load configuration with graceful degradation
///
/// `explicit` is a path the operator asked for (CLI or ENV); it must exist.
/// Without it the platform default is tried and silently skipped when absent.
pub fn load_or_default(explicit: Option<&Path>) -> Result<TomlConfig> {
    if let Some(path) = explicit {
        if !path.exists() {
            return Err(Error::Config(format!(
                "Config file not found: {}",
                path.display()
            )));
        }
        return load_toml_config(path);
    }

    match default_config_path() {
        Some(path) if path.exists() => load_toml_config(&path),
        Some(path) => {
            warn!(
                "No config file at {}, using built-in defaults",
                path.display()
            );
            Ok(TomlConfig::default())
        }
        None => {
            warn!("Could not determine config directory, using built-in defaults");
            Ok(TomlConfig::default())
        }
    }
}
