//! Configuration resolution for salesdash-ingest
//!
//! Priority: command line → environment (both via clap) → TOML file →
//! built-in defaults.

use std::path::PathBuf;

use clap::Parser;
use salesdash_common::config::{load_or_default, TomlConfig};
use salesdash_common::{Error, Result};

use crate::parser::CsvSchema;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Command-line arguments for salesdash-ingest
#[derive(Parser, Debug, Default, Clone)]
#[command(name = "salesdash-ingest")]
#[command(about = "Sales CSV ingestion and summary service")]
#[command(version)]
pub struct Args {
    /// TOML configuration file (default: <config dir>/salesdash/config.toml)
    #[arg(short, long, env = "SALESDASH_CONFIG")]
    pub config: Option<PathBuf>,

    /// Address to bind
    #[arg(long, env = "SALESDASH_HOST")]
    pub host: Option<String>,

    /// Port to listen on
    #[arg(short, long, env = "SALESDASH_PORT")]
    pub port: Option<u16>,

    /// Largest accepted upload in bytes
    #[arg(long, env = "SALESDASH_MAX_UPLOAD_BYTES")]
    pub max_upload_bytes: Option<usize>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "SALESDASH_LOG_LEVEL")]
    pub log_level: Option<String>,
}

/// Fully resolved service settings
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub host: String,
    pub port: u16,
    pub max_upload_bytes: usize,
    pub max_summaries: Option<usize>,
    pub schema: CsvSchema,
    pub log_level: String,
}

impl ServiceConfig {
    /// Read the TOML file named by `args` (or the platform default) and merge
    pub fn load(args: &Args) -> Result<Self> {
        let toml_config = load_or_default(args.config.as_deref())?;
        Self::resolve(args, toml_config)
    }

    /// Apply argument overrides on top of a TOML config and validate
    pub fn resolve(args: &Args, toml_config: TomlConfig) -> Result<Self> {
        let config = Self {
            host: args.host.clone().unwrap_or(toml_config.server.host),
            port: args.port.unwrap_or(toml_config.server.port),
            max_upload_bytes: args
                .max_upload_bytes
                .unwrap_or(toml_config.ingest.max_upload_bytes),
            max_summaries: toml_config.ingest.max_summaries,
            schema: CsvSchema::from_config(&toml_config.csv)?,
            log_level: args
                .log_level
                .clone()
                .unwrap_or(toml_config.logging.level)
                .to_ascii_lowercase(),
        };

        if config.max_upload_bytes == 0 {
            return Err(Error::Config(
                "max_upload_bytes must be greater than zero".to_string(),
            ));
        }
        if !LOG_LEVELS.contains(&config.log_level.as_str()) {
            return Err(Error::Config(format!(
                "Unknown log level '{}', expected one of: {}",
                config.log_level,
                LOG_LEVELS.join(", ")
            )));
        }

        Ok(config)
    }

    /// `host:port` for the TCP listener
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
