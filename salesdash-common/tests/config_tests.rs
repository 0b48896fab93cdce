//! Tests for TOML configuration loading and graceful degradation
//!
//! Tests that manipulate XDG_CONFIG_HOME are marked with #[serial] so they
//! never observe each other's environment.

use salesdash_common::config::{load_or_default, load_toml_config, TomlConfig};
use salesdash_common::Error;
use serial_test::serial;
use std::fs;
use tempfile::TempDir;

const FULL_CONFIG: &str = r#"
[server]
host = "0.0.0.0"
port = 9090

[ingest]
max_upload_bytes = 2048
max_summaries = 50

[csv]
delimiter = ";"
product_column = "item"
quantity_column = "qty"
unit_price_column = "price"

[logging]
level = "debug"
"#;

#[test]
fn test_load_full_config() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(&path, FULL_CONFIG).unwrap();

    let config = load_toml_config(&path).unwrap();

    assert_eq!(config.server.host, "0.0.0.0");
    assert_eq!(config.server.port, 9090);
    assert_eq!(config.ingest.max_upload_bytes, 2048);
    assert_eq!(config.ingest.max_summaries, Some(50));
    assert_eq!(config.csv.delimiter, ';');
    assert_eq!(config.csv.product_column, "item");
    assert_eq!(config.csv.quantity_column, "qty");
    assert_eq!(config.csv.unit_price_column, "price");
    assert_eq!(config.logging.level, "debug");
}

#[test]
fn test_explicit_missing_file_is_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("does-not-exist.toml");

    let err = load_or_default(Some(&path)).unwrap_err();
    assert!(matches!(err, Error::Config(_)));
    assert!(err.to_string().contains("Config file not found"));
}

#[test]
fn test_unreadable_config_is_io_error() {
    let dir = TempDir::new().unwrap();

    // A directory exists but cannot be read as a file
    let err = load_or_default(Some(dir.path())).unwrap_err();
    assert!(matches!(err, Error::Io(_)), "got: {err}");
}

#[test]
fn test_malformed_toml_is_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(&path, "[server\nport = ").unwrap();

    assert!(load_toml_config(&path).is_err());
}

#[cfg(target_os = "linux")]
#[test]
#[serial]
fn test_missing_default_file_uses_defaults() {
    let dir = TempDir::new().unwrap();
    std::env::set_var("XDG_CONFIG_HOME", dir.path());

    let config = load_or_default(None).unwrap();
    assert_eq!(config, TomlConfig::default());

    std::env::remove_var("XDG_CONFIG_HOME");
}

#[cfg(target_os = "linux")]
#[test]
#[serial]
fn test_default_file_is_picked_up() {
    let dir = TempDir::new().unwrap();
    let app_dir = dir.path().join("salesdash");
    fs::create_dir_all(&app_dir).unwrap();
    fs::write(app_dir.join("config.toml"), "[server]\nport = 7070\n").unwrap();
    std::env::set_var("XDG_CONFIG_HOME", dir.path());

    let config = load_or_default(None).unwrap();
    assert_eq!(config.server.port, 7070);

    std::env::remove_var("XDG_CONFIG_HOME");
}
