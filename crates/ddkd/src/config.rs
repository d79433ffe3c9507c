//! Config file loading
//!
//! The daemon reads one TOML file with a `[global]` table and any number of
//! `[[record]]` tables. See `ddk_core::config` for the field list.

use anyhow::{Context, Result};
use ddk_core::DdkConfig;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tracing::Level;

/// Config path used when neither `--config` nor `DDK_CONFIG` is given
pub const DEFAULT_CONFIG_PATH: &str = "/etc/ddk/config.toml";

/// Environment variable naming the config file
pub const CONFIG_ENV: &str = "DDK_CONFIG";

/// Pick the config path: a non-empty `DDK_CONFIG` beats `--config`
pub fn resolve_config_path(flag: Option<PathBuf>, env: Option<OsString>) -> PathBuf {
    match env {
        Some(path) if !path.is_empty() => PathBuf::from(path),
        _ => flag.unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH)),
    }
}

/// Read, parse and validate the config file at `path`
pub fn load_config(path: &Path) -> Result<DdkConfig> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;

    parse_config(&text).with_context(|| format!("Invalid config file {}", path.display()))
}

/// Parse and validate TOML config text
pub fn parse_config(text: &str) -> Result<DdkConfig> {
    let config: DdkConfig = toml::from_str(text)?;
    config.validate()?;
    Ok(config)
}

/// Map a `--log-level` value to a tracing level
pub fn parse_log_level(level: &str) -> Result<Level> {
    match level.trim().to_lowercase().as_str() {
        "trace" => Ok(Level::TRACE),
        "debug" => Ok(Level::DEBUG),
        "info" => Ok(Level::INFO),
        "warn" => Ok(Level::WARN),
        "error" => Ok(Level::ERROR),
        _ => anyhow::bail!(
            "Log level '{}' is not valid. \
            Valid levels: trace, debug, info, warn, error",
            level
        ),
    }
}
