//! Configuration loading functionality.
//!
//! Resolves the configuration path, creates a default file on first run and
//! turns file contents into a validated [`Configuration`].

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use super::{Config, Configuration};
use crate::common::utils::private_path;

pub const CONFIG_FILE_NAME: &str = "prayertimes.toml";

/// Global configuration directory, set once at startup
static CONFIG_DIR: OnceLock<Option<PathBuf>> = OnceLock::new();

/// Set the configuration directory for the current process.
/// This can only be called once, typically at startup.
/// Returns an error if already set.
pub fn set_config_dir(dir: Option<String>) -> Result<()> {
    CONFIG_DIR
        .set(dir.map(PathBuf::from))
        .map_err(|_| anyhow::anyhow!("Configuration directory already set"))
}

/// Get the custom configuration directory if one was set.
/// Returns None if using the default directory.
pub fn get_custom_config_dir() -> Option<PathBuf> {
    CONFIG_DIR.get().and_then(|d| d.clone())
}

/// Path of the configuration file: `<custom dir>/prayertimes.toml` when
/// `--config` was given, otherwise `$XDG_CONFIG_HOME/prayertimes/prayertimes.toml`.
pub fn get_config_path() -> Result<PathBuf> {
    if let Some(custom_dir) = get_custom_config_dir() {
        return Ok(custom_dir.join(CONFIG_FILE_NAME));
    }

    let config_dir = dirs::config_dir().context("Could not determine config directory")?;
    Ok(config_dir.join("prayertimes").join(CONFIG_FILE_NAME))
}

/// Load configuration using automatic path detection.
///
/// Creates a default configuration file if none exists.
pub fn load() -> Result<Configuration> {
    let config_path = get_config_path()?;

    if !config_path.exists() {
        log_block_start!(
            "Creating default configuration at {}",
            private_path(&config_path)
        );
        super::builder::create_default_config(&config_path)
            .context("Failed to create default config during load")?;
    }

    load_from_path(&config_path)
}

/// Load configuration from a specific path.
///
/// Does NOT create a default config if the path doesn't exist.
pub fn load_from_path(path: &Path) -> Result<Configuration> {
    if !path.exists() {
        anyhow::bail!("Configuration file not found at {}", private_path(path));
    }

    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config from {}", private_path(path)))?;

    parse_configuration(&content)
        .with_context(|| format!("Invalid configuration in {}", private_path(path)))
}

/// Parse and validate TOML configuration text.
pub fn parse_configuration(content: &str) -> Result<Configuration> {
    let config = Config::from_toml(content).context("Failed to parse config")?;
    Ok(config.resolve()?)
}
