// Configuration module for the MQTT status plugin
//
// Provides:
// - Parsing of the plugin section the host hands over as JSON
// - YAML/JSON file loading for the check tool
// - Environment variable substitution
// - Configuration validation
// - Default values

pub mod types;
mod loader;

pub use types::*;
pub use loader::ConfigLoader;

use anyhow::{Context, Result};
use std::path::Path;

/// Load configuration from a YAML or JSON file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<StatusPluginConfig> {
    ConfigLoader::load(path).context("Failed to load configuration")
}

/// Load configuration with environment variable overrides
pub fn load_config_with_env<P: AsRef<Path>>(path: P) -> Result<StatusPluginConfig> {
    let mut config = load_config(path)?;

    // Allow environment variables to override config values
    if let Ok(broker) = std::env::var("TR_STATUS_BROKER") {
        config.broker = broker;
    }

    if let Ok(username) = std::env::var("TR_STATUS_USERNAME") {
        config.username = username;
    }

    if let Ok(password) = std::env::var("TR_STATUS_PASSWORD") {
        config.password = password;
    }

    Ok(config)
}
