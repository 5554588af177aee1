// Configuration module for unistore
//
// Provides:
// - YAML configuration file loading
// - Environment variable substitution
// - Configuration validation
// - Default values
//
// Parsing is optional: drivers only need the typed structs, which callers
// may build in code.

pub mod types;
mod loader;

pub use types::*;
pub use loader::ConfigLoader;

use anyhow::{Context, Result};
use std::path::Path;

/// Load configuration from a YAML file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<UnistoreConfig> {
    ConfigLoader::load(path).context("Failed to load configuration")
}

/// Load configuration with environment variable overrides
pub fn load_config_with_env<P: AsRef<Path>>(path: P) -> Result<UnistoreConfig> {
    let mut config = load_config(path)?;

    // Allow environment variables to override config values
    if let Some(s3) = config.storage.backend_config.as_s3_mut() {
        if let Ok(access_key_id) = std::env::var("UNISTORE_ACCESS_KEY_ID") {
            s3.access_key_id = access_key_id;
        }

        if let Ok(access_key_secret) = std::env::var("UNISTORE_ACCESS_KEY_SECRET") {
            s3.access_key_secret = access_key_secret;
        }

        if let Ok(endpoint) = std::env::var("UNISTORE_ENDPOINT") {
            s3.endpoint = endpoint;
        }
    }

    if let Ok(root) = std::env::var("UNISTORE_ROOT") {
        if let Some(filesystem) = config.storage.backend_config.as_filesystem_mut() {
            filesystem.root = root;
        }
    }

    ConfigLoader::validate(&config).context("Invalid configuration after environment overrides")?;

    Ok(config)
}
