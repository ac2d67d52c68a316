//! Configuration file loading and validation.

use crate::error::ConfigError;
use crate::types::{CaskConfig, LayoutMode};
use std::path::Path;

/// File name of the configuration inside a project directory.
pub const CONFIG_FILE: &str = "cask.toml";

/// Loads and validates a `cask.toml` configuration from a project directory.
///
/// Reads `<project_dir>/cask.toml`, parses it, and validates required fields.
pub fn load_config(project_dir: &Path) -> Result<CaskConfig, ConfigError> {
    let config_path = project_dir.join(CONFIG_FILE);
    let content = std::fs::read_to_string(&config_path)?;
    load_config_from_str(&content)
}

/// Parses and validates a `cask.toml` configuration from a string.
///
/// Useful for testing without filesystem dependencies.
pub fn load_config_from_str(content: &str) -> Result<CaskConfig, ConfigError> {
    let config: CaskConfig =
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
    validate_config(&config)?;
    Ok(config)
}

/// Validates that required fields are present and values are usable as path components.
fn validate_config(config: &CaskConfig) -> Result<(), ConfigError> {
    if config.cache.root.is_empty() {
        return Err(ConfigError::MissingField("cache.root".to_string()));
    }
    if !is_single_segment(&config.cache.import_dir) {
        return Err(ConfigError::ValidationError(format!(
            "cache.import_dir '{}' must be a single directory name",
            config.cache.import_dir
        )));
    }
    let ext = &config.cache.fingerprint_extension;
    if ext.is_empty() || ext.contains('.') || !is_single_segment(ext) {
        return Err(ConfigError::ValidationError(format!(
            "cache.fingerprint_extension '{ext}' must be a bare extension"
        )));
    }
    if config.layout.mode == LayoutMode::Namespaced {
        if config.layout.game.as_deref().unwrap_or("").is_empty() {
            return Err(ConfigError::MissingField("layout.game".to_string()));
        }
        if config.layout.category.as_deref().unwrap_or("").is_empty() {
            return Err(ConfigError::MissingField("layout.category".to_string()));
        }
    }
    Ok(())
}

fn is_single_segment(name: &str) -> bool {
    !name.is_empty() && name != "." && name != ".." && !name.contains(['/', '\\', ':'])
}
