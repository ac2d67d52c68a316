//! Cache resolution: anchoring the configuration to a project directory.

use crate::error::ConfigError;
use crate::types::{CaskConfig, LayoutMode};
use cask_common::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// A fully resolved cache configuration ready to build a cache layout from.
#[derive(Debug, Clone)]
pub struct ResolvedCache {
    /// Absolute (or project-anchored) cache root.
    pub root: PathBuf,
    /// Hidden import directory name under the root.
    pub import_dir: String,
    /// Extension of fingerprint side files.
    pub fingerprint_extension: String,
    /// Layout policy.
    pub layout: ResolvedLayout,
    /// Per-importer default options, converted to literal values.
    pub defaults: BTreeMap<String, BTreeMap<String, Value>>,
}

/// The layout policy with its parameters filled in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedLayout {
    /// Everything under the hidden import directory.
    Central,
    /// Sources mirrored into `<root>/<game>/<category>`.
    Namespaced {
        /// Game name, unsanitized.
        game: String,
        /// Asset category, unsanitized.
        category: String,
    },
}

/// Resolves a configuration against the directory it was loaded from.
///
/// A relative cache root is joined onto `project_dir`; an absolute one is kept.
/// The namespaced layout requires both `game` and `category`.
pub fn resolve_cache(config: &CaskConfig, project_dir: &Path) -> Result<ResolvedCache, ConfigError> {
    let root = Path::new(&config.cache.root);
    let root = if root.is_absolute() {
        root.to_path_buf()
    } else {
        project_dir.join(root)
    };

    let layout = match config.layout.mode {
        LayoutMode::Central => ResolvedLayout::Central,
        LayoutMode::Namespaced => ResolvedLayout::Namespaced {
            game: config
                .layout
                .game
                .clone()
                .ok_or_else(|| ConfigError::MissingField("layout.game".to_string()))?,
            category: config
                .layout
                .category
                .clone()
                .ok_or_else(|| ConfigError::MissingField("layout.category".to_string()))?,
        },
    };

    let defaults = config
        .defaults
        .iter()
        .map(|(importer, options)| {
            let options = options
                .iter()
                .map(|(name, value)| (name.clone(), toml_to_value(value)))
                .collect();
            (importer.clone(), options)
        })
        .collect();

    Ok(ResolvedCache {
        root,
        import_dir: config.cache.import_dir.clone(),
        fingerprint_extension: config.cache.fingerprint_extension.clone(),
        layout,
        defaults,
    })
}

/// Converts a TOML value into an option literal. Datetimes become strings.
fn toml_to_value(value: &toml::Value) -> Value {
    match value {
        toml::Value::String(s) => Value::String(s.clone()),
        toml::Value::Integer(i) => Value::Int(*i),
        toml::Value::Float(f) => Value::Float(*f),
        toml::Value::Boolean(b) => Value::Bool(*b),
        toml::Value::Datetime(dt) => Value::String(dt.to_string()),
        toml::Value::Array(items) => Value::Array(items.iter().map(toml_to_value).collect()),
        toml::Value::Table(table) => Value::Dictionary(
            table
                .iter()
                .map(|(k, v)| (k.clone(), toml_to_value(v)))
                .collect(),
        ),
    }
}
