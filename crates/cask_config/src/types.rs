//! Configuration types deserialized from `cask.toml`.

use serde::Deserialize;
use std::collections::BTreeMap;

/// Default name of the hidden directory holding artifacts and fingerprints.
pub const DEFAULT_IMPORT_DIR: &str = ".import";

/// Default extension of fingerprint side files.
pub const DEFAULT_FINGERPRINT_EXTENSION: &str = "md5";

/// The top-level configuration parsed from `cask.toml`.
#[derive(Debug, Deserialize)]
pub struct CaskConfig {
    /// Cache location and file naming.
    pub cache: CacheSection,
    /// How imported assets are laid out under the cache root.
    #[serde(default)]
    pub layout: LayoutSection,
    /// Per-importer default option overrides, keyed by importer name.
    ///
    /// These replace importer-declared defaults but yield to values
    /// persisted in a manifest and to call-time overrides.
    #[serde(default)]
    pub defaults: BTreeMap<String, BTreeMap<String, toml::Value>>,
}

impl CaskConfig {
    /// Creates a central-layout configuration rooted at `root`.
    pub fn with_root(root: impl Into<String>) -> Self {
        Self {
            cache: CacheSection {
                root: root.into(),
                import_dir: default_import_dir(),
                fingerprint_extension: default_fingerprint_extension(),
            },
            layout: LayoutSection::default(),
            defaults: BTreeMap::new(),
        }
    }
}

/// The `[cache]` table.
#[derive(Debug, Deserialize)]
pub struct CacheSection {
    /// Cache root directory. Relative paths resolve against the project directory.
    pub root: String,
    /// Name of the hidden directory under the root for artifacts and fingerprints.
    #[serde(default = "default_import_dir")]
    pub import_dir: String,
    /// Extension given to fingerprint side files.
    #[serde(default = "default_fingerprint_extension")]
    pub fingerprint_extension: String,
}

fn default_import_dir() -> String {
    DEFAULT_IMPORT_DIR.to_string()
}

fn default_fingerprint_extension() -> String {
    DEFAULT_FINGERPRINT_EXTENSION.to_string()
}

/// The `[layout]` table.
#[derive(Debug, Default, Deserialize)]
pub struct LayoutSection {
    /// Layout policy.
    #[serde(default)]
    pub mode: LayoutMode,
    /// Game name for the namespaced layout.
    #[serde(default)]
    pub game: Option<String>,
    /// Asset category (e.g. "textures") for the namespaced layout.
    #[serde(default)]
    pub category: Option<String>,
}

/// Where imported assets and their manifests are placed.
#[derive(Debug, Default, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum LayoutMode {
    /// Everything lives under the hidden import directory (default).
    #[default]
    Central,
    /// Sources are mirrored into `<root>/<game>/<category>` with their manifests.
    Namespaced,
}
