//! On-disk layout of the import cache.
//!
//! ```text
//! <root>/
//!   .import/                       hidden import directory
//!     <file>-<pathhash>.<ext>      artifacts written by importers
//!     <file>-<pathhash>.md5        fingerprint side files
//!     <file>-<pathhash>.copy.md5   copy records
//!     <file>-<pathhash>.import     manifests (central policy)
//!   <game>/<category>/             namespaced policy only
//!     <file>                       mirrored source
//!     <file>.import                manifest
//! ```

use std::ffi::OsString;
use std::path::{Component, Path, PathBuf};

use cask_common::ContentHash;
use cask_config::{ResolvedCache, ResolvedLayout, DEFAULT_FINGERPRINT_EXTENSION, DEFAULT_IMPORT_DIR};

use crate::error::ImportError;
use crate::fs::ensure_dir;
use crate::manifest::MANIFEST_EXTENSION;

const COPY_RECORD_TAG: &str = "copy";

/// Makes a caller-supplied string safe to use as one path segment.
///
/// Path separators and drive colons become `_`. A result that would still
/// name the current or parent directory (or nothing) has its dots replaced
/// too, so `..` becomes `__` and `../../etc` becomes `.._.._etc`.
pub fn sanitize_segment(raw: &str) -> String {
    let replaced: String = raw
        .chars()
        .map(|c| if matches!(c, '/' | '\\' | ':') { '_' } else { c })
        .collect();
    match replaced.as_str() {
        "" => "_".to_string(),
        "." | ".." => replaced.replace('.', "_"),
        _ => replaced,
    }
}

/// A (game, category) pair naming a subtree of the cache root.
///
/// Both components are sanitized on construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Namespace {
    game: String,
    category: String,
}

impl Namespace {
    /// Creates a namespace, sanitizing both components.
    pub fn new(game: &str, category: &str) -> Self {
        Self {
            game: sanitize_segment(game),
            category: sanitize_segment(category),
        }
    }

    /// The sanitized game segment.
    pub fn game(&self) -> &str {
        &self.game
    }

    /// The sanitized category segment.
    pub fn category(&self) -> &str {
        &self.category
    }

    /// `<game>/<category>` relative to the cache root.
    pub fn relative_dir(&self) -> PathBuf {
        Path::new(&self.game).join(&self.category)
    }
}

/// Where policy-driven imports put their manifests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LayoutPolicy {
    /// Artifacts, manifests and fingerprints all live in the hidden import directory.
    Central,
    /// Sources are mirrored into `<root>/<game>/<category>`, with the manifest
    /// beside the mirror. Artifacts and fingerprints stay in the import directory.
    Namespaced(Namespace),
}

/// Path derivation and directory creation for one cache root.
#[derive(Debug, Clone)]
pub struct CacheLayout {
    root: PathBuf,
    import_dir: String,
    fingerprint_extension: String,
    policy: LayoutPolicy,
}

impl CacheLayout {
    /// Creates a layout with the default import directory and fingerprint extension.
    pub fn new(root: impl Into<PathBuf>, policy: LayoutPolicy) -> Self {
        Self {
            root: root.into(),
            import_dir: DEFAULT_IMPORT_DIR.to_string(),
            fingerprint_extension: DEFAULT_FINGERPRINT_EXTENSION.to_string(),
            policy,
        }
    }

    /// Builds the layout described by a resolved configuration.
    pub fn from_config(resolved: &ResolvedCache) -> Self {
        let policy = match &resolved.layout {
            ResolvedLayout::Central => LayoutPolicy::Central,
            ResolvedLayout::Namespaced { game, category } => {
                LayoutPolicy::Namespaced(Namespace::new(game, category))
            }
        };
        Self {
            root: resolved.root.clone(),
            import_dir: sanitize_segment(&resolved.import_dir),
            fingerprint_extension: resolved.fingerprint_extension.clone(),
            policy,
        }
    }

    /// The cache root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The layout policy.
    pub fn policy(&self) -> &LayoutPolicy {
        &self.policy
    }

    /// The hidden import directory, `<root>/.import` by default.
    pub fn import_dir(&self) -> PathBuf {
        self.root.join(&self.import_dir)
    }

    /// `<root>/<game>/<category>` under the namespaced policy.
    pub fn namespace_dir(&self) -> Option<PathBuf> {
        match &self.policy {
            LayoutPolicy::Central => None,
            LayoutPolicy::Namespaced(ns) => Some(self.root.join(ns.relative_dir())),
        }
    }

    /// Creates the directories this layout writes into.
    ///
    /// Existing directories are fine. Returns the directory that receives
    /// manifests for policy-driven imports: the namespace directory, or the
    /// import directory under the central policy.
    pub fn ensure_layout(&self) -> Result<PathBuf, ImportError> {
        let import_dir = self.import_dir();
        ensure_dir(&import_dir)?;
        match self.namespace_dir() {
            Some(dir) => {
                ensure_dir(&dir)?;
                Ok(dir)
            }
            None => Ok(import_dir),
        }
    }

    /// Unique flat-namespace name for `path`: `<file_name>-<hash of the path>`.
    ///
    /// The key depends on the path, not on the content, so it is stable across
    /// edits; the manifest and fingerprint rewrite is what signals a change.
    pub fn entry_basename(path: &Path) -> String {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "asset".to_string());
        let path_hash = ContentHash::from_bytes(path.to_string_lossy().as_bytes());
        format!("{}-{path_hash}", sanitize_segment(&file_name))
    }

    /// Destination stem handed to importers for policy-driven imports.
    pub fn entry_stem(&self, source: &Path) -> PathBuf {
        self.import_dir().join(Self::entry_basename(source))
    }

    /// Location of the fingerprint side file for `path`.
    pub fn fingerprint_path(&self, path: &Path) -> PathBuf {
        with_suffix(&self.entry_stem(path), &self.fingerprint_extension)
    }

    /// Location of the fingerprint record kept by `copy_file` for the copy
    /// destination `path`: `<entry_stem>.copy.<fingerprint_extension>`.
    ///
    /// Copy records never share a file with import records, so copying new
    /// content over a source cannot mark its import as current.
    pub fn copy_record_path(&self, path: &Path) -> PathBuf {
        let stem = with_suffix(&self.entry_stem(path), COPY_RECORD_TAG);
        with_suffix(&stem, &self.fingerprint_extension)
    }

    /// Location of the manifest for a policy-driven import of `source`.
    pub fn manifest_path(&self, source: &Path) -> PathBuf {
        match self.mirror_path(source) {
            Some(mirror) => manifest_beside(&mirror),
            None => with_suffix(&self.entry_stem(source), MANIFEST_EXTENSION),
        }
    }

    /// Where the namespaced policy mirrors `source`; `None` under the central policy.
    pub fn mirror_path(&self, source: &Path) -> Option<PathBuf> {
        let dir = self.namespace_dir()?;
        let file_name = source
            .file_name()
            .map(|n| sanitize_segment(&n.to_string_lossy()))
            .unwrap_or_else(|| "asset".to_string());
        Some(dir.join(file_name))
    }

    /// Returns `true` if `path` lies under the cache root, judged lexically.
    pub fn contains(&self, path: &Path) -> bool {
        match path.strip_prefix(&self.root) {
            Ok(rest) => rest
                .components()
                .all(|c| matches!(c, Component::Normal(_) | Component::CurDir)),
            Err(_) => false,
        }
    }
}

/// The colocated manifest path for `path`: `<path>.import`.
pub fn manifest_beside(path: &Path) -> PathBuf {
    with_suffix(path, MANIFEST_EXTENSION)
}

/// Appends `.<suffix>` to the full file name of `path`.
fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".");
    name.push(suffix);
    PathBuf::from(name)
}
