//! The import orchestrator.
//!
//! [`ImportCache`] ties the cache layout, the importer registry, fingerprint
//! records and manifests together. One call decides whether the cached
//! conversion of a source is still valid and runs the importer when it is not.
//! Reads of prior state are fail-safe: a missing or broken manifest or
//! fingerprint record only leads to a reimport.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use cask_common::ContentHash;
use cask_config::ResolvedCache;
use tracing::debug;

use crate::error::ImportError;
use crate::fs::{copy_atomic, ensure_dir, ensure_parent};
use crate::hasher::{FingerprintRecord, SourceHasher};
use crate::importer::{Importer, ImporterRegistry, OptionMap};
use crate::layout::{manifest_beside, CacheLayout};
use crate::manifest::ImportManifest;
use crate::options::OptionLayers;

/// Importer preselected by [`ImportCache::import_texture`].
pub const TEXTURE_IMPORTER: &str = "texture";
/// Importer preselected by [`ImportCache::import_scene`].
pub const SCENE_IMPORTER: &str = "scene";
/// Importer preselected by [`ImportCache::import_audio`].
pub const AUDIO_IMPORTER: &str = "audio";

/// Outcome of an import call.
#[derive(Debug, Clone, PartialEq)]
pub enum ImportStatus {
    /// The importer ran and the manifest and fingerprint were rewritten.
    Imported(ImportReport),
    /// The cached conversion is still valid; nothing was touched.
    UpToDate,
    /// The asset is pinned with the `keep` importer; nothing was touched.
    Kept,
}

impl ImportStatus {
    /// The report of a real import.
    pub fn report(&self) -> Option<&ImportReport> {
        match self {
            ImportStatus::Imported(report) => Some(report),
            ImportStatus::UpToDate | ImportStatus::Kept => None,
        }
    }

    /// Returns `true` if the importer ran.
    pub fn is_imported(&self) -> bool {
        matches!(self, ImportStatus::Imported(_))
    }
}

/// What a real import wrote.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportReport {
    /// Importer that ran.
    pub importer: String,
    /// Manifest written.
    pub manifest_path: PathBuf,
    /// Converted artifacts recorded in the manifest.
    pub dest_files: Vec<PathBuf>,
    /// Extra files the importer reported.
    pub generated_files: Vec<PathBuf>,
    /// Fingerprint of the source that was imported.
    pub fingerprint: ContentHash,
}

/// Outcome of [`ImportCache::copy_file`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopyStatus {
    /// The file was copied and its fingerprint recorded.
    Copied,
    /// The destination already holds the current content.
    AlreadyUpToDate,
}

/// Freshness of a source relative to its last import.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    /// No fingerprint has been recorded for the source.
    NeverImported,
    /// The source changed since its last import.
    Stale,
    /// The source matches its last import.
    Fresh,
}

/// Where one import reads from and writes to.
struct Job<'a> {
    source: &'a Path,
    dest_stem: PathBuf,
    manifest_path: PathBuf,
    fingerprint: FingerprintRecord,
    importer: Option<&'a str>,
    mirror: Option<PathBuf>,
}

/// Fingerprint-gated asset import cache for one cache root.
pub struct ImportCache {
    layout: CacheLayout,
    registry: ImporterRegistry,
    defaults: BTreeMap<String, OptionMap>,
}

impl ImportCache {
    /// Creates a cache over `layout` using the importers in `registry`.
    pub fn new(layout: CacheLayout, registry: ImporterRegistry) -> Self {
        Self {
            layout,
            registry,
            defaults: BTreeMap::new(),
        }
    }

    /// Creates a cache from a resolved `cask.toml`, including its
    /// per-importer option defaults.
    pub fn from_config(resolved: &ResolvedCache, registry: ImporterRegistry) -> Self {
        Self {
            layout: CacheLayout::from_config(resolved),
            registry,
            defaults: resolved.defaults.clone(),
        }
    }

    /// Sets the configured default options of one importer.
    pub fn with_defaults(mut self, importer: impl Into<String>, options: OptionMap) -> Self {
        self.defaults.insert(importer.into(), options);
        self
    }

    /// The cache layout.
    pub fn layout(&self) -> &CacheLayout {
        &self.layout
    }

    /// The importer registry.
    pub fn registry(&self) -> &ImporterRegistry {
        &self.registry
    }

    /// Imports `source` into `<dest_stem>.<ext>` with the manifest at
    /// `<source>.import`.
    ///
    /// The importer is the one the previous manifest names, or else the one
    /// registered for the source's extension.
    pub fn import(
        &self,
        source: &Path,
        dest_stem: &Path,
        overrides: &OptionMap,
    ) -> Result<ImportStatus, ImportError> {
        require_source(source)?;
        self.run(
            Job {
                source,
                dest_stem: dest_stem.to_path_buf(),
                manifest_path: manifest_beside(source),
                fingerprint: FingerprintRecord::at(self.layout.fingerprint_path(source)),
                importer: None,
                mirror: None,
            },
            overrides,
        )
    }

    /// Imports `source` to the location the layout policy derives for it.
    ///
    /// With `importer` set, that importer is used regardless of extension or
    /// history. Under the namespaced policy the source is mirrored into the
    /// namespace directory and the manifest is written next to the mirror.
    pub fn import_asset(
        &self,
        source: &Path,
        importer: Option<&str>,
        overrides: &OptionMap,
    ) -> Result<ImportStatus, ImportError> {
        require_source(source)?;
        self.layout.ensure_layout()?;
        self.run(
            Job {
                source,
                dest_stem: self.layout.entry_stem(source),
                manifest_path: self.layout.manifest_path(source),
                fingerprint: FingerprintRecord::at(self.layout.fingerprint_path(source)),
                importer,
                mirror: self.layout.mirror_path(source),
            },
            overrides,
        )
    }

    /// Imports a texture with the `texture` importer.
    pub fn import_texture(&self, source: &Path) -> Result<ImportStatus, ImportError> {
        self.import_asset(source, Some(TEXTURE_IMPORTER), &OptionMap::new())
    }

    /// Imports a scene with the `scene` importer.
    pub fn import_scene(&self, source: &Path) -> Result<ImportStatus, ImportError> {
        self.import_asset(source, Some(SCENE_IMPORTER), &OptionMap::new())
    }

    /// Imports an audio clip with the `audio` importer.
    pub fn import_audio(&self, source: &Path) -> Result<ImportStatus, ImportError> {
        self.import_asset(source, Some(AUDIO_IMPORTER), &OptionMap::new())
    }

    /// Copies `from` to `to` unless `to` already holds the same content.
    ///
    /// The fingerprint of the copied content is recorded under the import
    /// directory, keyed by `to`, in a record separate from the import
    /// fingerprint of `to`: copying new content over a source never marks its
    /// import as current.
    pub fn copy_file(&self, from: &Path, to: &Path) -> Result<CopyStatus, ImportError> {
        require_source(from)?;
        ensure_dir(&self.layout.import_dir())?;

        let hash = SourceHasher::hash_file(from)?;
        let record = FingerprintRecord::at(self.layout.copy_record_path(to));
        if record.matches(&hash) && to.exists() {
            debug!(from = %from.display(), to = %to.display(), "copy is up to date");
            return Ok(CopyStatus::AlreadyUpToDate);
        }

        ensure_parent(to)?;
        copy_atomic(from, to)?;
        record.store(&hash)?;
        debug!(from = %from.display(), to = %to.display(), "copied");
        Ok(CopyStatus::Copied)
    }

    /// Compares the current fingerprint of `source` with the recorded one
    /// without importing anything.
    pub fn status(&self, source: &Path) -> Result<CacheStatus, ImportError> {
        require_source(source)?;
        let hash = SourceHasher::hash_file(source)?;
        let record = FingerprintRecord::at(self.layout.fingerprint_path(source));
        Ok(match record.load() {
            None => CacheStatus::NeverImported,
            Some(stored) if stored == hash => CacheStatus::Fresh,
            Some(_) => CacheStatus::Stale,
        })
    }

    fn run(&self, job: Job<'_>, overrides: &OptionMap) -> Result<ImportStatus, ImportError> {
        ensure_parent(&job.dest_stem)?;
        ensure_dir(&self.layout.import_dir())?;
        ensure_parent(&job.manifest_path)?;

        let prior = ImportManifest::load(&job.manifest_path);
        if prior.as_ref().is_some_and(ImportManifest::is_keep) {
            debug!(source = %job.source.display(), "asset is pinned, skipping import");
            return Ok(ImportStatus::Kept);
        }

        let importer = self.select_importer(job.source, job.importer, prior.as_ref())?;
        let name = importer.name();
        debug!(source = %job.source.display(), importer = name, "selected importer");

        let prior = prior.filter(|m| m.importer.as_deref() == Some(name));
        let persisted = prior.as_ref().map(ImportManifest::params_map);
        let params = OptionLayers {
            overrides: Some(overrides),
            persisted: persisted.as_ref(),
            configured: self.defaults.get(name),
        }
        .merge(&importer.options());

        let hash = SourceHasher::hash_file(job.source)?;
        if let Some(prior) = &prior {
            let outputs_present = prior
                .dest_files
                .iter()
                .chain(&prior.generated_files)
                .all(|p| Path::new(p).exists())
                && job.mirror.as_ref().map_or(true, |m| m.exists());
            if job.fingerprint.matches(&hash)
                && prior.params == params
                && prior.written_to(&job.dest_stem, importer.save_extension())
                && outputs_present
            {
                debug!(source = %job.source.display(), "import is up to date");
                return Ok(ImportStatus::UpToDate);
            }
        }

        if let Some(mirror) = &job.mirror {
            copy_atomic(job.source, mirror)?;
        }

        let options: OptionMap = params.iter().cloned().collect();
        let output = importer
            .import(job.source, &job.dest_stem, &options)
            .map_err(|source| ImportError::ImportFailed {
                importer: name.to_string(),
                source,
            })?;

        let manifest = ImportManifest::record(
            &importer.descriptor(),
            job.source,
            &job.dest_stem,
            &output,
            params,
        );
        manifest.save(&job.manifest_path)?;
        job.fingerprint.store(&hash)?;
        debug!(
            source = %job.source.display(),
            manifest = %job.manifest_path.display(),
            "wrote import manifest"
        );

        Ok(ImportStatus::Imported(ImportReport {
            importer: name.to_string(),
            dest_files: manifest.dest_paths(),
            generated_files: output.generated_files.iter().map(PathBuf::from).collect(),
            manifest_path: job.manifest_path,
            fingerprint: hash,
        }))
    }

    fn select_importer(
        &self,
        source: &Path,
        preselected: Option<&str>,
        prior: Option<&ImportManifest>,
    ) -> Result<&dyn Importer, ImportError> {
        if let Some(name) = preselected {
            return self
                .registry
                .get(name)
                .ok_or_else(|| ImportError::UnknownImporter {
                    name: name.to_string(),
                });
        }
        prior
            .and_then(|m| m.importer.as_deref())
            .and_then(|name| self.registry.get(name))
            .or_else(|| self.registry.for_path(source))
            .ok_or_else(|| ImportError::UnrecognizedFormat {
                path: source.to_path_buf(),
            })
    }
}

fn require_source(path: &Path) -> Result<(), ImportError> {
    if path.is_file() {
        Ok(())
    } else {
        Err(ImportError::NotFound {
            path: path.to_path_buf(),
        })
    }
}
