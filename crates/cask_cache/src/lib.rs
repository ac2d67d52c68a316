//! Content-fingerprint-gated asset import cache.
//!
//! This crate decides whether a cached conversion of a source asset is still
//! valid, runs an [`Importer`] when it is not, and writes a manifest that a
//! downstream loader reads to find the converted artifacts. The [`ImportCache`]
//! ties together the [`CacheLayout`], the [`ImporterRegistry`], fingerprint side
//! files, and the [`ImportManifest`] format.

#![warn(missing_docs)]

pub mod cache;
pub mod error;
pub mod fs;
pub mod hasher;
pub mod importer;
pub mod layout;
pub mod manifest;
pub mod options;

pub use cache::{
    CacheStatus, CopyStatus, ImportCache, ImportReport, ImportStatus, AUDIO_IMPORTER,
    SCENE_IMPORTER, TEXTURE_IMPORTER,
};
pub use error::ImportError;
pub use hasher::{FingerprintRecord, SourceHasher};
pub use importer::{
    ImportOption, ImportOutput, Importer, ImporterDescriptor, ImporterError, ImporterRegistry,
    OptionMap,
};
pub use layout::{manifest_beside, sanitize_segment, CacheLayout, LayoutPolicy, Namespace};
pub use manifest::{ImportManifest, OutputPath, KEEP_IMPORTER, MANIFEST_EXTENSION};
pub use options::OptionLayers;
