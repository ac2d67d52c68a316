//! The importer capability and the registry the cache selects importers from.
//!
//! Format-specific conversion (texture compression, scene conversion, audio
//! decoding) lives behind the [`Importer`] trait. The cache only calls it and
//! trusts the result.

use std::collections::BTreeMap;
use std::path::Path;

use cask_common::Value;

/// Option values keyed by option name.
pub type OptionMap = BTreeMap<String, Value>;

/// The error type importers report failures with. It is passed to the caller
/// unchanged inside [`ImportError::ImportFailed`](crate::ImportError::ImportFailed).
pub type ImporterError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// A declared importer option with its default value.
#[derive(Clone, Debug, PartialEq)]
pub struct ImportOption {
    /// Option name, used as the key in the manifest's `[params]` section.
    pub name: String,
    /// Value used when neither the caller, a prior manifest, nor the
    /// configuration supplies one.
    pub default: Value,
}

impl ImportOption {
    /// Declares an option.
    pub fn new(name: impl Into<String>, default: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            default: default.into(),
        }
    }
}

/// What an importer produced.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ImportOutput {
    /// Variant tags of the outputs written. Empty means a single output at
    /// `<dest_stem>.<save_extension>`; otherwise one output per tag at
    /// `<dest_stem>.<tag>.<save_extension>`.
    pub variants: Vec<String>,
    /// Paths of extra files generated alongside the outputs. A missing one
    /// makes the next import run again.
    pub generated_files: Vec<String>,
    /// Opaque metadata for the loader.
    pub metadata: Option<Value>,
}

impl ImportOutput {
    /// An output with no variants, side files, or metadata.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a variant tag.
    pub fn with_variant(mut self, variant: impl Into<String>) -> Self {
        self.variants.push(variant.into());
        self
    }

    /// Adds a generated side file.
    pub fn with_generated_file(mut self, file: impl Into<String>) -> Self {
        self.generated_files.push(file.into());
        self
    }

    /// Sets the metadata.
    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// Static metadata describing an importer.
#[derive(Clone, Debug, PartialEq)]
pub struct ImporterDescriptor {
    /// Importer name as recorded in manifests.
    pub name: String,
    /// Resource type of the outputs; empty if unspecified.
    pub resource_type: String,
    /// Extension of the outputs; empty means no output path is recorded.
    pub save_extension: String,
    /// Source file extensions this importer handles, without dots.
    pub extensions: Vec<String>,
    /// Declared options in declaration order.
    pub options: Vec<ImportOption>,
}

/// A converter from one family of source formats to a runtime format.
pub trait Importer {
    /// Importer name as recorded in manifests.
    fn name(&self) -> &str;

    /// Resource type of the outputs. Empty means none is recorded.
    fn resource_type(&self) -> &str {
        ""
    }

    /// Extension of the outputs, without the dot. Empty means the importer
    /// writes no primary output at `dest_stem`.
    fn save_extension(&self) -> &str;

    /// Source extensions (without dots) this importer handles.
    fn recognized_extensions(&self) -> Vec<String>;

    /// Declared options in declaration order.
    fn options(&self) -> Vec<ImportOption> {
        Vec::new()
    }

    /// Converts `source`, writing outputs next to `dest_stem`.
    fn import(
        &self,
        source: &Path,
        dest_stem: &Path,
        options: &OptionMap,
    ) -> Result<ImportOutput, ImporterError>;

    /// Collects the static metadata of this importer.
    fn descriptor(&self) -> ImporterDescriptor {
        ImporterDescriptor {
            name: self.name().to_string(),
            resource_type: self.resource_type().to_string(),
            save_extension: self.save_extension().to_string(),
            extensions: self.recognized_extensions(),
            options: self.options(),
        }
    }
}

/// An explicit, caller-constructed set of importers.
#[derive(Default)]
pub struct ImporterRegistry {
    importers: Vec<Box<dyn Importer>>,
}

impl ImporterRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an importer. Earlier registrations win extension lookups.
    pub fn register(&mut self, importer: impl Importer + 'static) -> &mut Self {
        self.importers.push(Box::new(importer));
        self
    }

    /// Adds an importer, builder style.
    pub fn with(mut self, importer: impl Importer + 'static) -> Self {
        self.register(importer);
        self
    }

    /// Looks an importer up by name.
    pub fn get(&self, name: &str) -> Option<&dyn Importer> {
        self.importers
            .iter()
            .find(|i| i.name() == name)
            .map(|i| &**i)
    }

    /// Finds the first importer handling `extension`, ignoring ASCII case.
    pub fn for_extension(&self, extension: &str) -> Option<&dyn Importer> {
        self.importers
            .iter()
            .find(|i| {
                i.recognized_extensions()
                    .iter()
                    .any(|e| e.eq_ignore_ascii_case(extension))
            })
            .map(|i| &**i)
    }

    /// Finds the importer for a path by its extension.
    pub fn for_path(&self, path: &Path) -> Option<&dyn Importer> {
        let ext = path.extension()?.to_str()?;
        self.for_extension(ext)
    }

    /// Names of the registered importers, in registration order.
    pub fn names(&self) -> Vec<&str> {
        self.importers.iter().map(|i| i.name()).collect()
    }

    /// Number of registered importers.
    pub fn len(&self) -> usize {
        self.importers.len()
    }

    /// Returns `true` if no importer is registered.
    pub fn is_empty(&self) -> bool {
        self.importers.is_empty()
    }
}
