//! The import manifest: a small sectioned text file read by asset loaders.
//!
//! ```text
//! [remap]
//!
//! importer="texture"
//! type="Texture"
//! path="/cache/.import/board.png-<hash>.tex"
//!
//! [deps]
//!
//! source_file="/assets/board.png"
//! dest_files=["/cache/.import/board.png-<hash>.tex"]
//!
//! [params]
//!
//! quality=5
//! ```
//!
//! Values use the [`Value`] literal syntax. The rendered form is byte-stable:
//! the same record always renders to the same text, so loaders and version
//! control see no churn from a no-op reimport.

use std::path::{Path, PathBuf};

use cask_common::Value;
use tracing::{trace, warn};

use crate::error::ImportError;
use crate::fs::write_atomic;
use crate::importer::{ImportOutput, ImporterDescriptor, OptionMap};

/// Extension of manifest files.
pub const MANIFEST_EXTENSION: &str = "import";

/// Importer name that pins an asset: the cache leaves it untouched.
pub const KEEP_IMPORTER: &str = "keep";

const REMAP: &str = "remap";
const DEPS: &str = "deps";
const PARAMS: &str = "params";

/// One converted artifact, optionally tagged with a variant.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputPath {
    /// Variant tag; `None` for the single-output form.
    pub variant: Option<String>,
    /// Path of the artifact.
    pub path: String,
}

/// Everything recorded about the last successful import of one source.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImportManifest {
    /// Importer that produced the outputs.
    pub importer: Option<String>,
    /// Resource type of the outputs; empty if unspecified.
    pub resource_type: String,
    /// Converted artifacts in the order the importer reported them.
    pub outputs: Vec<OutputPath>,
    /// Opaque importer metadata for the loader.
    pub metadata: Option<Value>,
    /// Extra files the importer generated.
    pub generated_files: Vec<String>,
    /// The source the outputs were converted from.
    pub source_file: Option<String>,
    /// Every destination path written.
    pub dest_files: Vec<String>,
    /// Option values used, in declaration order.
    pub params: Vec<(String, Value)>,
}

impl ImportManifest {
    /// Builds the record of a successful import.
    ///
    /// An empty save extension records no output paths. Variants produce one
    /// `<stem>.<variant>.<ext>` path each instead of the plain `<stem>.<ext>`.
    /// Metadata that is nil or empty is dropped.
    pub fn record(
        descriptor: &ImporterDescriptor,
        source: &Path,
        dest_stem: &Path,
        output: &ImportOutput,
        params: Vec<(String, Value)>,
    ) -> Self {
        let ext = descriptor.save_extension.as_str();
        let outputs: Vec<OutputPath> = if ext.is_empty() {
            Vec::new()
        } else if output.variants.is_empty() {
            vec![OutputPath {
                variant: None,
                path: output_path(dest_stem, None, ext),
            }]
        } else {
            output
                .variants
                .iter()
                .map(|v| OutputPath {
                    variant: Some(v.clone()),
                    path: output_path(dest_stem, Some(v), ext),
                })
                .collect()
        };

        Self {
            importer: Some(descriptor.name.clone()),
            resource_type: descriptor.resource_type.clone(),
            dest_files: outputs.iter().map(|o| o.path.clone()).collect(),
            outputs,
            metadata: output.metadata.clone().filter(|m| !m.is_empty()),
            generated_files: output.generated_files.clone(),
            source_file: Some(source.to_string_lossy().into_owned()),
            params,
        }
    }

    /// Returns `true` if every recorded output lies at the path an import to
    /// `dest_stem` with `save_extension` would write, and `dest_files` lists
    /// exactly those outputs.
    pub fn written_to(&self, dest_stem: &Path, save_extension: &str) -> bool {
        if save_extension.is_empty() {
            return self.outputs.is_empty() && self.dest_files.is_empty();
        }
        !self.outputs.is_empty()
            && self.outputs.iter().all(|o| {
                o.path == output_path(dest_stem, o.variant.as_deref(), save_extension)
            })
            && self.dest_files.iter().eq(self.outputs.iter().map(|o| &o.path))
    }

    /// Returns `true` if the asset is pinned with the `keep` importer.
    pub fn is_keep(&self) -> bool {
        self.importer.as_deref() == Some(KEEP_IMPORTER)
    }

    /// Looks up a recorded option value.
    pub fn param(&self, name: &str) -> Option<&Value> {
        self.params.iter().find(|(k, _)| k == name).map(|(_, v)| v)
    }

    /// The recorded option values keyed by name.
    pub fn params_map(&self) -> OptionMap {
        self.params.iter().cloned().collect()
    }

    /// Destination paths as filesystem paths.
    pub fn dest_paths(&self) -> Vec<PathBuf> {
        self.dest_files.iter().map(PathBuf::from).collect()
    }

    /// Renders the manifest text.
    pub fn render(&self) -> String {
        let mut remap = Vec::new();
        if let Some(importer) = &self.importer {
            remap.push(format!("importer={}", literal(importer)));
        }
        if !self.resource_type.is_empty() {
            remap.push(format!("type={}", literal(&self.resource_type)));
        }
        for output in &self.outputs {
            match &output.variant {
                Some(v) => remap.push(format!("path.{v}={}", literal(&output.path))),
                None => remap.push(format!("path={}", literal(&output.path))),
            }
        }
        if let Some(metadata) = self.metadata.as_ref().filter(|m| !m.is_empty()) {
            remap.push(format!("metadata={metadata}"));
        }

        let mut deps = Vec::new();
        if !self.generated_files.is_empty() {
            deps.push(format!("files={}", literal_list(&self.generated_files)));
        }
        if let Some(source) = &self.source_file {
            deps.push(format!("source_file={}", literal(source)));
        }
        if !self.dest_files.is_empty() {
            deps.push(format!("dest_files={}", literal_list(&self.dest_files)));
        }

        let params: Vec<String> = self
            .params
            .iter()
            .map(|(name, value)| format!("{name}={value}"))
            .collect();

        [(REMAP, remap), (DEPS, deps), (PARAMS, params)]
            .iter()
            .map(|(header, lines)| {
                let mut section = format!("[{header}]\n\n");
                for line in lines {
                    section.push_str(line);
                    section.push('\n');
                }
                section
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Parses manifest text.
    ///
    /// Missing sections read as empty. Blank lines and `;` or `#` comments are
    /// skipped, as are unknown keys and lines that do not parse.
    pub fn parse(text: &str) -> Self {
        let mut manifest = Self::default();
        let mut section: Option<&str> = None;

        for (index, raw) in text.lines().enumerate() {
            let line_no = index + 1;
            let line = raw.trim();
            if line.is_empty() || line.starts_with(';') || line.starts_with('#') {
                continue;
            }
            if let Some(header) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
                section = Some(header.trim());
                continue;
            }
            let Some((key, literal)) = line.split_once('=') else {
                warn!(line = line_no, "skipping manifest line without '='");
                continue;
            };
            let key = key.trim();
            let value: Value = match literal.trim().parse() {
                Ok(value) => value,
                Err(err) => {
                    warn!(line = line_no, key, %err, "skipping unparsable manifest value");
                    continue;
                }
            };
            match section {
                Some(REMAP) => manifest.read_remap(key, value, line_no),
                Some(DEPS) => manifest.read_deps(key, value, line_no),
                Some(PARAMS) => manifest.params.push((key.to_string(), value)),
                Some(other) => trace!(section = other, key, "ignoring key in unknown section"),
                None => warn!(line = line_no, key, "skipping manifest key outside any section"),
            }
        }
        manifest
    }

    /// Reads the manifest at `path`.
    ///
    /// Returns `None` when the file is missing or unreadable; callers treat
    /// that as "never imported".
    pub fn load(path: &Path) -> Option<Self> {
        let text = std::fs::read_to_string(path).ok()?;
        Some(Self::parse(&text))
    }

    /// Writes the manifest to `path`, replacing any previous one atomically.
    pub fn save(&self, path: &Path) -> Result<(), ImportError> {
        write_atomic(path, self.render().as_bytes())
    }

    fn read_remap(&mut self, key: &str, value: Value, line_no: usize) {
        match key {
            "importer" => self.importer = expect_string(key, value, line_no),
            "type" => self.resource_type = expect_string(key, value, line_no).unwrap_or_default(),
            "metadata" => self.metadata = Some(value),
            "path" => {
                if let Some(path) = expect_string(key, value, line_no) {
                    self.outputs.push(OutputPath { variant: None, path });
                }
            }
            _ => match key.strip_prefix("path.") {
                Some(variant) if !variant.is_empty() => {
                    if let Some(path) = expect_string(key, value, line_no) {
                        self.outputs.push(OutputPath {
                            variant: Some(variant.to_string()),
                            path,
                        });
                    }
                }
                _ => trace!(key, "ignoring unknown remap key"),
            },
        }
    }

    fn read_deps(&mut self, key: &str, value: Value, line_no: usize) {
        match key {
            "files" => self.generated_files = string_list(key, value, line_no),
            "source_file" => self.source_file = expect_string(key, value, line_no),
            "dest_files" => self.dest_files = string_list(key, value, line_no),
            _ => trace!(key, "ignoring unknown deps key"),
        }
    }
}

fn output_path(dest_stem: &Path, variant: Option<&str>, ext: &str) -> String {
    let stem = dest_stem.to_string_lossy();
    match variant {
        Some(v) => format!("{stem}.{v}.{ext}"),
        None => format!("{stem}.{ext}"),
    }
}

fn literal(text: &str) -> Value {
    Value::String(text.to_string())
}

fn literal_list(items: &[String]) -> Value {
    Value::Array(items.iter().map(|s| literal(s)).collect())
}

fn expect_string(key: &str, value: Value, line_no: usize) -> Option<String> {
    match value {
        Value::String(s) => Some(s),
        _ => {
            warn!(line = line_no, key, "expected a string literal");
            None
        }
    }
}

fn string_list(key: &str, value: Value, line_no: usize) -> Vec<String> {
    match value {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| expect_string(key, item, line_no))
            .collect(),
        _ => {
            warn!(line = line_no, key, "expected a list of string literals");
            Vec::new()
        }
    }
}
