//! End-to-end tests of the import cache against a real temporary directory.
//!
//! Importers here are scripted: they copy the source bytes into their outputs,
//! record the options they were called with, and can be told to fail or to
//! report variants and metadata.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use cask_cache::{
    CacheLayout, CacheStatus, CopyStatus, ImportCache, ImportError, ImportManifest, ImportOption,
    ImportOutput, ImportStatus, Importer, ImporterError, ImporterRegistry, LayoutPolicy,
    Namespace, OptionMap,
};
use cask_common::Value;
use tempfile::TempDir;

// ---------------------------------------------------------------------------
// Scripted importer
// ---------------------------------------------------------------------------

#[derive(Default)]
struct Script {
    variants: Vec<String>,
    metadata: Option<Value>,
    fail: bool,
    side_file: Option<&'static str>,
    calls: Vec<OptionMap>,
}

#[derive(Clone, Default)]
struct ScriptHandle(Arc<Mutex<Script>>);

impl ScriptHandle {
    fn calls(&self) -> usize {
        self.0.lock().unwrap().calls.len()
    }

    fn last_options(&self) -> OptionMap {
        self.0.lock().unwrap().calls.last().cloned().unwrap_or_default()
    }

    fn set_fail(&self, fail: bool) {
        self.0.lock().unwrap().fail = fail;
    }

    fn set_variants(&self, variants: &[&str]) {
        self.0.lock().unwrap().variants = variants.iter().map(|v| v.to_string()).collect();
    }

    fn set_metadata(&self, metadata: Option<Value>) {
        self.0.lock().unwrap().metadata = metadata;
    }

    fn set_side_file(&self, suffix: &'static str) {
        self.0.lock().unwrap().side_file = Some(suffix);
    }
}

struct Scripted {
    name: &'static str,
    resource_type: &'static str,
    save_extension: &'static str,
    extensions: &'static [&'static str],
    script: ScriptHandle,
}

impl Importer for Scripted {
    fn name(&self) -> &str {
        self.name
    }

    fn resource_type(&self) -> &str {
        self.resource_type
    }

    fn save_extension(&self) -> &str {
        self.save_extension
    }

    fn recognized_extensions(&self) -> Vec<String> {
        self.extensions.iter().map(|e| e.to_string()).collect()
    }

    fn options(&self) -> Vec<ImportOption> {
        vec![
            ImportOption::new("quality", 5),
            ImportOption::new("mipmaps", true),
        ]
    }

    fn import(
        &self,
        source: &Path,
        dest_stem: &Path,
        options: &OptionMap,
    ) -> Result<ImportOutput, ImporterError> {
        let mut script = self.script.0.lock().unwrap();
        script.calls.push(options.clone());
        if script.fail {
            return Err("corrupt header".into());
        }

        let bytes = fs::read(source)?;
        let stem = dest_stem.to_string_lossy();
        if !self.save_extension.is_empty() {
            if script.variants.is_empty() {
                fs::write(format!("{stem}.{}", self.save_extension), &bytes)?;
            }
            for variant in &script.variants {
                fs::write(format!("{stem}.{variant}.{}", self.save_extension), &bytes)?;
            }
        }

        let mut output = ImportOutput::new();
        output.variants = script.variants.clone();
        output.metadata = script.metadata.clone();
        if let Some(suffix) = script.side_file {
            let side = format!("{stem}.{suffix}");
            fs::write(&side, b"side")?;
            output.generated_files.push(side);
        }
        Ok(output)
    }
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

struct Harness {
    dir: TempDir,
    cache: ImportCache,
    texture: ScriptHandle,
    audio: ScriptHandle,
}

impl Harness {
    fn new(policy: LayoutPolicy) -> Self {
        init_tracing();
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("assets")).unwrap();
        let (registry, texture, audio) = registry();
        let cache = ImportCache::new(CacheLayout::new(dir.path().join("cache"), policy), registry);
        Self {
            dir,
            cache,
            texture,
            audio,
        }
    }

    fn asset(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.dir.path().join("assets").join(name);
        fs::write(&path, contents).unwrap();
        path
    }

    fn stem(&self, name: &str) -> PathBuf {
        self.dir.path().join("out").join(name)
    }
}

fn registry() -> (ImporterRegistry, ScriptHandle, ScriptHandle) {
    let texture = ScriptHandle::default();
    let audio = ScriptHandle::default();
    let registry = ImporterRegistry::new()
        .with(Scripted {
            name: "texture",
            resource_type: "Texture",
            save_extension: "tex",
            extensions: &["png", "jpg"],
            script: texture.clone(),
        })
        .with(Scripted {
            name: "audio",
            resource_type: "AudioStream",
            save_extension: "",
            extensions: &["ogg"],
            script: audio.clone(),
        });
    (registry, texture, audio)
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn overrides(entries: &[(&str, Value)]) -> OptionMap {
    entries
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

fn manifest_text(status: &ImportStatus) -> String {
    fs::read_to_string(&status.report().unwrap().manifest_path).unwrap()
}

/// Collects every file and directory under `dir`.
fn walk(dir: &Path) -> Vec<PathBuf> {
    let mut out = Vec::new();
    for entry in fs::read_dir(dir).unwrap().flatten() {
        let path = entry.path();
        if path.is_dir() {
            out.extend(walk(&path));
        }
        out.push(path);
    }
    out
}

// ---------------------------------------------------------------------------
// Idempotence and change detection
// ---------------------------------------------------------------------------

#[test]
fn unchanged_source_is_imported_once() {
    let h = Harness::new(LayoutPolicy::Central);
    let src = h.asset("board.png", "pixels");
    let stem = h.stem("board");

    let first = h.cache.import(&src, &stem, &OptionMap::new()).unwrap();
    let text = manifest_text(&first);

    let second = h.cache.import(&src, &stem, &OptionMap::new()).unwrap();
    assert_eq!(second, ImportStatus::UpToDate);
    assert_eq!(h.texture.calls(), 1);
    assert_eq!(
        fs::read_to_string(src.with_extension("png.import")).unwrap(),
        text
    );
}

#[test]
fn reimport_renders_identical_manifest() {
    let h = Harness::new(LayoutPolicy::Central);
    let src = h.asset("board.png", "pixels");
    let stem = h.stem("board");

    let first = manifest_text(&h.cache.import(&src, &stem, &OptionMap::new()).unwrap());
    fs::remove_file(h.cache.layout().fingerprint_path(&src)).unwrap();
    let again = h.cache.import(&src, &stem, &OptionMap::new()).unwrap();
    assert!(again.is_imported());
    assert_eq!(manifest_text(&again), first);
}

#[test]
fn content_change_with_same_mtime_reimports() {
    let h = Harness::new(LayoutPolicy::Central);
    let src = h.asset("board.png", "pixels v1");
    let stem = h.stem("board");
    let mtime = fs::metadata(&src).unwrap().modified().unwrap();

    h.cache.import(&src, &stem, &OptionMap::new()).unwrap();
    assert_eq!(h.cache.status(&src).unwrap(), CacheStatus::Fresh);

    fs::write(&src, "pixels v2").unwrap();
    fs::File::options()
        .write(true)
        .open(&src)
        .unwrap()
        .set_modified(mtime)
        .unwrap();
    assert_eq!(fs::metadata(&src).unwrap().modified().unwrap(), mtime);
    assert_eq!(h.cache.status(&src).unwrap(), CacheStatus::Stale);

    let status = h.cache.import(&src, &stem, &OptionMap::new()).unwrap();
    assert!(status.is_imported());
    assert_eq!(h.texture.calls(), 2);
    assert_eq!(fs::read_to_string(h.stem("board.tex")).unwrap(), "pixels v2");
    assert_eq!(h.cache.status(&src).unwrap(), CacheStatus::Fresh);
}

#[test]
fn new_destination_stem_reimports() {
    let h = Harness::new(LayoutPolicy::Central);
    let src = h.asset("board.png", "pixels");
    let one = h.stem("one/board");
    let two = h.stem("two/board");

    h.cache.import(&src, &one, &OptionMap::new()).unwrap();
    let status = h.cache.import(&src, &two, &OptionMap::new()).unwrap();
    assert!(status.is_imported());
    assert_eq!(h.texture.calls(), 2);
    assert_eq!(fs::read_to_string(h.stem("two/board.tex")).unwrap(), "pixels");

    let manifest = ImportManifest::load(&status.report().unwrap().manifest_path).unwrap();
    assert_eq!(manifest.dest_paths(), vec![h.stem("two/board.tex")]);
    assert_eq!(
        h.cache.import(&src, &two, &OptionMap::new()).unwrap(),
        ImportStatus::UpToDate
    );
}

#[test]
fn deleted_generated_file_reimports() {
    let h = Harness::new(LayoutPolicy::Central);
    let src = h.asset("board.png", "pixels");
    let stem = h.stem("board");
    h.texture.set_side_file("atlas.json");

    let status = h.cache.import(&src, &stem, &OptionMap::new()).unwrap();
    let side = h.stem("board.atlas.json");
    assert_eq!(status.report().unwrap().generated_files, vec![side.clone()]);
    assert_eq!(
        h.cache.import(&src, &stem, &OptionMap::new()).unwrap(),
        ImportStatus::UpToDate
    );

    fs::remove_file(&side).unwrap();
    assert!(h.cache.import(&src, &stem, &OptionMap::new()).unwrap().is_imported());
    assert!(side.is_file());
    assert_eq!(h.texture.calls(), 2);
}

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

#[test]
fn option_precedence() {
    let h = Harness::new(LayoutPolicy::Central);
    let src = h.asset("board.png", "pixels");
    let stem = h.stem("board");

    // Fresh asset: declared default.
    let status = h.cache.import(&src, &stem, &OptionMap::new()).unwrap();
    let manifest_path = status.report().unwrap().manifest_path.clone();
    assert!(manifest_text(&status).contains("\nquality=5\n"));

    // A persisted value wins over the default.
    let edited = fs::read_to_string(&manifest_path)
        .unwrap()
        .replace("quality=5", "quality=3");
    fs::write(&manifest_path, edited).unwrap();
    let status = h.cache.import(&src, &stem, &OptionMap::new()).unwrap();
    assert_eq!(status, ImportStatus::UpToDate);
    let manifest = ImportManifest::load(&manifest_path).unwrap();
    assert_eq!(manifest.param("quality"), Some(&Value::Int(3)));

    // An override wins over the persisted value and forces a reimport.
    let status = h
        .cache
        .import(&src, &stem, &overrides(&[("quality", Value::Int(9))]))
        .unwrap();
    assert!(status.is_imported());
    assert_eq!(h.texture.last_options().get("quality"), Some(&Value::Int(9)));
    assert_eq!(h.texture.last_options().get("mipmaps"), Some(&Value::Bool(true)));
    let manifest = ImportManifest::load(&manifest_path).unwrap();
    assert_eq!(manifest.param("quality"), Some(&Value::Int(9)));

    // Another asset starts from the default again.
    let other = h.asset("other.png", "other pixels");
    let status = h.cache.import(&other, &h.stem("other"), &OptionMap::new()).unwrap();
    assert!(manifest_text(&status).contains("\nquality=5\n"));
}

#[test]
fn undeclared_overrides_are_ignored() {
    let h = Harness::new(LayoutPolicy::Central);
    let src = h.asset("board.png", "pixels");
    let status = h
        .cache
        .import(
            &src,
            &h.stem("board"),
            &overrides(&[("bogus", Value::from("x"))]),
        )
        .unwrap();
    assert!(!manifest_text(&status).contains("bogus"));
    assert!(!h.texture.last_options().contains_key("bogus"));
}

#[test]
fn configured_defaults_from_cask_toml() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join(cask_config::CONFIG_FILE),
        "[cache]\nroot = \".cask\"\n\n[defaults.texture]\nquality = 7\n",
    )
    .unwrap();
    let config = cask_config::load_config(dir.path()).unwrap();
    let resolved = cask_config::resolve_cache(&config, dir.path()).unwrap();
    let (registry, texture, _) = registry();
    let cache = ImportCache::from_config(&resolved, registry);

    let src = dir.path().join("board.png");
    fs::write(&src, "pixels").unwrap();
    let status = cache.import_texture(&src).unwrap();
    let report = status.report().unwrap();
    assert!(report.manifest_path.starts_with(dir.path().join(".cask/.import")));
    assert_eq!(texture.last_options().get("quality"), Some(&Value::Int(7)));

    let status = cache
        .import_asset(&src, None, &overrides(&[("quality", Value::Int(2))]))
        .unwrap();
    assert_eq!(texture.last_options().get("quality"), Some(&Value::Int(2)));
    assert!(manifest_text(&status).contains("\nquality=2\n"));
}

// ---------------------------------------------------------------------------
// Sentinel and importer selection
// ---------------------------------------------------------------------------

#[test]
fn keep_sentinel_touches_nothing() {
    let h = Harness::new(LayoutPolicy::Central);
    let src = h.asset("board.png", "pixels");
    let manifest_path = src.with_extension("png.import");
    let pinned = "[remap]\n\nimporter=\"keep\"\n";
    fs::write(&manifest_path, pinned).unwrap();

    let status = h.cache.import(&src, &h.stem("board"), &OptionMap::new()).unwrap();
    assert_eq!(status, ImportStatus::Kept);
    assert_eq!(h.texture.calls(), 0);
    assert_eq!(fs::read_to_string(&manifest_path).unwrap(), pinned);
    assert!(!h.stem("board.tex").exists());
    assert!(!h.cache.layout().fingerprint_path(&src).exists());
}

#[test]
fn prior_importer_is_reused() {
    let h = Harness::new(LayoutPolicy::Central);
    let src = h.asset("clip.png", "samples");
    fs::write(
        src.with_extension("png.import"),
        "[remap]\n\nimporter=\"audio\"\n",
    )
    .unwrap();

    let status = h.cache.import(&src, &h.stem("clip"), &OptionMap::new()).unwrap();
    assert_eq!(status.report().unwrap().importer, "audio");
    assert_eq!(h.audio.calls(), 1);
    assert_eq!(h.texture.calls(), 0);
}

#[test]
fn unrecognized_format() {
    let h = Harness::new(LayoutPolicy::Central);
    let src = h.asset("notes.txt", "text");
    let err = h.cache.import(&src, &h.stem("notes"), &OptionMap::new()).unwrap_err();
    assert!(matches!(err, ImportError::UnrecognizedFormat { ref path } if *path == src));
}

#[test]
fn missing_source() {
    let h = Harness::new(LayoutPolicy::Central);
    let src = h.dir.path().join("assets/missing.png");
    let err = h.cache.import(&src, &h.stem("missing"), &OptionMap::new()).unwrap_err();
    assert!(matches!(err, ImportError::NotFound { .. }));
    assert!(err.to_string().contains("missing.png"));
}

#[test]
fn failed_import_keeps_previous_manifest() {
    let h = Harness::new(LayoutPolicy::Central);
    let src = h.asset("board.png", "v1");
    let stem = h.stem("board");
    let before = manifest_text(&h.cache.import(&src, &stem, &OptionMap::new()).unwrap());

    fs::write(&src, "v2").unwrap();
    h.texture.set_fail(true);
    let err = h.cache.import(&src, &stem, &OptionMap::new()).unwrap_err();
    match &err {
        ImportError::ImportFailed { importer, source } => {
            assert_eq!(importer, "texture");
            assert_eq!(source.to_string(), "corrupt header");
        }
        other => panic!("expected ImportFailed, got {other:?}"),
    }
    assert_eq!(
        fs::read_to_string(src.with_extension("png.import")).unwrap(),
        before
    );
    assert_eq!(h.cache.status(&src).unwrap(), CacheStatus::Stale);

    h.texture.set_fail(false);
    assert!(h.cache.import(&src, &stem, &OptionMap::new()).unwrap().is_imported());
}

// ---------------------------------------------------------------------------
// Manifest content
// ---------------------------------------------------------------------------

#[test]
fn variants_get_one_path_each() {
    let h = Harness::new(LayoutPolicy::Central);
    let src = h.asset("board.png", "pixels");
    h.texture.set_variants(&["high", "low"]);
    let stem = h.stem("D");

    let status = h.cache.import(&src, &stem, &OptionMap::new()).unwrap();
    let text = manifest_text(&status);
    let d = stem.to_string_lossy();
    assert!(text.contains(&format!("path.high=\"{d}.high.tex\"\n")));
    assert!(text.contains(&format!("path.low=\"{d}.low.tex\"\n")));
    assert!(!text.lines().any(|l| l.starts_with("path=")));
    assert_eq!(
        status.report().unwrap().dest_files,
        vec![
            PathBuf::from(format!("{d}.high.tex")),
            PathBuf::from(format!("{d}.low.tex")),
        ]
    );
}

#[test]
fn empty_save_extension_writes_no_paths() {
    let h = Harness::new(LayoutPolicy::Central);
    let src = h.asset("theme.ogg", "samples");
    let status = h.cache.import(&src, &h.stem("theme"), &OptionMap::new()).unwrap();
    let text = manifest_text(&status);
    assert!(text.contains("importer=\"audio\"\n"));
    assert!(text.contains("type=\"AudioStream\"\n"));
    assert!(!text.contains("path"));
    assert!(!text.contains("dest_files"));
    assert!(status.report().unwrap().dest_files.is_empty());
}

#[test]
fn metadata_only_when_present() {
    let h = Harness::new(LayoutPolicy::Central);
    let src = h.asset("board.png", "pixels");
    let stem = h.stem("board");

    h.texture.set_metadata(Some(Value::Nil));
    let text = manifest_text(&h.cache.import(&src, &stem, &OptionMap::new()).unwrap());
    assert!(!text.contains("metadata"));

    h.texture.set_metadata(Some(Value::from("srgb")));
    let status = h
        .cache
        .import(&src, &stem, &overrides(&[("quality", Value::Int(6))]))
        .unwrap();
    assert!(manifest_text(&status).contains("metadata=\"srgb\"\n"));
}

// ---------------------------------------------------------------------------
// Layout policies
// ---------------------------------------------------------------------------

#[test]
fn hostile_namespace_stays_under_root() {
    let h = Harness::new(LayoutPolicy::Namespaced(Namespace::new("../../etc", "..")));
    let src = h.asset("passwd.png", "not really");

    let status = h.cache.import_texture(&src).unwrap();
    let report = status.report().unwrap();
    assert!(h.cache.layout().contains(&report.manifest_path));

    let root = h.cache.layout().root();
    for path in walk(h.dir.path()) {
        assert!(
            path.starts_with(root) || path.starts_with(h.dir.path().join("assets")),
            "{} escaped the cache root",
            path.display()
        );
    }
}

#[test]
fn namespaced_layout_mirrors_sources() {
    let h = Harness::new(LayoutPolicy::Namespaced(Namespace::new("chess", "textures")));
    let src = h.asset("board.png", "pixels");

    let status = h.cache.import_texture(&src).unwrap();
    let mirror = h.cache.layout().root().join("chess/textures/board.png");
    assert_eq!(fs::read_to_string(&mirror).unwrap(), "pixels");
    assert_eq!(
        status.report().unwrap().manifest_path,
        h.cache.layout().root().join("chess/textures/board.png.import")
    );
    assert_eq!(h.cache.import_texture(&src).unwrap(), ImportStatus::UpToDate);
}

// ---------------------------------------------------------------------------
// copy_file
// ---------------------------------------------------------------------------

#[test]
fn copy_file_lifecycle() {
    let h = Harness::new(LayoutPolicy::Central);
    let from = h.asset("font.ttf", "glyphs v1");
    let to = h.cache.layout().root().join("fonts/font.ttf");

    assert_eq!(h.cache.copy_file(&from, &to).unwrap(), CopyStatus::Copied);
    assert_eq!(fs::read_to_string(&to).unwrap(), "glyphs v1");
    let record = h.cache.layout().copy_record_path(&to);
    let stored = fs::read_to_string(&record).unwrap();

    // Unchanged: the destination is not rewritten.
    fs::write(&to, "tampered").unwrap();
    fs::write(&record, &stored).unwrap();
    assert_eq!(
        h.cache.copy_file(&from, &to).unwrap(),
        CopyStatus::AlreadyUpToDate
    );
    assert_eq!(fs::read_to_string(&to).unwrap(), "tampered");

    // Mutated: copied again and the record updated.
    fs::write(&from, "glyphs v2").unwrap();
    assert_eq!(h.cache.copy_file(&from, &to).unwrap(), CopyStatus::Copied);
    assert_eq!(fs::read_to_string(&to).unwrap(), "glyphs v2");
    assert_ne!(fs::read_to_string(&record).unwrap(), stored);
}

#[test]
fn copy_over_source_then_import_sees_new_content() {
    let h = Harness::new(LayoutPolicy::Central);
    let download = h.asset("download.png", "v1");
    let src = h.dir.path().join("assets/board.png");
    let stem = h.stem("board");

    assert_eq!(h.cache.copy_file(&download, &src).unwrap(), CopyStatus::Copied);
    assert!(h.cache.import(&src, &stem, &OptionMap::new()).unwrap().is_imported());
    assert_eq!(fs::read_to_string(h.stem("board.tex")).unwrap(), "v1");

    fs::write(&download, "v2").unwrap();
    assert_eq!(h.cache.copy_file(&download, &src).unwrap(), CopyStatus::Copied);
    assert_eq!(h.cache.status(&src).unwrap(), CacheStatus::Stale);

    let status = h.cache.import(&src, &stem, &OptionMap::new()).unwrap();
    assert!(status.is_imported());
    assert_eq!(fs::read_to_string(h.stem("board.tex")).unwrap(), "v2");
    assert_eq!(h.texture.calls(), 2);
}
