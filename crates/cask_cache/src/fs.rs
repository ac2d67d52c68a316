//! Filesystem helpers with scoped handles and write-then-rename semantics.
//!
//! Readers of the cache directory never observe a partially written manifest
//! or fingerprint file: content goes to a temporary sibling first and is
//! renamed over the destination only once it is complete.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use tempfile::NamedTempFile;

use crate::error::ImportError;

/// Creates `dir` and all missing parents. An existing directory is success.
pub fn ensure_dir(dir: &Path) -> Result<(), ImportError> {
    if dir.as_os_str().is_empty() {
        return Ok(());
    }
    std::fs::create_dir_all(dir).map_err(|e| ImportError::filesystem(dir, e))
}

/// Creates the parent directory of `path`, if it has one.
pub fn ensure_parent(path: &Path) -> Result<(), ImportError> {
    match path.parent() {
        Some(parent) => ensure_dir(parent),
        None => Ok(()),
    }
}

/// Replaces the contents of `path` atomically with respect to readers.
pub fn write_atomic(path: &Path, contents: &[u8]) -> Result<(), ImportError> {
    let mut tmp = temp_sibling(path)?;
    tmp.write_all(contents)
        .and_then(|_| tmp.as_file().sync_all())
        .map_err(|e| ImportError::filesystem(tmp.path(), e))?;
    tmp.persist(path)
        .map_err(|e| ImportError::filesystem(path, e.error))?;
    Ok(())
}

/// Copies `from` over `to` atomically with respect to readers of `to`.
pub fn copy_atomic(from: &Path, to: &Path) -> Result<(), ImportError> {
    let mut source = File::open(from).map_err(|e| ImportError::filesystem(from, e))?;
    let mut tmp = temp_sibling(to)?;
    std::io::copy(&mut source, &mut tmp).map_err(|e| ImportError::filesystem(to, e))?;
    tmp.persist(to).map_err(|e| ImportError::filesystem(to, e.error))?;
    Ok(())
}

fn temp_sibling(path: &Path) -> Result<NamedTempFile, ImportError> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    NamedTempFile::new_in(dir).map_err(|e| ImportError::filesystem(dir, e))
}
