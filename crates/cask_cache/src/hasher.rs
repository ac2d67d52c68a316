//! Source file fingerprinting and fingerprint side files.
//!
//! The fingerprint of a source file is the XXH3-128 hash of its bytes, and is
//! the only signal used to decide whether a reimport is needed. The value from
//! the last successful import is kept in a one-line side file inside the
//! cache's hidden import directory.

use std::fs::File;
use std::io::{BufRead, BufReader, ErrorKind, Read};
use std::path::{Path, PathBuf};

use cask_common::{ContentHash, ContentHasher};

use crate::error::ImportError;
use crate::fs::write_atomic;

/// Read buffer size for streaming files through the hasher.
const CHUNK_SIZE: usize = 64 * 1024;

/// Computes content fingerprints of source files.
pub struct SourceHasher;

impl SourceHasher {
    /// Computes the content hash of a single file.
    ///
    /// Only the bytes are hashed; the path, timestamps and permissions do not
    /// affect the result.
    pub fn hash_file(path: &Path) -> Result<ContentHash, ImportError> {
        let mut file = File::open(path).map_err(|e| ImportError::filesystem(path, e))?;
        let mut hasher = ContentHasher::new();
        let mut buf = vec![0u8; CHUNK_SIZE];
        loop {
            let n = match file.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(ImportError::filesystem(path, e)),
            };
            hasher.update(&buf[..n]);
        }
        Ok(hasher.finish())
    }
}

/// A fingerprint side file recording the hash seen at the last successful
/// import or copy.
///
/// The file holds a single line with the hex fingerprint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FingerprintRecord {
    path: PathBuf,
}

impl FingerprintRecord {
    /// Refers to the side file at `path`; nothing is read or created yet.
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Returns the side file location.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the stored fingerprint.
    ///
    /// Returns `None` if the file is missing, unreadable or does not hold a
    /// valid fingerprint. A broken record only costs a reimport.
    pub fn load(&self) -> Option<ContentHash> {
        let file = File::open(&self.path).ok()?;
        let mut line = String::new();
        BufReader::new(file).read_line(&mut line).ok()?;
        line.trim().parse().ok()
    }

    /// Returns `true` if the stored fingerprint equals `hash`.
    pub fn matches(&self, hash: &ContentHash) -> bool {
        self.load().as_ref() == Some(hash)
    }

    /// Replaces the stored fingerprint.
    pub fn store(&self, hash: &ContentHash) -> Result<(), ImportError> {
        write_atomic(&self.path, format!("{hash}\n").as_bytes())
    }
}
