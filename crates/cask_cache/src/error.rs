//! Error types for import cache operations.

use std::path::PathBuf;

use crate::importer::ImporterError;

/// Errors returned by the import cache.
///
/// Every failure is returned to the immediate caller; nothing is retried.
/// "Nothing to do" is not an error: see
/// [`ImportStatus::UpToDate`](crate::ImportStatus::UpToDate) and
/// [`CopyStatus::AlreadyUpToDate`](crate::CopyStatus::AlreadyUpToDate).
#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    /// The source file does not exist.
    #[error("source file not found: {}", path.display())]
    NotFound {
        /// The missing source path.
        path: PathBuf,
    },

    /// Creating, reading, or writing a file or directory failed.
    #[error("filesystem error at {}: {source}", path.display())]
    Filesystem {
        /// The path that caused the error.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// No registered importer handles the source's extension, and no prior
    /// manifest pinned one.
    #[error("no importer recognizes {}", path.display())]
    UnrecognizedFormat {
        /// The source path.
        path: PathBuf,
    },

    /// An importer requested by name is not in the registry.
    #[error("importer '{name}' is not registered")]
    UnknownImporter {
        /// The requested importer name.
        name: String,
    },

    /// The importer itself reported a failure.
    #[error("importer '{importer}' failed: {source}")]
    ImportFailed {
        /// Name of the importer that failed.
        importer: String,
        /// The importer's error, unchanged.
        source: ImporterError,
    },
}

impl ImportError {
    /// Wraps an I/O error with the path it concerns.
    pub fn filesystem(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ImportError::Filesystem {
            path: path.into(),
            source,
        }
    }
}
