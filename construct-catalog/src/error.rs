//! Error types for loading catalogs

use std::path::PathBuf;
use thiserror::Error;

/// Result type for catalog loading
pub type Result<T> = std::result::Result<T, CatalogLoadError>;

/// Errors that can occur while loading a catalog from disk
#[derive(Debug, Error)]
pub enum CatalogLoadError {
    /// The catalog root is missing or is not a directory
    #[error("catalog root is not a directory: {path}")]
    NotADirectory { path: PathBuf },

    /// IO error on a specific path
    #[error("IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl CatalogLoadError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
