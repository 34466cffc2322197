//! Error types for aita-core

use thiserror::Error;

/// Failures while loading authored activity content into a catalog.
///
/// These only arise at load time. Once a catalog is built, lookups and
/// session operations never fail.
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Failed to read catalog file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed catalog JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Duplicate activity key: {0}")]
    DuplicateKey(String),

    #[error("Activity at position {0} has an empty key")]
    EmptyKey(usize),
}

pub type Result<T> = std::result::Result<T, CatalogError>;
