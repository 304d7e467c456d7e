//! Core error types.

use std::path::PathBuf;
use thiserror::Error;

/// Core errors.
#[derive(Debug, Error)]
pub enum Error {
    /// Database error.
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// The schema catalog could not be loaded.
    #[error("failed to load catalog from {}: {reason}", path.display())]
    CatalogLoad {
        /// Path of the catalog file.
        path: PathBuf,
        /// Why loading failed.
        reason: String,
    },

    /// The schema catalog is internally inconsistent.
    #[error("invalid catalog: {0}")]
    InvalidCatalog(String),

    /// A type code that is not part of the closed TypeTag set.
    #[error("unknown type tag: {0:?}")]
    UnknownTypeTag(String),

    /// A field size that cannot be parsed.
    #[error("invalid field size: {0:?}")]
    InvalidSize(String),
}
