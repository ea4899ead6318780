//! Error types for the media catalog

use std::path::PathBuf;
use thiserror::Error;

/// Fatal scan-session errors.
///
/// Per-file problems (permission denied, files vanishing between listing
/// and stat) are not represented here; the scanner skips those silently
/// and only counts them.
#[derive(Debug, Error)]
pub enum ScanError {
    /// The scan root does not exist or is not a directory
    #[error("scan root does not exist or is not a directory: {0}")]
    RootNotFound(PathBuf),
}

/// Errors from catalog store operations.
///
/// Unlike scanner-level file errors these are always surfaced to the
/// caller; data integrity matters at the persistence boundary.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Errors from a combined scan-and-reconcile pass.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    /// The scan session terminated with a fatal root error
    #[error("scan failed: {0}")]
    ScanFailed(String),
}
