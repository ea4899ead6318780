//! Media catalog: scans directory trees for photos and videos, reconciles
//! them into a persistent SQLite catalog, and derives time-contiguous
//! sequences for presentation.
//!
//! The pipeline is scanner → catalog → sequence detector: the scanner
//! streams batches of matching paths off a worker thread, the catalog
//! upserts them and flags vanished files as missing without losing tags or
//! history, and the sequence detector groups a file set by capture-time
//! gaps.

pub mod catalog;
pub mod config;
pub mod error;
pub mod filter;
pub mod models;
pub mod scanner;
pub mod sequence;
pub mod timestamp;

pub use catalog::Catalog;
pub use config::{ScanConfig, ScanConfigBuilder};
pub use error::{CatalogError, PipelineError, ScanError};
pub use filter::PathFilter;
pub use models::{
    DateRange, MediaKind, MediaSummary, NewMedia, ReconcileStats, ScanStats, SearchFilters,
    TypeFilter,
};
pub use scanner::{scan_into_catalog, ScanEvent, ScanSession, StopOutcome};
pub use sequence::detect_sequences;
