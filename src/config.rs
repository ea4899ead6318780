//! Configuration for scan sessions

use std::path::PathBuf;

use crate::models::{DateRange, TypeFilter};

/// Default number of paths emitted per batch
pub const DEFAULT_BATCH_SIZE: usize = 50;

/// Default large file threshold for partial hashing (100 MB)
pub const DEFAULT_LARGE_FILE_THRESHOLD: u64 = 100 * 1024 * 1024;

/// Environment variable overriding the catalog database location
pub const DB_ENV_VAR: &str = "MEDIA_CATALOG_DB";

/// Default catalog database filename (in the working directory)
pub const DEFAULT_DB_FILENAME: &str = "media_catalog.db";

/// Resolve the catalog database path: explicit argument wins, then the
/// `MEDIA_CATALOG_DB` environment variable, then the default filename.
pub fn resolve_db_path(explicit: Option<PathBuf>) -> PathBuf {
    explicit
        .or_else(|| std::env::var_os(DB_ENV_VAR).map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DB_FILENAME))
}

/// Configuration for one scan session
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Root directory to scan
    pub root: PathBuf,

    /// Which media kinds qualify
    pub type_filter: TypeFilter,

    /// Optional inclusive capture-date range
    pub date_range: Option<DateRange>,

    /// Absolute directory prefixes whose subtrees are never entered
    pub excluded_prefixes: Vec<PathBuf>,

    /// Number of paths per emitted batch
    pub batch_size: usize,

    /// Whether to compute file hashes during reconciliation
    pub compute_hash: bool,

    /// Files larger than this use a partial hash (first 1MB + last 1MB)
    pub large_file_threshold: u64,
}

impl ScanConfig {
    /// Create a config for the given root with defaults
    pub fn new(root: PathBuf) -> Self {
        Self {
            root,
            type_filter: TypeFilter::All,
            date_range: None,
            excluded_prefixes: Vec::new(),
            batch_size: DEFAULT_BATCH_SIZE,
            compute_hash: false,
            large_file_threshold: DEFAULT_LARGE_FILE_THRESHOLD,
        }
    }

    /// Create a config builder
    pub fn builder(root: PathBuf) -> ScanConfigBuilder {
        ScanConfigBuilder {
            config: Self::new(root),
        }
    }
}

/// Builder for [`ScanConfig`]
#[derive(Debug)]
pub struct ScanConfigBuilder {
    config: ScanConfig,
}

impl ScanConfigBuilder {
    /// Set the type filter
    pub fn type_filter(mut self, filter: TypeFilter) -> Self {
        self.config.type_filter = filter;
        self
    }

    /// Set an inclusive capture-date range
    pub fn date_range(mut self, range: DateRange) -> Self {
        self.config.date_range = Some(range);
        self
    }

    /// Set the excluded directory prefixes
    pub fn excluded_prefixes(mut self, prefixes: Vec<PathBuf>) -> Self {
        self.config.excluded_prefixes = prefixes;
        self
    }

    /// Add one excluded directory prefix
    pub fn exclude(mut self, prefix: PathBuf) -> Self {
        self.config.excluded_prefixes.push(prefix);
        self
    }

    /// Set the batch size
    pub fn batch_size(mut self, size: usize) -> Self {
        self.config.batch_size = size.max(1);
        self
    }

    /// Enable or disable hash computation
    pub fn compute_hash(mut self, enabled: bool) -> Self {
        self.config.compute_hash = enabled;
        self
    }

    /// Set the large file threshold
    pub fn large_file_threshold(mut self, threshold: u64) -> Self {
        self.config.large_file_threshold = threshold;
        self
    }

    /// Build the config
    pub fn build(self) -> ScanConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ScanConfig::new(PathBuf::from("/media"));
        assert_eq!(config.type_filter, TypeFilter::All);
        assert!(config.date_range.is_none());
        assert!(config.excluded_prefixes.is_empty());
        assert_eq!(config.batch_size, DEFAULT_BATCH_SIZE);
        assert!(!config.compute_hash);
    }

    #[test]
    fn test_config_builder() {
        let config = ScanConfig::builder(PathBuf::from("/media"))
            .type_filter(TypeFilter::Images)
            .exclude(PathBuf::from("/media/trash"))
            .batch_size(10)
            .compute_hash(true)
            .build();

        assert_eq!(config.type_filter, TypeFilter::Images);
        assert_eq!(config.excluded_prefixes.len(), 1);
        assert_eq!(config.batch_size, 10);
        assert!(config.compute_hash);
    }

    #[test]
    fn test_batch_size_floor() {
        let config = ScanConfig::builder(PathBuf::from("/media"))
            .batch_size(0)
            .build();
        assert_eq!(config.batch_size, 1);
    }

    #[test]
    fn test_resolve_db_path_explicit_wins() {
        let path = resolve_db_path(Some(PathBuf::from("/tmp/x.db")));
        assert_eq!(path, PathBuf::from("/tmp/x.db"));
    }
}
