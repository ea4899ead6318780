//! Core data models for the media catalog

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Which media kinds a scan should report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TypeFilter {
    /// Image files only
    Images,
    /// Video files only
    Videos,
    /// Both images and videos
    #[default]
    All,
}

impl TypeFilter {
    /// Parse a filter name as used on the command line
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "images" => Some(TypeFilter::Images),
            "videos" => Some(TypeFilter::Videos),
            "all" => Some(TypeFilter::All),
            _ => None,
        }
    }

    /// Get string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            TypeFilter::Images => "images",
            TypeFilter::Videos => "videos",
            TypeFilter::All => "all",
        }
    }
}

/// Media kind classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    /// Image files (jpg, png, heic, etc.)
    Image,
    /// Video files (mp4, mkv, mov, etc.)
    Video,
    /// Anything else
    Other,
}

impl MediaKind {
    /// Infer media kind from a file extension (without dot)
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_lowercase().as_str() {
            "jpg" | "jpeg" | "png" | "bmp" | "gif" | "tiff" | "heic" | "webp" => MediaKind::Image,
            "mp4" | "avi" | "mkv" | "mov" | "wmv" | "flv" | "webm" | "mpeg" | "mpg" => {
                MediaKind::Video
            }
            _ => MediaKind::Other,
        }
    }

    /// Get the string representation stored in the catalog
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Image => "image",
            MediaKind::Video => "video",
            MediaKind::Other => "other",
        }
    }

    /// Parse the stored string representation back
    pub fn from_str(s: &str) -> Self {
        match s {
            "image" => MediaKind::Image,
            "video" => MediaKind::Video,
            _ => MediaKind::Other,
        }
    }
}

impl std::fmt::Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Inclusive capture-date range applied during a scan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// Check whether a date falls within `[start, end]`
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

/// Counters accumulated by one scan session
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScanStats {
    /// Matching files emitted
    pub found: u64,
    /// Directories entered (excluded subtrees are not counted)
    pub dirs: u64,
    /// Files skipped because of transient I/O errors
    pub skipped: u64,
    /// Total scan duration in milliseconds
    pub elapsed_ms: u64,
}

/// Result of one scan-and-reconcile pass over a folder
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReconcileStats {
    /// Catalog id of the scanned folder
    pub folder_id: i64,
    /// Records inserted or refreshed
    pub upserts: u64,
    /// Previously known records flagged missing
    pub missing_marked: u64,
    /// Files skipped because of transient I/O errors
    pub skipped: u64,
    /// Total duration in milliseconds
    pub elapsed_ms: u64,
}

/// Scan-derived fields for one media file, as handed to the catalog
#[derive(Debug, Clone)]
pub struct NewMedia {
    pub folder_id: i64,
    pub path: String,
    pub filename: String,
    pub ext: String,
    pub size: u64,
    /// Modification time as Unix seconds
    pub mtime: f64,
    pub kind: MediaKind,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub duration_s: Option<f64>,
    pub hash: Option<String>,
    /// EXIF capture time as stored text (`YYYY:MM:DD HH:MM:SS`)
    pub created_exif: Option<String>,
}

/// One row returned by a catalog search
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaSummary {
    pub id: i64,
    pub path: String,
    pub filename: String,
    pub ext: String,
    pub size: u64,
    pub mtime: f64,
    pub kind: MediaKind,
    pub favorite: bool,
    pub hidden: bool,
    pub missing: bool,
}

/// Optional filters for a catalog search
#[derive(Debug, Clone, Default)]
pub struct SearchFilters {
    pub folder_id: Option<i64>,
    pub kind: Option<MediaKind>,
    pub favorite: Option<bool>,
    pub hidden: Option<bool>,
    /// Tag names the result must carry all of
    pub tags: Vec<String>,
    /// Substring match against filename or path
    pub text: Option<String>,
    pub limit: u32,
    pub offset: u32,
}

impl SearchFilters {
    pub fn new() -> Self {
        Self {
            limit: 500,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_media_kind_from_extension() {
        assert_eq!(MediaKind::from_extension("jpg"), MediaKind::Image);
        assert_eq!(MediaKind::from_extension("JPEG"), MediaKind::Image);
        assert_eq!(MediaKind::from_extension("heic"), MediaKind::Image);
        assert_eq!(MediaKind::from_extension("mp4"), MediaKind::Video);
        assert_eq!(MediaKind::from_extension("MKV"), MediaKind::Video);
        assert_eq!(MediaKind::from_extension("txt"), MediaKind::Other);
        assert_eq!(MediaKind::from_extension(""), MediaKind::Other);
    }

    #[test]
    fn test_media_kind_round_trip() {
        for kind in [MediaKind::Image, MediaKind::Video, MediaKind::Other] {
            assert_eq!(MediaKind::from_str(kind.as_str()), kind);
        }
    }

    #[test]
    fn test_type_filter_from_name() {
        assert_eq!(TypeFilter::from_name("images"), Some(TypeFilter::Images));
        assert_eq!(TypeFilter::from_name("VIDEOS"), Some(TypeFilter::Videos));
        assert_eq!(TypeFilter::from_name("all"), Some(TypeFilter::All));
        assert_eq!(TypeFilter::from_name("audio"), None);
    }

    #[test]
    fn test_date_range_inclusive() {
        let range = DateRange::new(
            NaiveDate::from_ymd_opt(2023, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2023, 12, 31).unwrap(),
        );
        assert!(range.contains(NaiveDate::from_ymd_opt(2023, 1, 1).unwrap()));
        assert!(range.contains(NaiveDate::from_ymd_opt(2023, 12, 31).unwrap()));
        assert!(range.contains(NaiveDate::from_ymd_opt(2023, 6, 15).unwrap()));
        assert!(!range.contains(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()));
        assert!(!range.contains(NaiveDate::from_ymd_opt(2022, 12, 31).unwrap()));
    }
}
