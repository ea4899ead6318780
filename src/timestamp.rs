//! Best-effort capture time resolution
//!
//! Two-tier policy: for images, an embedded EXIF `DateTimeOriginal` is
//! preferred because it reflects when the content was created, not when
//! the file was last touched on disk. Everything else (and every EXIF
//! miss) falls back to the filesystem mtime. Resolution never errors; a
//! file that cannot be read at all simply yields no value.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use chrono::{DateTime, Local, NaiveDateTime};
use exif::{In, Tag, Value};

use crate::models::{DateRange, MediaKind};

/// Textual EXIF datetime format
const EXIF_DATETIME_FORMAT: &str = "%Y:%m:%d %H:%M:%S";

/// Resolve the best-effort capture time for a file.
pub fn resolve_capture_time(path: &Path) -> Option<NaiveDateTime> {
    exif_datetime(path).or_else(|| mtime_datetime(path))
}

/// Read the EXIF `DateTimeOriginal` field for image files.
/// Any read or parse failure yields `None`.
pub fn exif_datetime(path: &Path) -> Option<NaiveDateTime> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    if MediaKind::from_extension(ext) != MediaKind::Image {
        return None;
    }

    let file = File::open(path).ok()?;
    let mut reader = BufReader::new(file);
    let exif = exif::Reader::new().read_from_container(&mut reader).ok()?;
    let field = exif.get_field(Tag::DateTimeOriginal, In::PRIMARY)?;

    let raw = match &field.value {
        Value::Ascii(values) => values.first().map(|v| String::from_utf8_lossy(v).into_owned()),
        _ => None,
    }?;

    NaiveDateTime::parse_from_str(raw.trim(), EXIF_DATETIME_FORMAT).ok()
}

/// Filesystem modification time as a local datetime.
pub fn mtime_datetime(path: &Path) -> Option<NaiveDateTime> {
    let modified = std::fs::metadata(path).ok()?.modified().ok()?;
    Some(DateTime::<Local>::from(modified).naive_local())
}

/// Format a capture time the way it is stored in the catalog.
pub fn format_exif(dt: NaiveDateTime) -> String {
    dt.format(EXIF_DATETIME_FORMAT).to_string()
}

/// Check a file's capture date against an inclusive range.
/// Returns `None` when no timestamp can be resolved, leaving the policy
/// decision to the caller.
pub fn in_date_range(path: &Path, range: &DateRange) -> Option<bool> {
    let dt = resolve_capture_time(path)?;
    Some(range.contains(dt.date()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, NaiveDate};
    use std::io::Write;

    #[test]
    fn test_mtime_fallback_for_fresh_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.mp4");
        std::fs::write(&path, b"not a real video").unwrap();

        let dt = resolve_capture_time(&path).expect("mtime should resolve");
        assert_eq!(dt.date().year(), Local::now().year());
    }

    #[test]
    fn test_missing_file_yields_none() {
        assert!(resolve_capture_time(Path::new("/no/such/file.jpg")).is_none());
        assert!(mtime_datetime(Path::new("/no/such/file.jpg")).is_none());
    }

    #[test]
    fn test_garbage_image_falls_back_to_mtime() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.jpg");
        let mut f = File::create(&path).unwrap();
        f.write_all(b"definitely not jpeg data").unwrap();
        drop(f);

        assert!(exif_datetime(&path).is_none());
        assert!(resolve_capture_time(&path).is_some());
    }

    #[test]
    fn test_exif_skipped_for_non_images() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.mp4");
        std::fs::write(&path, b"x").unwrap();
        assert!(exif_datetime(&path).is_none());
    }

    #[test]
    fn test_format_exif_round_trip() {
        let dt = NaiveDate::from_ymd_opt(2021, 7, 4)
            .unwrap()
            .and_hms_opt(12, 30, 45)
            .unwrap();
        let s = format_exif(dt);
        assert_eq!(s, "2021:07:04 12:30:45");
        assert_eq!(NaiveDateTime::parse_from_str(&s, EXIF_DATETIME_FORMAT).unwrap(), dt);
    }

    #[test]
    fn test_in_date_range_none_when_unresolvable() {
        let range = DateRange::new(
            NaiveDate::from_ymd_opt(2000, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2100, 1, 1).unwrap(),
        );
        assert_eq!(in_date_range(Path::new("/no/such/file.jpg"), &range), None);
    }

    #[test]
    fn test_in_date_range_uses_mtime() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.mp4");
        std::fs::write(&path, b"x").unwrap();

        let today = Local::now().date_naive();
        let covering = DateRange::new(today.pred_opt().unwrap(), today.succ_opt().unwrap());
        let ancient = DateRange::new(
            NaiveDate::from_ymd_opt(1990, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(1990, 12, 31).unwrap(),
        );

        assert_eq!(in_date_range(&path, &covering), Some(true));
        assert_eq!(in_date_range(&path, &ancient), Some(false));
    }
}
