//! Temporal sequence detection
//!
//! Groups an unordered file set into contiguous bursts by capture time.
//! Derived and ephemeral: nothing here is persisted, groupings are
//! recomputed on demand from a supplied file list and gap threshold.

use std::path::PathBuf;

use chrono::NaiveDateTime;

use crate::timestamp;

/// Group files into time-contiguous sequences. A new group starts whenever
/// the gap to the previous file strictly exceeds `gap_seconds`. Files
/// whose capture time cannot be resolved are excluded from every sequence;
/// detection itself never errors.
pub fn detect_sequences(files: &[PathBuf], gap_seconds: i64) -> Vec<Vec<PathBuf>> {
    let items: Vec<(NaiveDateTime, PathBuf)> = files
        .iter()
        .filter_map(|f| timestamp::resolve_capture_time(f).map(|dt| (dt, f.clone())))
        .collect();
    group_by_time(items, gap_seconds)
}

/// Core grouping over already-resolved timestamps. Sorts ascending with a
/// stable sort so files sharing a timestamp keep their input order, then
/// splits on gaps strictly greater than `gap_seconds`.
pub(crate) fn group_by_time(
    mut items: Vec<(NaiveDateTime, PathBuf)>,
    gap_seconds: i64,
) -> Vec<Vec<PathBuf>> {
    items.sort_by_key(|(dt, _)| *dt);

    let mut sequences: Vec<Vec<PathBuf>> = Vec::new();
    let mut current: Vec<PathBuf> = Vec::new();
    let mut prev: Option<NaiveDateTime> = None;

    for (dt, path) in items {
        match prev {
            Some(p) if (dt - p).num_seconds() > gap_seconds => {
                if !current.is_empty() {
                    sequences.push(std::mem::take(&mut current));
                }
                current.push(path);
            }
            _ => current.push(path),
        }
        prev = Some(dt);
    }
    if !current.is_empty() {
        sequences.push(current);
    }
    sequences
}
