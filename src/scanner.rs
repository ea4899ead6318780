//! Cancellable directory scanner and scan-to-catalog pipeline
//!
//! One scan session runs on its own worker thread and hands events to the
//! caller over a rendezvous channel, so the caller starts processing before
//! the tree is fully walked and the worker never runs ahead of the
//! consumer. Events arrive in traversal order: zero or more batches, each
//! followed by a progress report, then exactly one terminal event.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{sync_channel, Receiver, SyncSender};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use walkdir::WalkDir;

use crate::catalog::{db_path_key, Catalog};
use crate::config::ScanConfig;
use crate::error::{PipelineError, ScanError};
use crate::filter::PathFilter;
use crate::models::{MediaKind, NewMedia, ReconcileStats, ScanStats};
use crate::timestamp;

/// One event emitted by a scan session
#[derive(Debug, Clone)]
pub enum ScanEvent {
    /// A batch of discovered media paths, in traversal order
    Batch(Vec<PathBuf>),
    /// Emitted after each batch so callers can render "N items found"
    Progress { last_path: PathBuf, total: u64 },
    /// Terminal: the whole tree was walked
    Done(ScanStats),
    /// Terminal: cancellation was observed; already-found paths were flushed
    Cancelled(ScanStats),
    /// Terminal: the root was missing or unreadable; nothing was scanned
    Failed(String),
}

/// Result of asking a session to stop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    /// The worker acknowledged cancellation within the timeout
    Stopped,
    /// The worker did not stop in time; treat it as abandoned
    TimedOut,
}

/// A running scan over one root directory.
///
/// Obtain events from [`ScanSession::events`]; the terminal event is always
/// last and emitted exactly once.
pub struct ScanSession {
    events: Receiver<ScanEvent>,
    cancel: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

impl ScanSession {
    /// Spawn the worker thread and begin scanning.
    pub fn start(config: ScanConfig) -> Self {
        let (tx, rx) = sync_channel(0);
        let cancel = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&cancel);
        let worker = std::thread::spawn(move || run_scan(&config, &tx, &flag));
        Self {
            events: rx,
            cancel,
            worker: Some(worker),
        }
    }

    /// The event stream for this session.
    pub fn events(&self) -> &Receiver<ScanEvent> {
        &self.events
    }

    /// Request cooperative cancellation. Observed at the next directory or
    /// batch boundary.
    pub fn request_cancel(&self) {
        self.cancel.store(true, Ordering::Relaxed);
    }

    /// Request cancellation and wait up to `timeout` for the worker to
    /// finish, discarding any events still in flight. Callers that want the
    /// final flushed batch should drain [`ScanSession::events`] themselves
    /// and watch for [`ScanEvent::Cancelled`] instead.
    pub fn stop(&mut self, timeout: Duration) -> StopOutcome {
        self.request_cancel();
        let deadline = Instant::now() + timeout;
        loop {
            // Keep the rendezvous channel moving so the worker is never
            // stuck in a send while we wait.
            while self.events.try_recv().is_ok() {}

            match &self.worker {
                Some(handle) if !handle.is_finished() => {
                    if Instant::now() >= deadline {
                        return StopOutcome::TimedOut;
                    }
                    std::thread::sleep(Duration::from_millis(5));
                }
                Some(_) => {
                    if let Some(handle) = self.worker.take() {
                        let _ = handle.join();
                    }
                    return StopOutcome::Stopped;
                }
                None => return StopOutcome::Stopped,
            }
        }
    }
}

impl Drop for ScanSession {
    fn drop(&mut self) {
        // The worker exits on its next send once the receiver is gone;
        // set the flag anyway so it stops at a directory boundary too.
        self.cancel.store(true, Ordering::Relaxed);
    }
}

/// Send an event, reporting whether the receiver still exists.
fn emit(tx: &SyncSender<ScanEvent>, event: ScanEvent) -> bool {
    tx.send(event).is_ok()
}

fn run_scan(config: &ScanConfig, tx: &SyncSender<ScanEvent>, cancel: &AtomicBool) {
    let start = Instant::now();

    if !config.root.is_dir() {
        let err = ScanError::RootNotFound(config.root.clone());
        log::error!("{err}");
        emit(tx, ScanEvent::Failed(err.to_string()));
        return;
    }

    let filter = PathFilter::new(config.type_filter, &config.excluded_prefixes);
    let mut stats = ScanStats::default();
    let mut batch: Vec<PathBuf> = Vec::with_capacity(config.batch_size);
    let mut cancelled = false;

    let walker = WalkDir::new(&config.root)
        .follow_links(false)
        .into_iter()
        .filter_entry(|e| !e.file_type().is_dir() || !filter.should_skip_directory(e.path()));

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(_) => {
                // Transient per-file error: skipped, never surfaced
                stats.skipped += 1;
                continue;
            }
        };

        if entry.file_type().is_dir() {
            if cancel.load(Ordering::Relaxed) {
                cancelled = true;
                break;
            }
            stats.dirs += 1;
            continue;
        }
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        if !filter.is_candidate(path) {
            continue;
        }
        if !date_range_admits(path, config) {
            continue;
        }

        batch.push(path.to_path_buf());
        stats.found += 1;

        if batch.len() >= config.batch_size {
            if !flush_batch(tx, &mut batch, stats.found) {
                return;
            }
            if cancel.load(Ordering::Relaxed) {
                cancelled = true;
                break;
            }
        }
    }

    if !batch.is_empty() && !flush_batch(tx, &mut batch, stats.found) {
        return;
    }

    stats.elapsed_ms = start.elapsed().as_millis() as u64;
    if cancelled {
        log::info!("scan cancelled after {} items: {}", stats.found, config.root.display());
        emit(tx, ScanEvent::Cancelled(stats));
    } else {
        log::info!("scan complete, {} items found: {}", stats.found, config.root.display());
        emit(tx, ScanEvent::Done(stats));
    }
}

/// Emit the accumulated batch followed by its progress report.
fn flush_batch(tx: &SyncSender<ScanEvent>, batch: &mut Vec<PathBuf>, total: u64) -> bool {
    let last_path = match batch.last() {
        Some(path) => path.clone(),
        None => return true,
    };
    if !emit(tx, ScanEvent::Batch(std::mem::take(batch))) {
        return false;
    }
    emit(tx, ScanEvent::Progress { last_path, total })
}

/// Date-range admission policy. A file whose capture time cannot be
/// resolved is included: absence of evidence is not evidence of exclusion,
/// and silently dropping files with unreadable metadata would change scan
/// results in ways the user cannot see.
fn date_range_admits(path: &Path, config: &ScanConfig) -> bool {
    match &config.date_range {
        None => true,
        Some(range) => timestamp::in_date_range(path, range) != Some(false),
    }
}

/// Scan a root and reconcile the results into the catalog: register the
/// folder, upsert every discovered file, and mark the rest of the folder's
/// records missing. Missing-marking only runs after a completed scan; a
/// cancelled or failed pass must not flag files it never got to see.
pub fn scan_into_catalog(
    config: &ScanConfig,
    catalog: &mut Catalog,
) -> Result<ReconcileStats, PipelineError> {
    let start = Instant::now();
    log::info!("starting scan: {}", config.root.display());

    let folder_id = catalog.register_folder(&config.root)?;
    let session = ScanSession::start(config.clone());

    let mut seen: HashSet<String> = HashSet::new();
    let mut upserts = 0u64;
    let mut skipped = 0u64;
    let mut completed = false;

    for event in session.events().iter() {
        match event {
            ScanEvent::Batch(paths) => {
                for path in paths {
                    match collect_media(folder_id, &path, config) {
                        Some(media) => {
                            catalog.upsert_media(&media)?;
                            seen.insert(media.path);
                            upserts += 1;
                        }
                        // File vanished between discovery and stat
                        None => skipped += 1,
                    }
                }
            }
            ScanEvent::Progress { last_path, total } => {
                log::debug!("progress: {} items, last {}", total, last_path.display());
            }
            ScanEvent::Done(stats) => {
                skipped += stats.skipped;
                completed = true;
            }
            ScanEvent::Cancelled(stats) => {
                skipped += stats.skipped;
            }
            ScanEvent::Failed(msg) => {
                return Err(PipelineError::ScanFailed(msg));
            }
        }
    }

    let missing_marked = if completed {
        catalog.mark_missing(folder_id, &seen)? as u64
    } else {
        0
    };

    let stats = ReconcileStats {
        folder_id,
        upserts,
        missing_marked,
        skipped,
        elapsed_ms: start.elapsed().as_millis() as u64,
    };
    log::info!(
        "scan finished: folder={} upserts={} missing={} skipped={}",
        stats.folder_id,
        stats.upserts,
        stats.missing_marked,
        stats.skipped
    );
    Ok(stats)
}

/// Gather scan-derived fields for one discovered file. Returns `None` when
/// the file vanished or cannot be stat'ed; the caller skips it silently.
fn collect_media(folder_id: i64, path: &Path, config: &ScanConfig) -> Option<NewMedia> {
    let metadata = std::fs::metadata(path).ok()?;

    let filename = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("")
        .to_string();
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();
    let mtime = metadata
        .modified()
        .ok()
        .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0);

    let created_exif = timestamp::exif_datetime(path).map(timestamp::format_exif);
    let hash = if config.compute_hash {
        compute_file_hash(path, config.large_file_threshold)
    } else {
        None
    };

    Some(NewMedia {
        folder_id,
        path: db_path_key(path),
        filename,
        ext: ext.clone(),
        size: metadata.len(),
        mtime,
        kind: MediaKind::from_extension(&ext),
        width: None,
        height: None,
        duration_s: None,
        hash,
        created_exif,
    })
}

/// Compute an MD5 content hash. Files above `large_file_threshold` get a
/// partial hash over the first and last 1MB.
fn compute_file_hash(path: &Path, large_file_threshold: u64) -> Option<String> {
    use md5::{Digest, Md5};
    use std::fs::File;
    use std::io::{Read, Seek, SeekFrom};

    let mut file = File::open(path).ok()?;
    let file_size = file.metadata().ok()?.len();
    let mut hasher = Md5::new();

    if file_size <= large_file_threshold {
        let mut buffer = Vec::new();
        file.read_to_end(&mut buffer).ok()?;
        hasher.update(&buffer);
    } else {
        let chunk_size = 1024 * 1024;
        let mut buffer = vec![0u8; chunk_size];

        let bytes_read = file.read(&mut buffer).ok()?;
        hasher.update(&buffer[..bytes_read]);

        file.seek(SeekFrom::End(-(chunk_size as i64))).ok()?;
        let bytes_read = file.read(&mut buffer).ok()?;
        hasher.update(&buffer[..bytes_read]);
    }

    Some(format!("{:x}", hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DateRange;
    use chrono::NaiveDate;
    use std::path::PathBuf;

    fn range(sy: i32, ey: i32) -> DateRange {
        DateRange::new(
            NaiveDate::from_ymd_opt(sy, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(ey, 12, 31).unwrap(),
        )
    }

    #[test]
    fn test_date_range_admits_without_range() {
        let config = ScanConfig::new(PathBuf::from("/media"));
        assert!(date_range_admits(Path::new("/no/such/file.jpg"), &config));
    }

    #[test]
    fn test_date_range_admits_unresolvable_timestamp() {
        // Inclusion-on-uncertainty: a file with no resolvable capture time
        // passes an active date range.
        let config = ScanConfig::builder(PathBuf::from("/media"))
            .date_range(range(2000, 2001))
            .build();
        assert!(date_range_admits(Path::new("/no/such/file.jpg"), &config));
    }

    #[test]
    fn test_date_range_excludes_out_of_range_mtime() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("old.mp4");
        std::fs::write(&path, b"x").unwrap();

        let past_only = ScanConfig::builder(PathBuf::from("/media"))
            .date_range(range(1990, 1991))
            .build();
        let covering = ScanConfig::builder(PathBuf::from("/media"))
            .date_range(range(2000, 2200))
            .build();

        assert!(!date_range_admits(&path, &past_only));
        assert!(date_range_admits(&path, &covering));
    }

    #[test]
    fn test_compute_file_hash_small_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.bin");
        std::fs::write(&path, b"hello world").unwrap();

        let hash = compute_file_hash(&path, 1024).unwrap();
        assert_eq!(hash.len(), 32);
        // Same contents, same hash
        assert_eq!(compute_file_hash(&path, 1024).unwrap(), hash);
    }
}
