//! The scan pipeline: enumerate → reconcile → refresh → group.
//!
//! Per-file failures are isolated: one unreadable or unparseable file is
//! recorded as needing attention and the scan moves on. Only two things
//! are fatal — the scan root being unusable, and the store refusing to
//! open (handled by the caller before a scan starts).

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use rayon::prelude::*;
use serde::Serialize;

use crate::cache::entry::system_time_to_ns;
use crate::cache::{ChangeDetector, FileStateStore, FingerprintPolicy, Staleness};
use crate::duplicates::{
    CandidateFile, DuplicateFinder, DuplicateGroup, DuplicateStats, FinderConfig, FinderStats,
};
use crate::metadata::MetadataExtractor;
use crate::progress::ProgressCallback;
use crate::scanner::walker::{enumerate_with_extensions, WalkError};
use crate::scanner::{quick_fingerprint, FingerprintError};

/// Errors that abort a scan outright.
#[derive(thiserror::Error, Debug)]
pub enum ScanError {
    /// Another scan is already in progress; the store is not designed for
    /// two concurrent full-scan writers.
    #[error("A scan is already in progress")]
    AlreadyRunning,

    /// The scan root could not be enumerated at all.
    #[error("Cannot enumerate scan root: {0}")]
    Enumeration(#[from] WalkError),

    /// The background scan worker died without producing a result.
    #[error("Scan worker failed: {0}")]
    Worker(String),
}

/// Tunables for one scan invocation.
#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// Fingerprint policy for staleness checks.
    pub fingerprint_policy: FingerprintPolicy,
    /// Request a deep check (fingerprint comparison under the on-demand policy).
    pub deep: bool,
    /// Overall similarity threshold; `None` uses the default (78).
    pub overall_threshold: Option<f64>,
    /// I/O parallelism for the refresh phase. Bounded to avoid disk thrashing.
    pub io_threads: usize,
    /// Extra audio extensions from user configuration (lowercase, no dot).
    pub extra_extensions: Vec<String>,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            fingerprint_policy: FingerprintPolicy::OnDemand,
            deep: false,
            overall_threshold: None,
            io_threads: 4,
            extra_extensions: Vec::new(),
        }
    }
}

/// Counters and problem paths from one scan.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ScanSummary {
    /// Audio files enumerated under the root.
    pub files_seen: usize,
    /// Files served from cache without re-extraction.
    pub cache_fresh: usize,
    /// Files re-extracted and upserted.
    pub refreshed: usize,
    /// Files that vanished between enumeration and refresh.
    pub vanished: usize,
    /// Files not examined because the scan was cancelled.
    pub skipped: usize,
    /// Paths whose extraction or fingerprinting failed; not cached as
    /// valid, surfaced for operator attention.
    pub needs_attention: Vec<PathBuf>,
    /// Row writes that failed; those files keep their previous cache state.
    pub store_write_failures: usize,
    /// Cache entries removed by reconciliation.
    pub reconcile_removed: usize,
    /// True when reconciliation was skipped because enumeration was
    /// incomplete; a partial listing must never evict live entries.
    pub reconcile_skipped: bool,
    /// True when the scan stopped early on the cancellation flag.
    pub interrupted: bool,
    /// Wall-clock seconds for the whole scan.
    pub elapsed_secs: f64,
}

impl ScanSummary {
    /// Whether any non-fatal per-file problems occurred.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        !self.needs_attention.is_empty() || self.store_write_failures > 0
    }
}

/// Everything a completed scan produced.
#[derive(Debug)]
pub struct ScanReport {
    /// Duplicate groups found.
    pub groups: Vec<DuplicateGroup>,
    /// Aggregate statistics over the groups.
    pub stats: DuplicateStats,
    /// Bucketing and comparison counters.
    pub finder_stats: FinderStats,
    /// Refresh-phase counters and problem paths.
    pub summary: ScanSummary,
}

enum RefreshOutcome {
    Fresh,
    Refreshed,
    Vanished,
    Skipped,
    NeedsAttention(PathBuf),
    StoreWriteFailed,
}

/// Run a full scan of `root` against `store`.
///
/// Blocking; callers wanting a background scan go through
/// [`crate::session::ScanScheduler`].
pub fn run_scan(
    store: &FileStateStore,
    extractor: &dyn MetadataExtractor,
    root: &Path,
    options: &ScanOptions,
    progress: Option<Arc<dyn ProgressCallback>>,
    cancel: Option<Arc<AtomicBool>>,
) -> Result<ScanReport, ScanError> {
    let started = Instant::now();
    let mut summary = ScanSummary::default();

    // Phase 1: enumerate.
    if let Some(ref cb) = progress {
        cb.on_phase_start("enumerating", 0);
    }
    let listing = enumerate_with_extensions(root, &options.extra_extensions)?;
    if let Some(ref cb) = progress {
        cb.on_phase_end("enumerating");
    }
    summary.files_seen = listing.files.len();
    log::info!(
        "Scan of {}: {} audio file(s) enumerated",
        root.display(),
        listing.files.len()
    );

    // Phase 2: reconcile, only against a complete listing.
    if listing.is_complete() {
        match store.reconcile(&listing.files.iter().cloned().collect::<HashSet<_>>()) {
            Ok(removed) => summary.reconcile_removed = removed,
            Err(e) => {
                log::warn!("Reconciliation failed, continuing without it: {}", e);
                summary.reconcile_skipped = true;
            }
        }
    } else {
        log::warn!(
            "Enumeration saw {} error(s); skipping reconciliation to avoid evicting live entries",
            listing.errors.len()
        );
        summary.reconcile_skipped = true;
    }

    // Phase 3: refresh stale entries, bounded I/O parallelism.
    let detector = ChangeDetector::new(store, options.fingerprint_policy);
    let fingerprint_wanted = options.fingerprint_policy != FingerprintPolicy::Disabled;
    if let Some(ref cb) = progress {
        cb.on_phase_start("refreshing", listing.files.len());
    }

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(options.io_threads.max(1))
        .build()
        .map_err(|e| ScanError::Worker(e.to_string()))?;

    let processed = AtomicUsize::new(0);
    let cancelled = || cancel.as_ref().is_some_and(|f| f.load(Ordering::SeqCst));

    let outcomes: Vec<RefreshOutcome> = pool.install(|| {
        listing
            .files
            .par_iter()
            .map(|path| {
                if cancelled() {
                    return RefreshOutcome::Skipped;
                }
                let current = processed.fetch_add(1, Ordering::Relaxed) + 1;
                if let Some(ref cb) = progress {
                    cb.on_progress(current, listing.files.len(), path.to_string_lossy().as_ref());
                }
                refresh_one(store, &detector, extractor, path, options.deep, fingerprint_wanted)
            })
            .collect()
    });

    if let Some(ref cb) = progress {
        cb.on_phase_end("refreshing");
    }

    for outcome in outcomes {
        match outcome {
            RefreshOutcome::Fresh => summary.cache_fresh += 1,
            RefreshOutcome::Refreshed => summary.refreshed += 1,
            RefreshOutcome::Vanished => summary.vanished += 1,
            RefreshOutcome::Skipped => summary.skipped += 1,
            RefreshOutcome::NeedsAttention(path) => summary.needs_attention.push(path),
            RefreshOutcome::StoreWriteFailed => summary.store_write_failures += 1,
        }
    }
    summary.needs_attention.sort();

    if cancelled() {
        summary.interrupted = true;
        summary.elapsed_secs = started.elapsed().as_secs_f64();
        log::info!("Scan cancelled during refresh phase");
        return Ok(ScanReport {
            groups: Vec::new(),
            stats: DuplicateStats::default(),
            finder_stats: FinderStats::default(),
            summary,
        });
    }

    // Phase 4: group duplicates from cached state, preserving enumeration order.
    let mut candidates = Vec::with_capacity(listing.files.len());
    for path in &listing.files {
        match store.get(path) {
            Ok(Some(entry)) => {
                candidates.push(CandidateFile::new(path.clone(), entry.metadata, entry.size));
            }
            Ok(None) => {
                // Extraction failed for this path; already recorded above.
            }
            Err(e) => {
                log::warn!("Cache read failed for {}: {}", path.display(), e);
            }
        }
    }

    let mut finder_config = FinderConfig::default();
    if let Some(threshold) = options.overall_threshold {
        finder_config = finder_config.with_threshold(threshold);
    }
    if let Some(ref cb) = progress {
        finder_config = finder_config.with_progress_callback(Arc::clone(cb));
    }
    if let Some(ref flag) = cancel {
        finder_config = finder_config.with_cancel_flag(Arc::clone(flag));
    }

    let (groups, finder_stats) = DuplicateFinder::new(finder_config).find_duplicates(&candidates);
    summary.interrupted = finder_stats.interrupted;
    summary.elapsed_secs = started.elapsed().as_secs_f64();

    let stats = DuplicateStats::collect(&groups);
    Ok(ScanReport {
        groups,
        stats,
        finder_stats,
        summary,
    })
}

fn refresh_one(
    store: &FileStateStore,
    detector: &ChangeDetector<'_>,
    extractor: &dyn MetadataExtractor,
    path: &Path,
    deep: bool,
    fingerprint_wanted: bool,
) -> RefreshOutcome {
    let staleness = match detector.check(path, deep) {
        Ok(staleness) => staleness,
        Err(e) => {
            log::warn!("Fingerprint check failed for {}: {}", path.display(), e);
            return RefreshOutcome::NeedsAttention(path.to_path_buf());
        }
    };

    match staleness {
        Staleness::Fresh => return RefreshOutcome::Fresh,
        Staleness::Missing => {
            // Raced with a delete; reconciliation on the next scan purges it.
            log::debug!("{} vanished before refresh", path.display());
            return RefreshOutcome::Vanished;
        }
        _ => {}
    }

    let stat = match std::fs::metadata(path) {
        Ok(stat) => stat,
        Err(_) => return RefreshOutcome::Vanished,
    };

    let extraction = match extractor.extract(path) {
        Ok(extraction) => extraction,
        Err(e) => {
            log::warn!("Extraction failed for {}: {}", path.display(), e);
            return RefreshOutcome::NeedsAttention(path.to_path_buf());
        }
    };

    let fingerprint = if fingerprint_wanted {
        match quick_fingerprint(path) {
            Ok(fp) => Some(fp),
            Err(FingerprintError::Empty(_)) => {
                // A zero-byte audio file is not valid cached data.
                log::warn!("Refusing to cache empty file {}", path.display());
                return RefreshOutcome::NeedsAttention(path.to_path_buf());
            }
            Err(e) => {
                log::warn!("Fingerprint failed for {}: {}", path.display(), e);
                return RefreshOutcome::NeedsAttention(path.to_path_buf());
            }
        }
    } else {
        None
    };

    let modified_at_ns = stat.modified().map(system_time_to_ns).unwrap_or(0);
    match store.upsert(
        path,
        stat.len(),
        modified_at_ns,
        &extraction.metadata,
        &extraction.current_tags,
        fingerprint,
    ) {
        Ok(()) => RefreshOutcome::Refreshed,
        Err(e) => {
            // Treat as "this file's cache is unchanged" and continue.
            log::error!("Cache write failed for {}: {}", path.display(), e);
            RefreshOutcome::StoreWriteFailed
        }
    }
}
