//! Background scan sessions.
//!
//! A [`ScanScheduler`] owns at most one running scan. Starting a second
//! while the first is still going fails with [`ScanError::AlreadyRunning`];
//! the old world of overlapping scans corrupting each other's progress
//! numbers is designed out rather than locked around.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use crate::cache::FileStateStore;
use crate::metadata::MetadataExtractor;
use crate::progress::ProgressCallback;
use crate::scan::{run_scan, ScanError, ScanOptions, ScanReport};

/// A point-in-time view of scan progress, readable from any thread.
#[derive(Debug, Clone, Default)]
pub struct ProgressSnapshot {
    /// Current phase ("enumerating", "refreshing", "comparing"), empty
    /// before the scan starts and after it ends.
    pub phase: String,
    /// Files processed within the current phase.
    pub processed: usize,
    /// Total files in the current phase, 0 when unknown.
    pub total: usize,
    /// Path most recently worked on.
    pub current_path: String,
}

/// Progress callback that publishes snapshots and optionally forwards to a
/// downstream callback (the CLI's indicatif bars, for instance).
struct SnapshotProgress {
    snapshot: Arc<Mutex<ProgressSnapshot>>,
    downstream: Option<Arc<dyn ProgressCallback>>,
}

impl ProgressCallback for SnapshotProgress {
    fn on_phase_start(&self, phase: &str, total: usize) {
        if let Ok(mut snap) = self.snapshot.lock() {
            snap.phase = phase.to_string();
            snap.processed = 0;
            snap.total = total;
            snap.current_path.clear();
        }
        if let Some(ref downstream) = self.downstream {
            downstream.on_phase_start(phase, total);
        }
    }

    fn on_progress(&self, current: usize, total: usize, path: &str) {
        if let Ok(mut snap) = self.snapshot.lock() {
            snap.processed = current;
            snap.total = total;
            snap.current_path = path.to_string();
        }
        if let Some(ref downstream) = self.downstream {
            downstream.on_progress(current, total, path);
        }
    }

    fn on_phase_end(&self, phase: &str) {
        if let Ok(mut snap) = self.snapshot.lock() {
            snap.phase.clear();
            snap.current_path.clear();
        }
        if let Some(ref downstream) = self.downstream {
            downstream.on_phase_end(phase);
        }
    }
}

/// Handle to one background scan.
pub struct ScanSession {
    handle: JoinHandle<Result<ScanReport, ScanError>>,
    cancel: Arc<AtomicBool>,
    snapshot: Arc<Mutex<ProgressSnapshot>>,
    root: PathBuf,
}

impl ScanSession {
    /// The root directory this session is scanning.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Whether the background thread has finished.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Current progress. Cheap; safe to poll from a UI loop.
    #[must_use]
    pub fn progress(&self) -> ProgressSnapshot {
        self.snapshot
            .lock()
            .map(|snap| snap.clone())
            .unwrap_or_default()
    }

    /// Request cooperative cancellation. The scan stops between files.
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::SeqCst);
    }

    /// Block until the scan finishes and return its result.
    pub fn join(self) -> Result<ScanReport, ScanError> {
        match self.handle.join() {
            Ok(result) => result,
            Err(_) => {
                log::error!("Scan thread panicked");
                Err(ScanError::Worker("scan thread panicked".to_string()))
            }
        }
    }
}

/// Admits at most one scan at a time.
#[derive(Default)]
pub struct ScanScheduler {
    active: Mutex<Option<ScanSession>>,
}

impl ScanScheduler {
    /// Create an idle scheduler.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a scan is currently running.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.active
            .lock()
            .map(|slot| slot.as_ref().is_some_and(|s| !s.is_finished()))
            .unwrap_or(false)
    }

    /// Start a background scan of `root`.
    ///
    /// Fails with [`ScanError::AlreadyRunning`] while a previous session is
    /// still live; a finished session is evicted and replaced.
    pub fn start(
        &self,
        store: Arc<FileStateStore>,
        extractor: Arc<dyn MetadataExtractor>,
        root: &Path,
        options: ScanOptions,
        downstream: Option<Arc<dyn ProgressCallback>>,
    ) -> Result<(), ScanError> {
        let mut slot = match self.active.lock() {
            Ok(slot) => slot,
            Err(poisoned) => poisoned.into_inner(),
        };
        if slot.as_ref().is_some_and(|s| !s.is_finished()) {
            return Err(ScanError::AlreadyRunning);
        }

        let cancel = Arc::new(AtomicBool::new(false));
        let snapshot = Arc::new(Mutex::new(ProgressSnapshot::default()));
        let progress: Arc<dyn ProgressCallback> = Arc::new(SnapshotProgress {
            snapshot: Arc::clone(&snapshot),
            downstream,
        });

        let root_buf = root.to_path_buf();
        let thread_root = root_buf.clone();
        let thread_cancel = Arc::clone(&cancel);
        let handle = std::thread::Builder::new()
            .name("scan".to_string())
            .spawn(move || {
                run_scan(
                    &store,
                    extractor.as_ref(),
                    &thread_root,
                    &options,
                    Some(progress),
                    Some(thread_cancel),
                )
            })
            .map_err(|e| {
                log::error!("Failed to spawn scan thread: {}", e);
                ScanError::Worker(e.to_string())
            })?;

        *slot = Some(ScanSession {
            handle,
            cancel,
            snapshot,
            root: root_buf,
        });
        Ok(())
    }

    /// Take the current session out of the scheduler, running or not.
    pub fn take(&self) -> Option<ScanSession> {
        match self.active.lock() {
            Ok(mut slot) => slot.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        }
    }

    /// Cancel the running session, if any.
    pub fn cancel(&self) {
        if let Ok(slot) = self.active.lock() {
            if let Some(ref session) = *slot {
                session.cancel();
            }
        }
    }
}
