//! Fuzzy duplicate grouping across a file collection.
//!
//! # Pipeline
//!
//! 1. Derive a [`FeatureSet`] and signature for every input file and
//!    partition into buckets; only files sharing a signature are ever
//!    compared, which keeps the naive O(n²) pairwise pass tractable.
//! 2. Discard singleton buckets.
//! 3. Within a bucket, in input order, seed a group from each unconsumed
//!    file and pull in every later unconsumed file scoring at or above the
//!    threshold. A matched file is consumed: it can neither seed nor join
//!    another group.
//!
//! Grouping is therefore partition-like, not a transitive closure: two
//! files can each resemble a third yet land in different groups depending
//! on processing order. Results are deterministic for a fixed input order,
//! which the walker guarantees.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::cache::TrackMetadata;
use crate::progress::ProgressCallback;

use super::compare::compare;
use super::features::FeatureSet;
use super::groups::{DuplicateGroup, FileInfo};

/// Default minimum overall score for two files to be grouped.
pub const DEFAULT_OVERALL_THRESHOLD: f64 = 78.0;

/// One input file for a duplicate scan.
#[derive(Debug, Clone)]
pub struct CandidateFile {
    /// Full path.
    pub path: PathBuf,
    /// Cached or freshly extracted metadata.
    pub metadata: TrackMetadata,
    /// File size in bytes.
    pub size: u64,
}

impl CandidateFile {
    /// Create a candidate.
    #[must_use]
    pub fn new(path: PathBuf, metadata: TrackMetadata, size: u64) -> Self {
        Self {
            path,
            metadata,
            size,
        }
    }
}

/// Configuration for duplicate grouping.
#[derive(Clone, Default)]
pub struct FinderConfig {
    /// Minimum overall score; `None` uses [`DEFAULT_OVERALL_THRESHOLD`].
    pub overall_threshold: Option<f64>,
    /// Optional progress callback, invoked between files.
    pub progress_callback: Option<Arc<dyn ProgressCallback>>,
    /// Optional cooperative cancellation flag, checked between files.
    pub cancel_flag: Option<Arc<AtomicBool>>,
}

impl std::fmt::Debug for FinderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FinderConfig")
            .field("overall_threshold", &self.overall_threshold)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<callback>"),
            )
            .field("cancel_flag", &self.cancel_flag)
            .finish()
    }
}

impl FinderConfig {
    /// Set the overall score threshold.
    #[must_use]
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.overall_threshold = Some(threshold);
        self
    }

    /// Set the progress callback.
    #[must_use]
    pub fn with_progress_callback(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    /// Set the cooperative cancellation flag.
    #[must_use]
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel_flag = Some(flag);
        self
    }

    fn threshold(&self) -> f64 {
        self.overall_threshold.unwrap_or(DEFAULT_OVERALL_THRESHOLD)
    }

    fn is_cancelled(&self) -> bool {
        self.cancel_flag
            .as_ref()
            .is_some_and(|f| f.load(Ordering::SeqCst))
    }
}

/// Statistics from one grouping pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FinderStats {
    /// Files that entered the pass.
    pub input_files: usize,
    /// Signature buckets formed.
    pub buckets: usize,
    /// Buckets with 2+ files, the only ones compared.
    pub candidate_buckets: usize,
    /// Pairwise comparisons performed.
    pub comparisons: usize,
    /// Files that ended up in a duplicate group.
    pub grouped_files: usize,
    /// Whether the pass stopped early on the cancellation flag.
    pub interrupted: bool,
}

/// Groups probable duplicates within a candidate collection.
#[derive(Debug, Default)]
pub struct DuplicateFinder {
    config: FinderConfig,
}

impl DuplicateFinder {
    /// Create a finder with the given configuration.
    #[must_use]
    pub fn new(config: FinderConfig) -> Self {
        Self { config }
    }

    /// Create a finder with default configuration.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(FinderConfig::default())
    }

    /// Find duplicate groups in `files`.
    ///
    /// Order-sensitive: bucket contents are processed in input order and
    /// grouping is first-match-wins, so callers must supply a stable
    /// ordering (the walker's sorted enumeration) for reproducible output.
    #[must_use]
    pub fn find_duplicates(&self, files: &[CandidateFile]) -> (Vec<DuplicateGroup>, FinderStats) {
        let threshold = self.config.threshold();
        let mut stats = FinderStats {
            input_files: files.len(),
            ..Default::default()
        };

        // Bucket by signature, preserving input order within each bucket.
        let mut buckets: HashMap<String, Vec<(usize, FeatureSet)>> = HashMap::new();
        let mut bucket_order: Vec<String> = Vec::new();
        for (index, file) in files.iter().enumerate() {
            let features = FeatureSet::derive(&file.path, &file.metadata, file.size);
            let signature = features.signature();
            let slot = buckets.entry(signature.clone()).or_default();
            if slot.is_empty() {
                bucket_order.push(signature);
            }
            slot.push((index, features));
        }
        stats.buckets = buckets.len();

        if let Some(ref callback) = self.config.progress_callback {
            callback.on_phase_start("comparing", files.len());
        }
        log::info!(
            "Comparing {} file(s) across {} signature bucket(s)",
            files.len(),
            stats.buckets
        );

        let mut groups = Vec::new();
        let mut consumed = vec![false; files.len()];
        let mut processed_count = 0usize;

        'buckets: for signature in &bucket_order {
            let members = &buckets[signature];
            if members.len() < 2 {
                processed_count += members.len();
                continue;
            }
            stats.candidate_buckets += 1;
            log::debug!(
                "Bucket {:?}: {} candidate file(s)",
                signature,
                members.len()
            );

            for (position, (seed_index, seed_features)) in members.iter().enumerate() {
                if consumed[*seed_index] {
                    continue;
                }
                if self.config.is_cancelled() {
                    stats.interrupted = true;
                    log::info!("Duplicate grouping cancelled between files");
                    break 'buckets;
                }

                processed_count += 1;
                if let Some(ref callback) = self.config.progress_callback {
                    callback.on_progress(
                        processed_count,
                        files.len(),
                        files[*seed_index].path.to_string_lossy().as_ref(),
                    );
                }

                // Seed at similarity 100; later matches are consumed so the
                // grouping stays a partition of the bucket.
                let mut matched =
                    vec![FileInfo::new(&files[*seed_index].path, seed_features, 100.0)];

                for (other_index, other_features) in &members[position + 1..] {
                    if consumed[*other_index] {
                        continue;
                    }
                    stats.comparisons += 1;
                    let breakdown = compare(seed_features, other_features);
                    if breakdown.overall >= threshold {
                        log::trace!(
                            "Match {:.2}: {} ~ {}",
                            breakdown.overall,
                            files[*seed_index].path.display(),
                            files[*other_index].path.display()
                        );
                        matched.push(FileInfo::new(
                            &files[*other_index].path,
                            other_features,
                            breakdown.overall,
                        ));
                        consumed[*other_index] = true;
                        processed_count += 1;
                    }
                }

                if matched.len() > 1 {
                    consumed[*seed_index] = true;
                    stats.grouped_files += matched.len();
                    groups.push(DuplicateGroup::assemble(matched));
                }
            }
        }

        if let Some(ref callback) = self.config.progress_callback {
            callback.on_phase_end("comparing");
        }
        log::info!(
            "Found {} duplicate group(s) covering {} file(s) ({} comparison(s))",
            groups.len(),
            stats.grouped_files,
            stats.comparisons
        );

        (groups, stats)
    }
}
