//! Fuzzy duplicate detection.
//!
//! Pure computation over per-file features: bucketing, multi-factor
//! scoring, and first-match-wins grouping. All file I/O happens before
//! this module runs.

pub mod compare;
pub mod features;
pub mod finder;
pub mod groups;

pub use compare::{compare, ScoreBreakdown, ScoreDetails};
pub use features::{normalize, FeatureSet};
pub use finder::{
    CandidateFile, DuplicateFinder, FinderConfig, FinderStats, DEFAULT_OVERALL_THRESHOLD,
};
pub use groups::{DuplicateGroup, DuplicateStats, FileInfo};
