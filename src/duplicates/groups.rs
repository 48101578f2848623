//! Duplicate group structures and aggregate statistics.

use serde::Serialize;
use std::path::{Path, PathBuf};

use super::features::FeatureSet;

/// Report-ready information about one file in a duplicate group.
#[derive(Debug, Clone, Serialize)]
pub struct FileInfo {
    /// Full path.
    pub path: PathBuf,
    /// File name component.
    pub filename: String,
    /// Size in bytes.
    pub size: u64,
    /// Duration in seconds.
    pub duration_secs: f64,
    /// Bitrate in kbps, 0 when unknown.
    pub bitrate_kbps: u32,
    /// Normalized title, "Unknown" when the file carried none.
    pub title: String,
    /// Normalized artist, "Unknown" when the file carried none.
    pub artist: String,
    /// Normalized album, "Unknown" when the file carried none.
    pub album: String,
    /// Similarity to the group's best match (100 for the best match itself).
    pub similarity: f64,
    /// Lowercased extension with the dot.
    pub extension: String,
}

impl FileInfo {
    /// Build report info from a path, its features, and its similarity to
    /// the group seed.
    #[must_use]
    pub fn new(path: &Path, features: &FeatureSet, similarity: f64) -> Self {
        Self {
            path: path.to_path_buf(),
            filename: path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            size: features.size,
            duration_secs: features.duration_secs,
            bitrate_kbps: features.bitrate_kbps,
            title: or_unknown(&features.title),
            artist: or_unknown(&features.artist),
            album: or_unknown(&features.album),
            similarity,
            extension: features.extension.clone(),
        }
    }
}

fn or_unknown(value: &str) -> String {
    if value.is_empty() {
        "Unknown".to_string()
    } else {
        value.to_string()
    }
}

/// A cluster of probable duplicates found in one scan.
///
/// Transient: built once per scan and returned to the caller; never merged
/// against the results of a previous scan.
#[derive(Debug, Clone, Serialize)]
pub struct DuplicateGroup {
    /// Short stable identifier derived from the best-match path and the
    /// group size.
    pub id: String,
    /// The member designated as canonical: the seed, which scores 100
    /// against itself and therefore sorts first.
    pub best_match: PathBuf,
    /// Members sorted by similarity descending.
    pub files: Vec<FileInfo>,
}

impl DuplicateGroup {
    /// Assemble a group from members already scored against the seed.
    ///
    /// Members are sorted by similarity descending; the first becomes the
    /// best match.
    #[must_use]
    pub fn assemble(mut files: Vec<FileInfo>) -> Self {
        files.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        let best_match = files
            .first()
            .map(|f| f.path.clone())
            .unwrap_or_default();
        let id = group_id(&best_match, files.len());
        Self {
            id,
            best_match,
            files,
        }
    }

    /// Number of members.
    #[must_use]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Whether the group has no members.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Bytes freed if every member except the largest were removed.
    #[must_use]
    pub fn reclaimable_bytes(&self) -> u64 {
        let total: u64 = self.files.iter().map(|f| f.size).sum();
        let largest = self.files.iter().map(|f| f.size).max().unwrap_or(0);
        total - largest
    }
}

/// Short stable group identifier: hash of best-match path and group size.
fn group_id(best_match: &Path, len: usize) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(best_match.to_string_lossy().as_bytes());
    hasher.update(&(len as u64).to_le_bytes());
    hasher.finalize().to_hex()[..8].to_string()
}

/// Aggregate statistics over all groups of one scan.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DuplicateStats {
    /// Number of duplicate groups.
    pub group_count: usize,
    /// Total files across all groups.
    pub file_count: usize,
    /// Total bytes reclaimable (keep the largest member of each group).
    pub reclaimable_bytes: u64,
    /// Mean group size, rounded to one decimal; 0 when no groups.
    pub average_group_size: f64,
}

impl DuplicateStats {
    /// Compute statistics for a set of groups.
    #[must_use]
    pub fn collect(groups: &[DuplicateGroup]) -> Self {
        let group_count = groups.len();
        let file_count: usize = groups.iter().map(DuplicateGroup::len).sum();
        let reclaimable_bytes: u64 = groups.iter().map(DuplicateGroup::reclaimable_bytes).sum();
        let average_group_size = if group_count == 0 {
            0.0
        } else {
            (file_count as f64 / group_count as f64 * 10.0).round() / 10.0
        };
        Self {
            group_count,
            file_count,
            reclaimable_bytes,
            average_group_size,
        }
    }
}
