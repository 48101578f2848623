//! Cache entry definitions.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Custom tag name → value mapping, as last observed embedded in a file.
///
/// Ordered so that serialized entries and report output are deterministic.
pub type TagMap = BTreeMap<String, String>;

/// Structured metadata for a single audio track.
///
/// This is the shape produced by the extractor boundary: every field is
/// already normalized to "first value or empty", so nothing downstream
/// has to branch on list-versus-scalar tag representations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrackMetadata {
    /// Track title. Falls back to the filename stem when the file has no title tag.
    #[serde(default)]
    pub title: String,
    /// Track artist.
    #[serde(default)]
    pub artist: String,
    /// Album artist, when distinct from the track artist.
    #[serde(default)]
    pub album_artist: String,
    /// Album title.
    #[serde(default)]
    pub album: String,
    /// Playback duration in seconds.
    #[serde(default)]
    pub duration_secs: f64,
    /// Audio bitrate in kbps, 0 when unknown.
    #[serde(default)]
    pub bitrate_kbps: u32,
    /// Track number as written in the tag (kept textual: "3", "03", "3/12").
    #[serde(default)]
    pub track_number: String,
    /// Release year or date as written in the tag.
    #[serde(default)]
    pub year: String,
}

/// One persisted row of the file-state store: the last-known on-disk state
/// and extraction result for a single tracked path.
///
/// An entry exists only for a file that existed at some scan time. Entries
/// for files no longer on disk are removed by an explicit
/// [`reconcile`](crate::cache::FileStateStore::reconcile) pass, never as a
/// side effect of a read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileStateEntry {
    /// Absolute path, the unique key.
    pub path: PathBuf,
    /// File size in bytes, last observed.
    pub size: u64,
    /// Modification time, last observed, as unix nanoseconds.
    pub modified_at_ns: i64,
    /// When this entry was last refreshed, as unix seconds.
    pub scanned_at: i64,
    /// Quick content fingerprint (size + head + tail, xxh64), if one has
    /// been computed. Secondary invalidation signal for in-place rewrites
    /// that preserve size and mtime.
    pub fingerprint: Option<u64>,
    /// Last known metadata extraction result.
    pub metadata: TrackMetadata,
    /// Custom tags as last observed embedded in the file.
    pub current_tags: TagMap,
}

impl FileStateEntry {
    /// Check whether the stored size and mtime match the given on-disk stat.
    #[must_use]
    pub fn matches_stat(&self, size: u64, modified_at_ns: i64) -> bool {
        self.size == size && self.modified_at_ns == modified_at_ns
    }
}

/// Convert a [`std::time::SystemTime`] to unix nanoseconds.
///
/// Times before the epoch clamp to 0; they do not occur on real file systems
/// and an exact value is only needed for equality comparison.
#[must_use]
pub fn system_time_to_ns(time: std::time::SystemTime) -> i64 {
    time.duration_since(std::time::UNIX_EPOCH)
        .map(|d| i64::try_from(d.as_nanos()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, SystemTime, UNIX_EPOCH};

    fn make_entry() -> FileStateEntry {
        FileStateEntry {
            path: PathBuf::from("/music/a.flac"),
            size: 1024,
            modified_at_ns: 5_000_000_000,
            scanned_at: 100,
            fingerprint: Some(0xDEAD_BEEF),
            metadata: TrackMetadata::default(),
            current_tags: TagMap::new(),
        }
    }

    #[test]
    fn test_matches_stat() {
        let entry = make_entry();
        assert!(entry.matches_stat(1024, 5_000_000_000));
        assert!(!entry.matches_stat(1025, 5_000_000_000));
        assert!(!entry.matches_stat(1024, 5_000_000_001));
    }

    #[test]
    fn test_system_time_to_ns() {
        let t = UNIX_EPOCH + Duration::from_secs(5);
        assert_eq!(system_time_to_ns(t), 5_000_000_000);
    }

    #[test]
    fn test_system_time_before_epoch_clamps() {
        let t = UNIX_EPOCH - Duration::from_secs(5);
        assert_eq!(system_time_to_ns(t), 0);
    }

    #[test]
    fn test_entry_serde_round_trip() {
        let mut entry = make_entry();
        entry.metadata.title = "Test Song".to_string();
        entry
            .current_tags
            .insert("energy".to_string(), "7".to_string());

        let json = serde_json::to_string(&entry).unwrap();
        let back: FileStateEntry = serde_json::from_str(&json).unwrap();
        assert_eq!(entry, back);
    }

    #[test]
    fn test_metadata_defaults_on_missing_fields() {
        // Older cache rows may predate newly added metadata fields.
        let meta: TrackMetadata = serde_json::from_str(r#"{"title":"X"}"#).unwrap();
        assert_eq!(meta.title, "X");
        assert_eq!(meta.bitrate_kbps, 0);
        assert_eq!(meta.duration_secs, 0.0);
    }

    #[test]
    fn test_system_time_now_is_positive() {
        assert!(system_time_to_ns(SystemTime::now()) > 0);
    }
}
