//! Per-file comparable features and signature bucketing.
//!
//! A [`FeatureSet`] is ephemeral: derived from cached metadata plus file
//! stat for the duration of one duplicate scan, never persisted.

use std::path::Path;

use crate::cache::TrackMetadata;

/// Words stripped before comparison; they add noise and cause false
/// mismatches ("The Song" vs "Song").
const STOPWORDS: &[&str] = &[
    "the", "a", "an", "and", "or", "but", "in", "on", "at", "to", "for", "of", "with", "by",
];

/// Duration bucket width in seconds for the coarse signature.
const DURATION_BUCKET_SECS: f64 = 30.0;

/// Size bucket width in bytes for the coarse signature.
const SIZE_BUCKET_BYTES: u64 = 1024 * 1024;

/// Normalized, comparable features of one audio file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureSet {
    /// Normalized filename stem.
    pub filename: String,
    /// Normalized title.
    pub title: String,
    /// Normalized artist.
    pub artist: String,
    /// Normalized album artist, empty when absent.
    pub album_artist: String,
    /// Normalized album.
    pub album: String,
    /// Duration in seconds.
    pub duration_secs: f64,
    /// File size in bytes.
    pub size: u64,
    /// Bitrate in kbps, 0 when unknown.
    pub bitrate_kbps: u32,
    /// Track number as tagged.
    pub track_number: String,
    /// Year as tagged.
    pub year: String,
    /// Lowercased file extension with the dot (".flac").
    pub extension: String,
}

impl FeatureSet {
    /// Derive features from a path, its cached metadata, and its size.
    #[must_use]
    pub fn derive(path: &Path, metadata: &TrackMetadata, size: u64) -> Self {
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let extension = path
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy().to_lowercase()))
            .unwrap_or_default();

        Self {
            filename: normalize(&stem),
            title: normalize(&metadata.title),
            artist: normalize(&metadata.artist),
            album_artist: normalize(&metadata.album_artist),
            album: normalize(&metadata.album),
            duration_secs: metadata.duration_secs,
            size,
            bitrate_kbps: metadata.bitrate_kbps,
            track_number: metadata.track_number.clone(),
            year: metadata.year.clone(),
            extension,
        }
    }

    /// Coarse bucketing signature: truncated artist and title plus a rough
    /// duration bucket, spaces removed. When duration is unknown, a 1 MiB
    /// size bucket stands in as the numeric discriminator — size cannot be
    /// part of the signature otherwise, or a lossless rip and its lossy
    /// copy would never share a bucket.
    ///
    /// True duplicates almost always share this; near-duplicates whose
    /// artist or title diverge within the first ten characters land in
    /// different buckets and are never compared. That false-negative risk
    /// is the accepted price of avoiding full pairwise comparison.
    #[must_use]
    pub fn signature(&self) -> String {
        let mut signature = String::new();
        signature.extend(self.artist.chars().take(10));
        signature.extend(self.title.chars().take(10));
        if self.duration_secs > 0.0 {
            let duration_bucket =
                (self.duration_secs / DURATION_BUCKET_SECS) as u64 * DURATION_BUCKET_SECS as u64;
            signature.push_str(&duration_bucket.to_string());
        } else {
            signature.push('0');
            signature.push_str(&(self.size / SIZE_BUCKET_BYTES).to_string());
        }
        signature.retain(|c| c != ' ');
        signature
    }
}

/// Normalize a string for fuzzy comparison: lowercase, strip punctuation,
/// collapse whitespace, drop stopwords.
#[must_use]
pub fn normalize(text: &str) -> String {
    let cleaned: String = text
        .trim()
        .to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace() || *c == '_')
        .collect();

    cleaned
        .split_whitespace()
        .filter(|word| !STOPWORDS.contains(word))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn meta(title: &str, artist: &str, duration: f64) -> TrackMetadata {
        TrackMetadata {
            title: title.to_string(),
            artist: artist.to_string(),
            duration_secs: duration,
            ..Default::default()
        }
    }

    #[test]
    fn test_normalize_lowercases_and_strips_punctuation() {
        assert_eq!(normalize("Hello, World!"), "hello world");
        assert_eq!(normalize("  Don't  Stop  "), "dont stop");
    }

    #[test]
    fn test_normalize_removes_stopwords() {
        assert_eq!(normalize("The Rise and Fall of a Star"), "rise fall star");
        assert_eq!(normalize("Dancing in the Dark"), "dancing dark");
    }

    #[test]
    fn test_normalize_keeps_stopword_substrings() {
        // "theory" contains "the" but is not a stopword.
        assert_eq!(normalize("Theory of Everything"), "theory everything");
    }

    #[test]
    fn test_normalize_empty() {
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("   "), "");
        assert_eq!(normalize("!!!"), "");
    }

    #[test]
    fn test_normalize_idempotent() {
        let once = normalize("The Quick!! Brown Fox");
        assert_eq!(normalize(&once), once);
    }

    #[test]
    fn test_derive_uses_filename_stem_and_extension() {
        let features = FeatureSet::derive(
            &PathBuf::from("/music/Artist - The Song.FLAC"),
            &meta("The Song", "Artist X", 181.0),
            1024,
        );
        assert_eq!(features.filename, "artist song");
        assert_eq!(features.extension, ".flac");
        assert_eq!(features.title, "song");
        assert_eq!(features.artist, "artist x");
        assert_eq!(features.size, 1024);
    }

    #[test]
    fn test_signature_shared_by_near_duplicates() {
        let a = FeatureSet::derive(
            &PathBuf::from("/a/Test Song.flac"),
            &meta("Test Song", "Artist X", 180.0),
            30 * 1024 * 1024,
        );
        let b = FeatureSet::derive(
            &PathBuf::from("/b/Test Song (copy).flac"),
            &meta("Test Song", "Artist X", 181.0),
            30 * 1024 * 1024 + 4096,
        );
        assert_eq!(a.signature(), b.signature());
    }

    #[test]
    fn test_signature_separates_different_tracks() {
        let a = FeatureSet::derive(
            &PathBuf::from("/a/x.flac"),
            &meta("Test Song", "Artist X", 180.0),
            1024,
        );
        let b = FeatureSet::derive(
            &PathBuf::from("/b/y.flac"),
            &meta("Totally Different", "Other", 240.0),
            1024,
        );
        assert_ne!(a.signature(), b.signature());
    }

    #[test]
    fn test_signature_ignores_size_when_duration_known() {
        // A 30MB flac and an 8MB mp3 of the same recording must share a bucket.
        let a = FeatureSet::derive(
            &PathBuf::from("/a/Song_A.flac"),
            &meta("Test Song", "Artist X", 180.0),
            30 * 1024 * 1024,
        );
        let b = FeatureSet::derive(
            &PathBuf::from("/b/Song_A_copy.mp3"),
            &meta("Test Song", "Artist X", 181.0),
            8 * 1024 * 1024,
        );
        assert_eq!(a.signature(), b.signature());
    }

    #[test]
    fn test_signature_falls_back_to_size_bucket_without_duration() {
        let small = FeatureSet::derive(
            &PathBuf::from("/a/x.mp3"),
            &meta("Test Song", "Artist X", 0.0),
            1024,
        );
        let large = FeatureSet::derive(
            &PathBuf::from("/b/y.mp3"),
            &meta("Test Song", "Artist X", 0.0),
            50 * 1024 * 1024,
        );
        assert_ne!(small.signature(), large.signature());
    }

    #[test]
    fn test_signature_duration_bucket_boundaries() {
        let base = meta("t", "a", 0.0);
        let mut m1 = base.clone();
        m1.duration_secs = 150.0;
        let mut m2 = base.clone();
        m2.duration_secs = 179.9;
        let mut m3 = base;
        m3.duration_secs = 180.0;

        let p = PathBuf::from("/x.mp3");
        let s1 = FeatureSet::derive(&p, &m1, 0).signature();
        let s2 = FeatureSet::derive(&p, &m2, 0).signature();
        let s3 = FeatureSet::derive(&p, &m3, 0).signature();
        assert_eq!(s1, s2); // both in the 150s bucket
        assert_ne!(s2, s3); // 180 starts a new bucket
    }

    #[test]
    fn test_signature_truncates_long_fields_by_chars() {
        let features = FeatureSet::derive(
            &PathBuf::from("/x.mp3"),
            &meta("ééééééééééééééé", "üüüüüüüüüüüüüüü", 10.0),
            0,
        );
        // Must not panic on multi-byte characters.
        let signature = features.signature();
        assert!(!signature.is_empty());
    }
}
