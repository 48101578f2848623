//! Multi-factor fuzzy comparison of two feature sets.
//!
//! String fields are scored 0–100 on top of strsim's normalized
//! Levenshtein distance, with three flavours:
//!
//! * `ratio` — direct whole-string comparison
//! * `partial_ratio` — best window of the longer string against the
//!   shorter, catching truncated titles ("Song" vs "Song (Remastered)")
//! * `token_sort_ratio` — tokens sorted before comparison, catching
//!   reordered fields ("Artist - Title" vs "Title - Artist")
//!
//! Numeric fields use closeness curves; the weighted overall score puts
//! most of the mass on title and artist, which dominate identity.

use serde::Serialize;

use super::features::FeatureSet;

/// Weight of each factor in the overall score. Sums to 1.
const WEIGHT_TITLE: f64 = 0.35;
const WEIGHT_ARTIST: f64 = 0.30;
const WEIGHT_ALBUM: f64 = 0.10;
const WEIGHT_FILENAME: f64 = 0.10;
const WEIGHT_DURATION: f64 = 0.10;
const WEIGHT_SIZE: f64 = 0.03;
const WEIGHT_BITRATE: f64 = 0.02;

/// Sub-scores (0–100 each) and the weighted overall score for one pair.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreBreakdown {
    /// Weighted overall score, rounded to two decimals.
    pub overall: f64,
    /// Best of ratio, partial ratio, and token-sort ratio.
    pub title: f64,
    /// Best of ratio and partial ratio, considering album artist too.
    pub artist: f64,
    /// Direct ratio.
    pub album: f64,
    /// Direct ratio on normalized filename stems.
    pub filename: f64,
    /// Duration closeness.
    pub duration: f64,
    /// Size closeness.
    pub size: f64,
    /// Bitrate closeness (neutral 50 when either side lacks data).
    pub bitrate: f64,
    /// Raw differences behind the numeric scores.
    pub details: ScoreDetails,
}

/// Raw differences, useful when reviewing a borderline match.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreDetails {
    /// Absolute duration difference in seconds.
    pub duration_diff_secs: f64,
    /// Absolute size difference in MiB.
    pub size_diff_mb: f64,
    /// Absolute bitrate difference in kbps.
    pub bitrate_diff_kbps: u32,
}

/// Direct string similarity, 0–100.
#[must_use]
pub fn ratio(a: &str, b: &str) -> f64 {
    strsim::normalized_levenshtein(a, b) * 100.0
}

/// Best similarity of the shorter string against every same-length window
/// of the longer one, 0–100.
#[must_use]
pub fn partial_ratio(a: &str, b: &str) -> f64 {
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();
    let (shorter, longer) = if a_chars.len() <= b_chars.len() {
        (&a_chars, &b_chars)
    } else {
        (&b_chars, &a_chars)
    };

    if shorter.is_empty() {
        return if longer.is_empty() { 100.0 } else { 0.0 };
    }
    if shorter.len() == longer.len() {
        return ratio(a, b);
    }

    let needle: String = shorter.iter().collect();
    let mut best: f64 = 0.0;
    for start in 0..=(longer.len() - shorter.len()) {
        let window: String = longer[start..start + shorter.len()].iter().collect();
        best = best.max(strsim::normalized_levenshtein(&needle, &window));
        if best >= 1.0 {
            break;
        }
    }
    best * 100.0
}

/// Similarity after sorting whitespace tokens, 0–100.
#[must_use]
pub fn token_sort_ratio(a: &str, b: &str) -> f64 {
    ratio(&sort_tokens(a), &sort_tokens(b))
}

fn sort_tokens(s: &str) -> String {
    let mut tokens: Vec<&str> = s.split_whitespace().collect();
    tokens.sort_unstable();
    tokens.join(" ")
}

/// Duration closeness: a strong, low-noise signal once files are truly the
/// same recording. ≤3s differences are treated as identical (codec and
/// container padding), then the score decays quickly.
#[must_use]
pub fn duration_score(a_secs: f64, b_secs: f64) -> f64 {
    let diff = (a_secs - b_secs).abs();
    if diff <= 3.0 {
        100.0
    } else if diff <= 10.0 {
        90.0 - (diff - 3.0) * 5.0
    } else {
        (100.0 - diff * 2.0).max(0.0)
    }
}

/// Relative size closeness; 0 when either size is unknown.
#[must_use]
pub fn size_score(a: u64, b: u64) -> f64 {
    if a == 0 || b == 0 {
        return 0.0;
    }
    let diff = a.abs_diff(b) as f64 / a.max(b) as f64;
    (100.0 - diff * 100.0).max(0.0)
}

/// Relative bitrate closeness; neutral 50 when either side lacks data, so
/// missing bitrate neither penalizes nor rewards a match.
#[must_use]
pub fn bitrate_score(a: u32, b: u32) -> f64 {
    if a == 0 || b == 0 {
        return 50.0;
    }
    let diff = f64::from(a.abs_diff(b)) / f64::from(a.max(b));
    (100.0 - diff * 100.0).max(0.0)
}

/// Compare two feature sets, producing sub-scores and the weighted overall.
#[must_use]
pub fn compare(a: &FeatureSet, b: &FeatureSet) -> ScoreBreakdown {
    // Different truncation and reordering patterns are each best captured
    // by a different measure; take the max.
    let title = ratio(&a.title, &b.title)
        .max(partial_ratio(&a.title, &b.title))
        .max(token_sort_ratio(&a.title, &b.title));

    let mut artist = ratio(&a.artist, &b.artist).max(partial_ratio(&a.artist, &b.artist));
    if !a.album_artist.is_empty() && !b.album_artist.is_empty() {
        // "Various Artists" compilations often disagree on track artist
        // while agreeing on album artist.
        artist = artist.max(ratio(&a.album_artist, &b.album_artist));
    }

    let album = ratio(&a.album, &b.album);
    let filename = ratio(&a.filename, &b.filename);
    let duration = duration_score(a.duration_secs, b.duration_secs);
    let size = size_score(a.size, b.size);
    let bitrate = bitrate_score(a.bitrate_kbps, b.bitrate_kbps);

    let overall = round2(
        title * WEIGHT_TITLE
            + artist * WEIGHT_ARTIST
            + album * WEIGHT_ALBUM
            + filename * WEIGHT_FILENAME
            + duration * WEIGHT_DURATION
            + size * WEIGHT_SIZE
            + bitrate * WEIGHT_BITRATE,
    );

    ScoreBreakdown {
        overall,
        title,
        artist,
        album,
        filename,
        duration,
        size,
        bitrate,
        details: ScoreDetails {
            duration_diff_secs: (a.duration_secs - b.duration_secs).abs(),
            size_diff_mb: a.size.abs_diff(b.size) as f64 / (1024.0 * 1024.0),
            bitrate_diff_kbps: a.bitrate_kbps.abs_diff(b.bitrate_kbps),
        },
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::TrackMetadata;
    use std::path::PathBuf;

    fn features(title: &str, artist: &str, duration: f64, size: u64, bitrate: u32) -> FeatureSet {
        FeatureSet::derive(
            &PathBuf::from(format!("/music/{}.flac", title)),
            &TrackMetadata {
                title: title.to_string(),
                artist: artist.to_string(),
                album: "Some Album".to_string(),
                duration_secs: duration,
                bitrate_kbps: bitrate,
                ..Default::default()
            },
            size,
        )
    }

    #[test]
    fn test_ratio_basics() {
        assert_eq!(ratio("abc", "abc"), 100.0);
        assert_eq!(ratio("", ""), 100.0);
        assert_eq!(ratio("abc", ""), 0.0);
        assert!(ratio("test song", "test songs") > 85.0);
    }

    #[test]
    fn test_partial_ratio_substring() {
        // Exact substring scores a perfect partial match.
        assert_eq!(partial_ratio("song", "song remastered"), 100.0);
        assert_eq!(partial_ratio("song remastered", "song"), 100.0);
    }

    #[test]
    fn test_partial_ratio_empty_sides() {
        assert_eq!(partial_ratio("", ""), 100.0);
        assert_eq!(partial_ratio("", "abc"), 0.0);
    }

    #[test]
    fn test_partial_ratio_symmetric() {
        let forward = partial_ratio("dancing dark", "dancing");
        let backward = partial_ratio("dancing", "dancing dark");
        assert_eq!(forward, backward);
    }

    #[test]
    fn test_token_sort_ratio_handles_reordering() {
        assert_eq!(token_sort_ratio("artist song", "song artist"), 100.0);
        assert!(ratio("artist song", "song artist") < 100.0);
    }

    #[test]
    fn test_duration_score_curve() {
        assert_eq!(duration_score(180.0, 180.0), 100.0);
        assert_eq!(duration_score(180.0, 183.0), 100.0);
        assert_eq!(duration_score(180.0, 184.0), 85.0); // 90 - 1*5
        assert_eq!(duration_score(180.0, 190.0), 55.0); // 90 - 7*5
        assert_eq!(duration_score(180.0, 200.0), 60.0); // 100 - 2*20
        assert_eq!(duration_score(180.0, 240.0), 0.0);
    }

    #[test]
    fn test_size_score() {
        assert_eq!(size_score(100, 100), 100.0);
        assert_eq!(size_score(0, 100), 0.0);
        assert_eq!(size_score(100, 0), 0.0);
        assert!((size_score(75, 100) - 75.0).abs() < 1e-9);
    }

    #[test]
    fn test_bitrate_score_neutral_when_missing() {
        assert_eq!(bitrate_score(0, 320), 50.0);
        assert_eq!(bitrate_score(320, 0), 50.0);
        assert_eq!(bitrate_score(0, 0), 50.0);
        assert_eq!(bitrate_score(320, 320), 100.0);
    }

    #[test]
    fn test_compare_identical_features_is_100() {
        let a = features("Test Song", "Artist X", 180.0, 30 * 1024 * 1024, 320);
        let breakdown = compare(&a, &a);
        assert_eq!(breakdown.overall, 100.0);
        assert_eq!(breakdown.title, 100.0);
        assert_eq!(breakdown.artist, 100.0);
        assert_eq!(breakdown.details.duration_diff_secs, 0.0);
    }

    #[test]
    fn test_compare_near_duplicates_above_threshold() {
        let a = features("Test Song", "Artist X", 180.0, 30 * 1024 * 1024, 0);
        let b = features("Test Song", "Artist X", 181.0, 8 * 1024 * 1024, 320);
        let breakdown = compare(&a, &b);
        assert!(
            breakdown.overall >= 78.0,
            "expected >= 78, got {}",
            breakdown.overall
        );
    }

    #[test]
    fn test_compare_unrelated_below_threshold() {
        let a = features("Test Song", "Artist X", 180.0, 30 * 1024 * 1024, 0);
        let b = features("Totally Different", "Other", 240.0, 35 * 1024 * 1024, 0);
        let breakdown = compare(&a, &b);
        assert!(
            breakdown.overall < 78.0,
            "expected < 78, got {}",
            breakdown.overall
        );
    }

    #[test]
    fn test_compare_album_artist_rescues_various_artists_mismatch() {
        let mut a = features("Test Song", "Various Artists", 180.0, 1024, 0);
        let mut b = features("Test Song", "Artist X", 180.0, 1024, 0);
        a.album_artist = "artist x".to_string();
        b.album_artist = "artist x".to_string();

        let with_album_artist = compare(&a, &b).artist;
        a.album_artist.clear();
        b.album_artist.clear();
        let without = compare(&a, &b).artist;

        assert_eq!(with_album_artist, 100.0);
        assert!(without < 100.0);
    }

    #[test]
    fn test_compare_symmetric() {
        let a = features("Test Song", "Artist X", 180.0, 30 * 1024 * 1024, 256);
        let b = features("Test Song Live", "Artist X", 192.0, 28 * 1024 * 1024, 320);
        assert_eq!(compare(&a, &b).overall, compare(&b, &a).overall);
    }

    #[test]
    fn test_overall_rounded_to_two_decimals() {
        let a = features("Test Song", "Artist X", 180.0, 30 * 1024 * 1024, 0);
        let b = features("Test Song", "Artist X", 181.0, 8 * 1024 * 1024, 320);
        let overall = compare(&a, &b).overall;
        assert_eq!(overall, round2(overall));
    }
}
