//! Integration tests for the file-state cache on a real filesystem.

use std::collections::HashSet;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use audiodupe::cache::entry::system_time_to_ns;
use audiodupe::cache::{
    ChangeDetector, FileStateStore, FingerprintPolicy, Staleness, TagMap, TrackMetadata,
};
use audiodupe::scanner::quick_fingerprint;
use tempfile::TempDir;

fn make_file(dir: &Path, name: &str, content: &[u8]) -> PathBuf {
    let path = dir.join(name);
    File::create(&path).unwrap().write_all(content).unwrap();
    path
}

fn stat_of(path: &Path) -> (u64, i64) {
    let stat = fs::metadata(path).unwrap();
    (stat.len(), system_time_to_ns(stat.modified().unwrap()))
}

fn metadata(title: &str) -> TrackMetadata {
    TrackMetadata {
        title: title.to_string(),
        artist: "Artist".to_string(),
        album: "Album".to_string(),
        duration_secs: 200.0,
        bitrate_kbps: 320,
        ..Default::default()
    }
}

fn cache_entry(store: &FileStateStore, path: &Path, fingerprint: Option<u64>) {
    let (size, mtime_ns) = stat_of(path);
    store
        .upsert(path, size, mtime_ns, &metadata("Song"), &TagMap::new(), fingerprint)
        .unwrap();
}

#[test]
fn test_store_persists_across_reopen() {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("state.db");
    let file = make_file(dir.path(), "a.mp3", b"audio bytes");

    {
        let store = FileStateStore::open(&db).unwrap();
        cache_entry(&store, &file, None);
        assert_eq!(store.len().unwrap(), 1);
    }

    let store = FileStateStore::open(&db).unwrap();
    let entry = store.get(&file).unwrap().unwrap();
    assert_eq!(entry.metadata.title, "Song");
    assert_eq!(entry.size, 11);
}

#[test]
fn test_unchanged_file_is_fresh_after_reopen() {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("state.db");
    let file = make_file(dir.path(), "a.mp3", b"audio bytes");

    {
        let store = FileStateStore::open(&db).unwrap();
        cache_entry(&store, &file, None);
    }

    let store = FileStateStore::open(&db).unwrap();
    let detector = ChangeDetector::new(&store, FingerprintPolicy::Disabled);
    assert_eq!(detector.check(&file, false).unwrap(), Staleness::Fresh);
}

#[test]
fn test_touched_file_goes_stale() {
    let dir = TempDir::new().unwrap();
    let store = FileStateStore::open(&dir.path().join("state.db")).unwrap();
    let file = make_file(dir.path(), "a.mp3", b"audio bytes");
    cache_entry(&store, &file, None);

    filetime::set_file_mtime(&file, filetime::FileTime::from_unix_time(2_000_000_000, 0)).unwrap();

    let detector = ChangeDetector::new(&store, FingerprintPolicy::Disabled);
    assert_eq!(detector.check(&file, false).unwrap(), Staleness::StatChanged);
}

#[test]
fn test_preserved_stat_rewrite_caught_by_fingerprint() {
    let dir = TempDir::new().unwrap();
    let store = FileStateStore::open(&dir.path().join("state.db")).unwrap();
    let file = make_file(dir.path(), "a.mp3", b"original data");
    let original_mtime = filetime::FileTime::from_last_modification_time(&fs::metadata(&file).unwrap());
    let fp = quick_fingerprint(&file).unwrap();
    cache_entry(&store, &file, Some(fp));

    // Same length, same restored mtime, different content.
    make_file(dir.path(), "a.mp3", b"replaced data");
    filetime::set_file_mtime(&file, original_mtime).unwrap();

    let detector = ChangeDetector::new(&store, FingerprintPolicy::OnDemand);
    // Shallow check cannot see it.
    assert_eq!(detector.check(&file, false).unwrap(), Staleness::Fresh);
    // Deep check can.
    assert_eq!(
        detector.check(&file, true).unwrap(),
        Staleness::FingerprintChanged
    );
}

#[test]
fn test_reconcile_removes_exactly_the_vanished() {
    let dir = TempDir::new().unwrap();
    let store = FileStateStore::open(&dir.path().join("state.db")).unwrap();
    let kept = make_file(dir.path(), "kept.mp3", b"kkkk");
    let gone = make_file(dir.path(), "gone.mp3", b"gggg");
    cache_entry(&store, &kept, None);
    cache_entry(&store, &gone, None);

    fs::remove_file(&gone).unwrap();
    let existing: HashSet<PathBuf> = [kept.clone()].into_iter().collect();
    let removed = store.reconcile(&existing).unwrap();

    assert_eq!(removed, 1);
    assert!(store.get(&kept).unwrap().is_some());
    assert!(store.get(&gone).unwrap().is_none());
}

#[test]
fn test_evict_and_clear() {
    let dir = TempDir::new().unwrap();
    let store = FileStateStore::open(&dir.path().join("state.db")).unwrap();
    let a = make_file(dir.path(), "a.mp3", b"aaaa");
    let b = make_file(dir.path(), "b.mp3", b"bbbb");
    cache_entry(&store, &a, None);
    cache_entry(&store, &b, None);

    assert!(store.evict(&a).unwrap());
    assert!(!store.evict(&a).unwrap());
    assert_eq!(store.len().unwrap(), 1);

    assert_eq!(store.clear().unwrap(), 1);
    assert!(store.is_empty().unwrap());
}

#[test]
fn test_tags_round_trip_through_store() {
    let dir = TempDir::new().unwrap();
    let store = FileStateStore::open(&dir.path().join("state.db")).unwrap();
    let file = make_file(dir.path(), "a.flac", b"flac bytes");

    let mut tags = TagMap::new();
    tags.insert("replaygain_track_gain".to_string(), "-6.2 dB".to_string());
    tags.insert("encoder".to_string(), "reference libFLAC".to_string());

    let (size, mtime_ns) = stat_of(&file);
    store
        .upsert(&file, size, mtime_ns, &metadata("Tagged"), &tags, None)
        .unwrap();

    let entry = store.get(&file).unwrap().unwrap();
    assert_eq!(
        entry.current_tags.get("replaygain_track_gain").unwrap(),
        "-6.2 dB"
    );
    assert_eq!(entry.current_tags.len(), 2);
}
