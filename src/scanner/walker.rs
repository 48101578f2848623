//! Audio file enumeration.
//!
//! Supplies the full, deterministically ordered list of candidate audio
//! paths that both cache reconciliation and the duplicate scan consume.
//! Ordering matters: grouping is first-match-wins within a bucket, so the
//! same tree must always enumerate in the same order.

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

/// Extensions treated as audio files (lowercase, without the dot).
pub const AUDIO_EXTENSIONS: &[&str] = &["mp3", "flac", "wav", "aiff", "m4a", "ogg"];

/// Errors that can occur during directory enumeration.
#[derive(thiserror::Error, Debug)]
pub enum WalkError {
    /// The scan root was not found.
    #[error("Path not found: {0}")]
    NotFound(PathBuf),

    /// The scan root is not a directory.
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),

    /// An entry inside the tree could not be read.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path where the error occurred (the root when unknown)
        path: PathBuf,
        /// The underlying walkdir error
        #[source]
        source: walkdir::Error,
    },
}

/// Result of enumerating a directory tree.
///
/// Per-entry errors do not abort the walk, but they do mean the file list
/// may be incomplete — reconciliation must check [`Self::is_complete`]
/// before trusting it, or a transient read failure would evict live cache
/// entries.
#[derive(Debug)]
pub struct DirectoryListing {
    /// Audio files found, sorted by path.
    pub files: Vec<PathBuf>,
    /// Entries that could not be read during the walk.
    pub errors: Vec<WalkError>,
}

impl DirectoryListing {
    /// Whether the walk saw every entry it attempted.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Check whether a path carries a recognized audio extension.
#[must_use]
pub fn is_audio_file(path: &Path) -> bool {
    has_audio_extension(path, &[])
}

fn has_audio_extension(path: &Path, extra: &[String]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .is_some_and(|e| {
            AUDIO_EXTENSIONS.contains(&e.as_str()) || extra.iter().any(|x| x == &e)
        })
}

/// Enumerate all audio files under `root`, sorted by file name at each
/// directory level.
///
/// # Errors
///
/// Fails fast when the root itself is missing or not a directory.
/// Unreadable entries deeper in the tree are collected into the listing's
/// error list instead.
pub fn enumerate_audio_files(root: &Path) -> Result<DirectoryListing, WalkError> {
    enumerate_with_extensions(root, &[])
}

/// Like [`enumerate_audio_files`], additionally recognizing `extra`
/// extensions (lowercase, without the dot) from user configuration.
pub fn enumerate_with_extensions(
    root: &Path,
    extra: &[String],
) -> Result<DirectoryListing, WalkError> {
    let stat = std::fs::metadata(root).map_err(|_| WalkError::NotFound(root.to_path_buf()))?;
    if !stat.is_dir() {
        return Err(WalkError::NotADirectory(root.to_path_buf()));
    }

    let mut files = Vec::new();
    let mut errors = Vec::new();

    for entry in WalkDir::new(root).sort_by_file_name() {
        match entry {
            Ok(entry) => {
                if entry.file_type().is_file() && has_audio_extension(entry.path(), extra) {
                    files.push(entry.into_path());
                }
            }
            Err(e) => {
                let path = e
                    .path()
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| root.to_path_buf());
                log::warn!("Failed to read {} during walk: {}", path.display(), e);
                errors.push(WalkError::Io { path, source: e });
            }
        }
    }

    log::debug!(
        "Enumerated {} audio file(s) under {} ({} error(s))",
        files.len(),
        root.display(),
        errors.len()
    );
    Ok(DirectoryListing { files, errors })
}
