//! Content fingerprinting.
//!
//! Two named policies:
//!
//! * **Quick fingerprint** — xxh64 over the declared size, the first 64KB,
//!   and (for files larger than 128KB) the last 64KB. Catches in-place
//!   rewrites that preserve size and timestamp (a tag editor rewriting
//!   header data) without paying for a full read of large audio files.
//! * **Full hash** — streaming BLAKE3 over the entire file, for explicit
//!   integrity verification. Never run implicitly during a scan.

use std::fs::File;
use std::hash::Hasher as _;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use twox_hash::XxHash64;

/// Bytes read from each end of the file for the quick fingerprint.
pub const QUICK_CHUNK_SIZE: u64 = 64 * 1024;

/// Errors from fingerprint computation.
#[derive(thiserror::Error, Debug)]
pub enum FingerprintError {
    /// A zero-byte file carries no content to fingerprint. Callers treat
    /// the file as stale and surface the failure rather than masking it
    /// as "unchanged".
    #[error("Cannot fingerprint empty file: {0}")]
    Empty(PathBuf),

    /// The file could not be read.
    #[error("I/O error fingerprinting {path}: {source}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

impl FingerprintError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Compute the quick (partial) content fingerprint of a file.
///
/// # Errors
///
/// Fails for zero-byte or unreadable files; the caller must propagate the
/// failure rather than treat the file as unchanged.
pub fn quick_fingerprint(path: &Path) -> Result<u64, FingerprintError> {
    let mut file = File::open(path).map_err(|e| FingerprintError::io(path, e))?;
    let size = file
        .metadata()
        .map_err(|e| FingerprintError::io(path, e))?
        .len();

    if size == 0 {
        return Err(FingerprintError::Empty(path.to_path_buf()));
    }

    let mut hasher = XxHash64::with_seed(0);
    hasher.write(&size.to_le_bytes());

    let head_len = size.min(QUICK_CHUNK_SIZE) as usize;
    let mut buf = vec![0u8; head_len];
    file.read_exact(&mut buf)
        .map_err(|e| FingerprintError::io(path, e))?;
    hasher.write(&buf);

    // Only read a tail chunk when it does not overlap the head.
    if size > 2 * QUICK_CHUNK_SIZE {
        file.seek(SeekFrom::End(-(QUICK_CHUNK_SIZE as i64)))
            .map_err(|e| FingerprintError::io(path, e))?;
        let mut tail = vec![0u8; QUICK_CHUNK_SIZE as usize];
        file.read_exact(&mut tail)
            .map_err(|e| FingerprintError::io(path, e))?;
        hasher.write(&tail);
    }

    Ok(hasher.finish())
}

/// Compute the full BLAKE3 hash of a file's contents, streaming.
///
/// This is the explicit verification mode; scans use
/// [`quick_fingerprint`] instead.
pub fn full_hash(path: &Path) -> Result<[u8; 32], FingerprintError> {
    let mut file = File::open(path).map_err(|e| FingerprintError::io(path, e))?;
    let mut hasher = blake3::Hasher::new();
    let mut buf = vec![0u8; 1024 * 1024];

    loop {
        let read = file
            .read(&mut buf)
            .map_err(|e| FingerprintError::io(path, e))?;
        if read == 0 {
            break;
        }
        hasher.update(&buf[..read]);
    }

    Ok(*hasher.finalize().as_bytes())
}

/// Render a full hash as lowercase hex.
#[must_use]
pub fn hash_to_hex(hash: &[u8; 32]) -> String {
    hash.iter().map(|b| format!("{:02x}", b)).collect()
}
