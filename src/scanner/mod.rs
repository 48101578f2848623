//! Filesystem-facing I/O: directory enumeration and content fingerprinting.
//!
//! These are the only blocking building blocks of a scan; everything in
//! [`crate::duplicates`] is pure computation.

pub mod fingerprint;
pub mod walker;

pub use fingerprint::{full_hash, hash_to_hex, quick_fingerprint, FingerprintError};
pub use walker::{
    enumerate_audio_files, enumerate_with_extensions, is_audio_file, DirectoryListing, WalkError,
    AUDIO_EXTENSIONS,
};
