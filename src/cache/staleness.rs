//! Cache invalidation: decide whether a path needs re-extraction.
//!
//! The check is layered and short-circuits on the first hit:
//!
//! 1. file missing on disk → stale (caller handles via reconciliation)
//! 2. no stored entry → stale
//! 3. size or mtime drift → stale
//! 4. fingerprint check (when the policy asks for one): missing stored
//!    fingerprint → stale; recomputed mismatch → stale
//! 5. otherwise fresh; the stored metadata and tags may be served as-is

use std::path::Path;

use super::entry::system_time_to_ns;
use super::store::FileStateStore;
use crate::scanner::fingerprint::{quick_fingerprint, FingerprintError};

/// When the quick fingerprint participates in staleness checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FingerprintPolicy {
    /// Never fingerprint; size + mtime only.
    Disabled,
    /// Fingerprint only when the caller requests a deep check.
    #[default]
    OnDemand,
    /// Fingerprint on every staleness check.
    Always,
}

impl FingerprintPolicy {
    fn applies(self, deep: bool) -> bool {
        match self {
            Self::Disabled => false,
            Self::OnDemand => deep,
            Self::Always => true,
        }
    }
}

/// Why a path was judged stale, or that it was not.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Staleness {
    /// The file no longer exists on disk.
    Missing,
    /// No cache entry for this path; first-time extraction.
    NoEntry,
    /// Size or modification time changed since the last scan.
    StatChanged,
    /// Stat matched but the content fingerprint did not (or was never
    /// recorded). In-place rewrite.
    FingerprintChanged,
    /// The cached entry is current.
    Fresh,
}

impl Staleness {
    /// Whether the cached data must not be served without re-extraction.
    #[must_use]
    pub fn is_stale(self) -> bool {
        !matches!(self, Self::Fresh)
    }
}

/// Layered staleness check over a [`FileStateStore`].
pub struct ChangeDetector<'a> {
    store: &'a FileStateStore,
    policy: FingerprintPolicy,
}

impl<'a> ChangeDetector<'a> {
    /// Create a detector with the given fingerprint policy.
    #[must_use]
    pub fn new(store: &'a FileStateStore, policy: FingerprintPolicy) -> Self {
        Self { store, policy }
    }

    /// Classify a path as stale or fresh.
    ///
    /// Store read failures degrade to stale (re-extracting is safer than
    /// serving a row that could not be read) and are logged, not raised.
    ///
    /// # Errors
    ///
    /// Only fingerprint computation can fail here, and only for zero-byte
    /// or unreadable files; the failure propagates so the caller records
    /// the file as needing attention instead of "unchanged".
    pub fn check(&self, path: &Path, deep: bool) -> Result<Staleness, FingerprintError> {
        let stat = match std::fs::metadata(path) {
            Ok(stat) => stat,
            Err(_) => return Ok(Staleness::Missing),
        };
        let size = stat.len();
        let modified_at_ns = stat.modified().map(system_time_to_ns).unwrap_or(0);

        let entry = match self.store.get(path) {
            Ok(Some(entry)) => entry,
            Ok(None) => return Ok(Staleness::NoEntry),
            Err(e) => {
                log::warn!(
                    "Cache read failed for {}, treating as stale: {}",
                    path.display(),
                    e
                );
                return Ok(Staleness::NoEntry);
            }
        };

        if !entry.matches_stat(size, modified_at_ns) {
            return Ok(Staleness::StatChanged);
        }

        if self.policy.applies(deep) {
            let Some(stored) = entry.fingerprint else {
                // First fingerprinted pass over an entry written without one.
                return Ok(Staleness::FingerprintChanged);
            };
            let current = quick_fingerprint(path)?;
            if current != stored {
                return Ok(Staleness::FingerprintChanged);
            }
        }

        Ok(Staleness::Fresh)
    }

    /// Convenience wrapper mirroring the classic boolean API.
    pub fn is_stale(&self, path: &Path, deep: bool) -> Result<bool, FingerprintError> {
        Ok(self.check(path, deep)?.is_stale())
    }
}
