//! Incremental file-state cache.
//!
//! Persistent storage for per-file scan state (size, mtime, fingerprint,
//! extracted metadata and tags) so that unchanged files skip expensive
//! metadata extraction on rescans.
//!
//! # Architecture
//!
//! * [`entry`]: the data model stored per path.
//! * [`store`]: SQLite-backed persistence and CRUD, one independent
//!   transaction per row.
//! * [`staleness`]: the layered invalidation check (existence → size/mtime
//!   → optional quick fingerprint).
//!
//! # Invalidation
//!
//! Entries are validated by path (primary key), size, and mtime, with the
//! quick content fingerprint as a secondary layer for in-place rewrites
//! that preserve both. Entries for vanished files are removed only by an
//! explicit [`FileStateStore::reconcile`] pass.

pub mod entry;
pub mod staleness;
pub mod store;

pub use entry::{FileStateEntry, TagMap, TrackMetadata};
pub use staleness::{ChangeDetector, FingerprintPolicy, Staleness};
pub use store::{FileStateStore, StoreError, StoreResult};
