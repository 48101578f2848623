//! SQLite-backed file-state store.
//!
//! One row per tracked path, written with `INSERT OR REPLACE` so every
//! update is an independent, all-or-nothing transaction. There are no
//! cross-row invariants: a scan interrupted mid-way leaves some rows
//! refreshed and the rest untouched, never an inconsistent row.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use rusqlite::{params, Connection, OptionalExtension};

use super::entry::{FileStateEntry, TagMap, TrackMetadata};

/// Errors from the file-state store.
#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    /// The database could not be opened or its schema could not be created.
    /// Fatal: no further cache work is possible.
    #[error("Failed to open file-state store at {path}: {source}")]
    Open {
        /// Database file location
        path: PathBuf,
        /// The underlying SQLite error
        #[source]
        source: rusqlite::Error,
    },

    /// A single-row read or write failed.
    #[error("File-state store query failed: {0}")]
    Query(#[from] rusqlite::Error),

    /// A cached metadata or tag blob could not be (de)serialized.
    #[error("Corrupt cached record: {0}")]
    Corrupt(#[from] serde_json::Error),
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Persistent key-value table mapping a file path to its last-known size,
/// mtime, content fingerprint, and cached metadata/tags.
///
/// Pure storage plus invalidation bookkeeping; it has no knowledge of audio
/// formats. Wrapped in a mutex so a statistics reader and a running scan can
/// share one handle; readers see per-row consistency only (a concurrent scan
/// may have refreshed some rows and not others).
pub struct FileStateStore {
    conn: Mutex<Connection>,
}

impl FileStateStore {
    /// Open or create the store at the given path.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Open`] when the database cannot be opened or
    /// the schema cannot be created. This is fatal to the caller.
    pub fn open(path: &Path) -> StoreResult<Self> {
        let conn = Connection::open(path).map_err(|source| StoreError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        Self::init_schema(&conn).map_err(|source| StoreError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        log::info!("File-state store opened at {}", path.display());
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open an in-memory store, for tests and throwaway scans.
    pub fn open_in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory().map_err(|source| StoreError::Open {
            path: PathBuf::from(":memory:"),
            source,
        })?;
        Self::init_schema(&conn).map_err(|source| StoreError::Open {
            path: PathBuf::from(":memory:"),
            source,
        })?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS file_state (
                path            TEXT PRIMARY KEY,
                size            INTEGER NOT NULL,
                modified_at_ns  INTEGER NOT NULL,
                scanned_at      INTEGER NOT NULL,
                fingerprint     INTEGER,
                metadata_json   TEXT NOT NULL,
                tags_json       TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_file_state_modified
                ON file_state(modified_at_ns);",
        )
    }

    /// Look up the entry for a path.
    ///
    /// Returns `Ok(None)` when the path has no entry; that is the normal
    /// "needs extraction" signal, not an error.
    pub fn get(&self, path: &Path) -> StoreResult<Option<FileStateEntry>> {
        let conn = self.conn.lock().expect("store mutex poisoned");
        let row = conn
            .query_row(
                "SELECT path, size, modified_at_ns, scanned_at, fingerprint,
                        metadata_json, tags_json
                 FROM file_state WHERE path = ?1",
                params![path_key(path)],
                Self::row_to_raw,
            )
            .optional()?;

        row.map(RawRow::into_entry).transpose()
    }

    /// Insert or replace the entry for a path.
    ///
    /// Idempotent; the row write is atomic. `scanned_at` is set to now.
    pub fn upsert(
        &self,
        path: &Path,
        size: u64,
        modified_at_ns: i64,
        metadata: &TrackMetadata,
        current_tags: &TagMap,
        fingerprint: Option<u64>,
    ) -> StoreResult<()> {
        let metadata_json = serde_json::to_string(metadata)?;
        let tags_json = serde_json::to_string(current_tags)?;
        let scanned_at = unix_now();

        let conn = self.conn.lock().expect("store mutex poisoned");
        conn.execute(
            "INSERT OR REPLACE INTO file_state
                 (path, size, modified_at_ns, scanned_at, fingerprint,
                  metadata_json, tags_json)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                path_key(path),
                size as i64,
                modified_at_ns,
                scanned_at,
                fingerprint.map(|f| f as i64),
                metadata_json,
                tags_json,
            ],
        )?;
        log::trace!("Upserted cache entry for {}", path.display());
        Ok(())
    }

    /// Delete every entry whose path is not in `existing`.
    ///
    /// Entries for paths present in the set are never deleted, even if
    /// stale. Returns the number of entries removed.
    pub fn reconcile(&self, existing: &HashSet<PathBuf>) -> StoreResult<usize> {
        let stored = self.all_paths()?;
        let doomed: Vec<String> = stored
            .into_iter()
            .filter(|p| !existing.contains(Path::new(p)))
            .collect();

        if doomed.is_empty() {
            return Ok(0);
        }

        let conn = self.conn.lock().expect("store mutex poisoned");
        let mut stmt = conn.prepare("DELETE FROM file_state WHERE path = ?1")?;
        for path in &doomed {
            stmt.execute(params![path])?;
        }
        log::info!("Reconciled cache: removed {} vanished file(s)", doomed.len());
        Ok(doomed.len())
    }

    /// All stored entries, for batch statistics and verification.
    pub fn all_entries(&self) -> StoreResult<Vec<FileStateEntry>> {
        let conn = self.conn.lock().expect("store mutex poisoned");
        let mut stmt = conn.prepare(
            "SELECT path, size, modified_at_ns, scanned_at, fingerprint,
                    metadata_json, tags_json
             FROM file_state ORDER BY path",
        )?;
        let rows = stmt.query_map([], Self::row_to_raw)?;

        let mut entries = Vec::new();
        for row in rows {
            entries.push(row?.into_entry()?);
        }
        Ok(entries)
    }

    /// Number of stored entries.
    pub fn len(&self) -> StoreResult<usize> {
        let conn = self.conn.lock().expect("store mutex poisoned");
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM file_state", [], |r| r.get(0))?;
        Ok(count as usize)
    }

    /// Check whether the store holds no entries.
    pub fn is_empty(&self) -> StoreResult<bool> {
        Ok(self.len()? == 0)
    }

    /// Delete every entry. Explicit operator action for a forced full rescan.
    pub fn clear(&self) -> StoreResult<usize> {
        let conn = self.conn.lock().expect("store mutex poisoned");
        let removed = conn.execute("DELETE FROM file_state", [])?;
        log::info!("Cache cleared: {} entries removed", removed);
        Ok(removed)
    }

    /// Delete a single entry, e.g. after a rename or deletion outside a
    /// full rescan. Returns true if an entry was removed.
    pub fn evict(&self, path: &Path) -> StoreResult<bool> {
        let conn = self.conn.lock().expect("store mutex poisoned");
        let removed = conn.execute(
            "DELETE FROM file_state WHERE path = ?1",
            params![path_key(path)],
        )?;
        if removed > 0 {
            log::debug!("Evicted cache entry for {}", path.display());
        }
        Ok(removed > 0)
    }

    fn all_paths(&self) -> StoreResult<Vec<String>> {
        let conn = self.conn.lock().expect("store mutex poisoned");
        let mut stmt = conn.prepare("SELECT path FROM file_state")?;
        let rows = stmt.query_map([], |r| r.get::<_, String>(0))?;
        let mut paths = Vec::new();
        for row in rows {
            paths.push(row?);
        }
        Ok(paths)
    }

    fn row_to_raw(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawRow> {
        Ok(RawRow {
            path: row.get(0)?,
            size: row.get(1)?,
            modified_at_ns: row.get(2)?,
            scanned_at: row.get(3)?,
            fingerprint: row.get::<_, Option<i64>>(4)?,
            metadata_json: row.get(5)?,
            tags_json: row.get(6)?,
        })
    }
}

/// A row fetched from SQLite before JSON blobs are decoded.
struct RawRow {
    path: String,
    size: i64,
    modified_at_ns: i64,
    scanned_at: i64,
    fingerprint: Option<i64>,
    metadata_json: String,
    tags_json: String,
}

impl RawRow {
    fn into_entry(self) -> StoreResult<FileStateEntry> {
        Ok(FileStateEntry {
            path: PathBuf::from(self.path),
            size: self.size as u64,
            modified_at_ns: self.modified_at_ns,
            scanned_at: self.scanned_at,
            fingerprint: self.fingerprint.map(|f| f as u64),
            metadata: serde_json::from_str(&self.metadata_json)?,
            current_tags: serde_json::from_str(&self.tags_json)?,
        })
    }
}

fn path_key(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}
