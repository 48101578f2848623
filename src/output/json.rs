//! JSON output formatter for duplicate scan results.
//!
//! # Output Schema
//!
//! ```json
//! {
//!   "groups": [
//!     {
//!       "id": "3f2a91bc",
//!       "best_match": "/music/Song_A.flac",
//!       "files": [
//!         {"path": "/music/Song_A.flac", "size": 31457280, "similarity": 100.0, "...": "..."}
//!       ]
//!     }
//!   ],
//!   "stats": {
//!     "group_count": 1,
//!     "file_count": 2,
//!     "reclaimable_bytes": 8388608,
//!     "average_group_size": 2.0
//!   },
//!   "summary": { "files_seen": 120, "cache_fresh": 118, "...": "..." },
//!   "exit_code": 0,
//!   "exit_code_name": "AD000"
//! }
//! ```

use std::io::Write;

use serde::Serialize;

use crate::duplicates::{DuplicateGroup, DuplicateStats};
use crate::error::ExitCode;
use crate::scan::{ScanReport, ScanSummary};

/// Complete JSON output structure.
#[derive(Debug, Serialize)]
pub struct JsonOutput<'a> {
    /// Duplicate groups found.
    pub groups: &'a [DuplicateGroup],
    /// Aggregate duplicate statistics.
    pub stats: &'a DuplicateStats,
    /// Refresh-phase counters and problem paths.
    pub summary: &'a ScanSummary,
    /// The exit code number.
    pub exit_code: i32,
    /// The machine-readable exit code name (e.g., "AD000").
    pub exit_code_name: String,
}

impl<'a> JsonOutput<'a> {
    /// Build the JSON view of a finished scan.
    #[must_use]
    pub fn new(report: &'a ScanReport, exit_code: ExitCode) -> Self {
        Self {
            groups: &report.groups,
            stats: &report.stats,
            summary: &report.summary,
            exit_code: exit_code.as_i32(),
            exit_code_name: exit_code.code_prefix().to_string(),
        }
    }

    /// Serialize to compact JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Serialize to pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Write JSON to a writer, followed by a trailing newline.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub fn write_to<W: Write>(&self, writer: &mut W, pretty: bool) -> Result<(), JsonOutputError> {
        let json = if pretty {
            self.to_json_pretty()?
        } else {
            self.to_json()?
        };
        writer.write_all(json.as_bytes())?;
        writer.write_all(b"\n")?;
        Ok(())
    }
}

/// Errors that can occur during JSON output.
#[derive(thiserror::Error, Debug)]
pub enum JsonOutputError {
    /// JSON serialization error
    #[error("JSON serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error during writing
    #[error("I/O error during JSON generation: {0}")]
    Io(#[from] std::io::Error),
}
