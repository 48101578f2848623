//! Metadata extraction boundary.
//!
//! The cache calls an extractor only when the change detector says a file
//! needs re-reading. The contract is all-or-nothing: on failure an
//! extractor returns an error, never a partially populated record, so the
//! cache can decide whether to keep stale data or mark the path as needing
//! attention.
//!
//! Tag values are normalized here — "first value or empty" — so nothing
//! downstream ever branches on list-versus-scalar representations.

pub mod lofty;

use std::path::{Path, PathBuf};

use crate::cache::{TagMap, TrackMetadata};

pub use self::lofty::LoftyExtractor;

/// Errors from metadata extraction.
#[derive(thiserror::Error, Debug)]
pub enum ExtractError {
    /// The file could not be read.
    #[error("I/O error reading {path}: {source}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The file is not a format the extractor understands, or its tag
    /// data could not be parsed.
    #[error("Cannot parse {path}: {reason}")]
    Unparseable {
        /// Path of the offending file
        path: PathBuf,
        /// Parser-provided description
        reason: String,
    },
}

/// A complete extraction result: structured metadata plus whatever custom
/// tags are currently embedded in the file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Extraction {
    /// Structured track metadata.
    pub metadata: TrackMetadata,
    /// Custom tag name → value, already first-value-normalized.
    pub current_tags: TagMap,
}

/// Reads metadata and embedded tags for a single file.
///
/// Implementations must never partially populate the result on error.
pub trait MetadataExtractor: Send + Sync {
    /// Extract metadata and current tags from the file at `path`.
    fn extract(&self, path: &Path) -> Result<Extraction, ExtractError>;
}

/// Collapse a multi-valued tag to its first value, or empty when absent.
#[must_use]
pub fn first_value<I, S>(values: I) -> String
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    values
        .into_iter()
        .next()
        .map(Into::into)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_value_takes_head() {
        let values = vec!["Artist A", "Artist B"];
        assert_eq!(first_value(values), "Artist A");
    }

    #[test]
    fn test_first_value_empty_iter() {
        let values: Vec<String> = vec![];
        assert_eq!(first_value(values), "");
    }
}
