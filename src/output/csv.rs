//! CSV output formatter for duplicate scan results.
//!
//! One row per file in a duplicate group.
//!
//! # Columns
//!
//! - `group_id`: Short stable group identifier
//! - `best_match`: `true` for the group's canonical member
//! - `path`: Full path to the file
//! - `size`: File size in bytes
//! - `similarity`: Score against the group's best match (0-100)
//! - `title`, `artist`, `album`: Normalized tags ("Unknown" when absent)
//! - `duration_secs`: Track duration in seconds
//! - `bitrate_kbps`: Bitrate, 0 when unknown

use std::io;

use serde::Serialize;
use thiserror::Error;

use crate::duplicates::DuplicateGroup;

/// Errors that can occur during CSV output generation.
#[derive(Debug, Error)]
pub enum CsvOutputError {
    /// I/O error during writing.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Error during CSV serialization.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// A single row in the CSV output.
#[derive(Debug, Serialize)]
struct CsvRow<'a> {
    group_id: &'a str,
    best_match: bool,
    path: String,
    size: u64,
    similarity: f64,
    title: &'a str,
    artist: &'a str,
    album: &'a str,
    duration_secs: f64,
    bitrate_kbps: u32,
}

/// CSV output formatter.
pub struct CsvOutput<'a> {
    groups: &'a [DuplicateGroup],
}

impl<'a> CsvOutput<'a> {
    /// Create a new CSV output formatter.
    #[must_use]
    pub fn new(groups: &'a [DuplicateGroup]) -> Self {
        Self { groups }
    }

    /// Write the CSV output to the given writer.
    ///
    /// # Errors
    ///
    /// Returns `CsvOutputError` if writing or serialization fails.
    pub fn write_to<W: io::Write>(&self, writer: W) -> Result<(), CsvOutputError> {
        let mut csv_writer = csv::Writer::from_writer(writer);

        for group in self.groups {
            for file in &group.files {
                let row = CsvRow {
                    group_id: &group.id,
                    best_match: file.path == group.best_match,
                    path: file.path.to_string_lossy().into_owned(),
                    size: file.size,
                    similarity: file.similarity,
                    title: &file.title,
                    artist: &file.artist,
                    album: &file.album,
                    duration_secs: file.duration_secs,
                    bitrate_kbps: file.bitrate_kbps,
                };
                csv_writer.serialize(row)?;
            }
        }

        csv_writer.flush()?;
        Ok(())
    }

    /// Generate CSV output as a string.
    ///
    /// # Errors
    ///
    /// Returns `CsvOutputError` if serialization fails.
    pub fn to_csv_string(&self) -> Result<String, CsvOutputError> {
        let mut buffer = Vec::new();
        self.write_to(&mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::duplicates::{FeatureSet, FileInfo};
    use std::path::Path;

    fn group(paths: &[(&str, f64)]) -> DuplicateGroup {
        let files = paths
            .iter()
            .map(|(path, similarity)| {
                let features = FeatureSet {
                    title: "test song".to_string(),
                    artist: "artist x".to_string(),
                    duration_secs: 180.0,
                    size: 1024,
                    extension: ".mp3".to_string(),
                    ..Default::default()
                };
                FileInfo::new(Path::new(path), &features, *similarity)
            })
            .collect();
        DuplicateGroup::assemble(files)
    }

    #[test]
    fn test_csv_header_and_rows() {
        let groups = vec![group(&[("/m/a.mp3", 100.0), ("/m/b.mp3", 85.5)])];
        let csv_str = CsvOutput::new(&groups).to_csv_string().unwrap();

        let mut lines = csv_str.lines();
        assert_eq!(
            lines.next().unwrap(),
            "group_id,best_match,path,size,similarity,title,artist,album,duration_secs,bitrate_kbps"
        );
        assert_eq!(lines.clone().count(), 2);
        assert!(csv_str.contains("/m/a.mp3"));
        assert!(csv_str.contains("85.5"));
        // Exactly one row flagged as the best match.
        assert_eq!(csv_str.matches("true").count(), 1);
    }

    #[test]
    fn test_csv_quotes_embedded_commas() {
        let groups = vec![group(&[
            ("/m/one, two.mp3", 100.0),
            ("/m/other.mp3", 90.0),
        ])];
        let csv_str = CsvOutput::new(&groups).to_csv_string().unwrap();
        assert!(csv_str.contains("\"/m/one, two.mp3\""));
    }

    #[test]
    fn test_csv_empty_groups() {
        let csv_str = CsvOutput::new(&[]).to_csv_string().unwrap();
        assert!(csv_str.is_empty());
    }
}
