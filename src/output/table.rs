//! Human-readable table output for duplicate scan results.

use std::io::{self, Write};

use bytesize::ByteSize;

use crate::scan::ScanReport;

/// Plain-text report formatter for terminals.
pub struct TableOutput<'a> {
    report: &'a ScanReport,
}

impl<'a> TableOutput<'a> {
    /// Create a table formatter over a finished scan.
    #[must_use]
    pub fn new(report: &'a ScanReport) -> Self {
        Self { report }
    }

    /// Write the report to the given writer.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        let summary = &self.report.summary;
        let stats = &self.report.stats;

        if self.report.groups.is_empty() {
            writeln!(writer, "No duplicates found.")?;
        }

        for (index, group) in self.report.groups.iter().enumerate() {
            writeln!(
                writer,
                "Group {} [{}] — {} files, {} reclaimable",
                index + 1,
                group.id,
                group.len(),
                ByteSize(group.reclaimable_bytes())
            )?;
            for file in &group.files {
                let marker = if file.path == group.best_match {
                    "*"
                } else {
                    " "
                };
                writeln!(
                    writer,
                    "  {} {:>5.1}  {:>10}  {}",
                    marker,
                    file.similarity,
                    ByteSize(file.size).to_string(),
                    file.path.display()
                )?;
            }
            writeln!(writer)?;
        }

        writeln!(
            writer,
            "Scanned {} file(s) in {:.1}s ({} from cache, {} refreshed)",
            summary.files_seen, summary.elapsed_secs, summary.cache_fresh, summary.refreshed
        )?;
        if stats.group_count > 0 {
            writeln!(
                writer,
                "{} duplicate group(s), {} file(s), {} reclaimable",
                stats.group_count,
                stats.file_count,
                ByteSize(stats.reclaimable_bytes)
            )?;
        }
        if !summary.needs_attention.is_empty() {
            writeln!(
                writer,
                "{} file(s) need attention:",
                summary.needs_attention.len()
            )?;
            for path in &summary.needs_attention {
                writeln!(writer, "  ! {}", path.display())?;
            }
        }
        if summary.interrupted {
            writeln!(writer, "Scan was interrupted; results are partial.")?;
        }
        Ok(())
    }
}
