//! Command-line interface definitions.
//!
//! All CLI arguments, subcommands, and options via the clap derive API:
//! global verbosity flags plus `scan` and `cache` subcommands.
//!
//! # Example
//!
//! ```bash
//! # Scan a music library, print a table of duplicate groups
//! audiodupe scan ~/Music
//!
//! # JSON output for scripting, stricter threshold
//! audiodupe scan ~/Music --output json --threshold 85
//!
//! # Force fingerprint checks on every file
//! audiodupe scan ~/Music --deep
//!
//! # Cache maintenance
//! audiodupe cache stats
//! audiodupe cache evict ~/Music/old.mp3
//! ```

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Incremental audio duplicate finder.
///
/// audiodupe tracks per-file scan state in a local cache so rescans only
/// touch changed files, then groups probable duplicates using fuzzy
/// metadata similarity.
#[derive(Debug, Parser)]
#[command(name = "audiodupe")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase verbosity level (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Emit errors as JSON on stderr (for scripting)
    #[arg(long, global = true)]
    pub json_errors: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Scan a directory for duplicate audio files
    Scan(ScanArgs),
    /// Inspect or maintain the file-state cache
    Cache(CacheArgs),
}

/// Arguments for the scan subcommand.
#[derive(Debug, Args)]
pub struct ScanArgs {
    /// Directory to scan
    #[arg(value_name = "PATH")]
    pub path: PathBuf,

    /// Output format (table for humans, json/csv for scripting)
    #[arg(short, long, value_enum, default_value = "table")]
    pub output: OutputFormat,

    /// Overall similarity threshold for grouping (0-100)
    #[arg(long, value_name = "SCORE", value_parser = parse_threshold)]
    pub threshold: Option<f64>,

    /// Fingerprint every file, catching in-place rewrites that preserve
    /// size and mtime
    #[arg(long)]
    pub deep: bool,

    /// Disable content fingerprinting entirely (size + mtime only)
    #[arg(long, conflicts_with = "deep")]
    pub no_fingerprint: bool,

    /// Number of I/O threads for metadata extraction (default: 4)
    ///
    /// Lower values reduce disk thrashing on HDDs.
    #[arg(long, value_name = "N", default_value = "4")]
    pub io_threads: usize,

    /// Path to the file-state cache database
    ///
    /// If not specified, a platform-specific default path is used.
    #[arg(long, value_name = "PATH")]
    pub cache: Option<PathBuf>,

    /// Clear the cache before scanning (full re-extraction)
    #[arg(long)]
    pub clear_cache: bool,
}

/// Arguments for the cache subcommand.
#[derive(Debug, Args)]
pub struct CacheArgs {
    /// Path to the file-state cache database
    #[arg(long, value_name = "PATH", global = true)]
    pub cache: Option<PathBuf>,

    /// Cache operation
    #[command(subcommand)]
    pub command: CacheCommands,
}

/// Cache maintenance operations.
#[derive(Debug, Subcommand)]
pub enum CacheCommands {
    /// Show entry count and cache location
    Stats,
    /// Remove all cached entries
    Clear,
    /// Remove the entry for one path
    Evict {
        /// File whose entry should be removed
        #[arg(value_name = "PATH")]
        path: PathBuf,
    },
    /// Recompute a file's full BLAKE3 hash and print it
    Verify {
        /// File to hash
        #[arg(value_name = "PATH")]
        path: PathBuf,
    },
}

/// Output format for scan results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table
    Table,
    /// JSON output for scripting
    Json,
    /// CSV output for spreadsheets
    Csv,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Table => write!(f, "table"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Csv => write!(f, "csv"),
        }
    }
}

/// Parse and range-check a similarity threshold.
///
/// # Errors
///
/// Returns an error when the value is not a number in 0..=100.
pub fn parse_threshold(s: &str) -> Result<f64, String> {
    let value: f64 = s
        .trim()
        .parse()
        .map_err(|_| format!("Invalid threshold: '{s}'"))?;
    if !(0.0..=100.0).contains(&value) {
        return Err(format!("Threshold must be between 0 and 100, got {value}"));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_threshold() {
        assert_eq!(parse_threshold("78").unwrap(), 78.0);
        assert_eq!(parse_threshold("0").unwrap(), 0.0);
        assert_eq!(parse_threshold("100").unwrap(), 100.0);
        assert_eq!(parse_threshold(" 85.5 ").unwrap(), 85.5);
        assert!(parse_threshold("101").is_err());
        assert!(parse_threshold("-1").is_err());
        assert!(parse_threshold("high").is_err());
    }

    #[test]
    fn test_cli_parse_scan_basic() {
        let cli = Cli::try_parse_from(["audiodupe", "scan", "/some/path"]).unwrap();
        assert_eq!(cli.verbose, 0);
        match cli.command {
            Commands::Scan(args) => {
                assert_eq!(args.path, PathBuf::from("/some/path"));
                assert_eq!(args.output, OutputFormat::Table);
                assert!(args.threshold.is_none());
                assert!(!args.deep);
            }
            Commands::Cache(_) => panic!("Expected Scan command"),
        }
    }

    #[test]
    fn test_cli_parse_scan_with_options() {
        let cli = Cli::try_parse_from([
            "audiodupe",
            "-v",
            "scan",
            "/path",
            "--output",
            "json",
            "--threshold",
            "85",
            "--deep",
            "--io-threads",
            "8",
        ])
        .unwrap();

        assert_eq!(cli.verbose, 1);
        match cli.command {
            Commands::Scan(args) => {
                assert_eq!(args.output, OutputFormat::Json);
                assert_eq!(args.threshold, Some(85.0));
                assert!(args.deep);
                assert_eq!(args.io_threads, 8);
            }
            Commands::Cache(_) => panic!("Expected Scan command"),
        }
    }

    #[test]
    fn test_cli_deep_conflicts_with_no_fingerprint() {
        let result =
            Cli::try_parse_from(["audiodupe", "scan", "/path", "--deep", "--no-fingerprint"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_quiet_conflicts_with_verbose() {
        let result = Cli::try_parse_from(["audiodupe", "-v", "-q", "scan", "/path"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_parse_cache_subcommands() {
        let cli = Cli::try_parse_from(["audiodupe", "cache", "stats"]).unwrap();
        match cli.command {
            Commands::Cache(args) => assert!(matches!(args.command, CacheCommands::Stats)),
            Commands::Scan(_) => panic!("Expected Cache command"),
        }

        let cli =
            Cli::try_parse_from(["audiodupe", "cache", "evict", "/m/a.mp3"]).unwrap();
        match cli.command {
            Commands::Cache(args) => match args.command {
                CacheCommands::Evict { path } => {
                    assert_eq!(path, PathBuf::from("/m/a.mp3"));
                }
                _ => panic!("Expected Evict command"),
            },
            Commands::Scan(_) => panic!("Expected Cache command"),
        }
    }

    #[test]
    fn test_cli_cache_accepts_db_override() {
        let cli = Cli::try_parse_from([
            "audiodupe",
            "cache",
            "clear",
            "--cache",
            "/tmp/state.db",
        ])
        .unwrap();
        match cli.command {
            Commands::Cache(args) => {
                assert_eq!(args.cache, Some(PathBuf::from("/tmp/state.db")));
            }
            Commands::Scan(_) => panic!("Expected Cache command"),
        }
    }

    #[test]
    fn test_cli_invalid_threshold_rejected() {
        let result =
            Cli::try_parse_from(["audiodupe", "scan", "/path", "--threshold", "150"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_missing_path() {
        let result = Cli::try_parse_from(["audiodupe", "scan"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_version_flag() {
        // clap exits early on --version, which try_parse_from reports as Err
        let result = Cli::try_parse_from(["audiodupe", "--version"]);
        assert!(result.is_err());
    }
}
