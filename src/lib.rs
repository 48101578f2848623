//! audiodupe - Incremental audio duplicate finder
//!
//! Tracks per-file scan state (size, mtime, content fingerprint, extracted
//! tags) in a local SQLite cache so rescans only touch changed files, then
//! groups probable duplicates using multi-signal fuzzy metadata similarity.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use anyhow::Context;

pub mod cache;
pub mod cli;
pub mod config;
pub mod duplicates;
pub mod error;
pub mod logging;
pub mod metadata;
pub mod output;
pub mod progress;
pub mod scan;
pub mod scanner;
pub mod session;

use cache::{FileStateStore, FingerprintPolicy};
use cli::{CacheCommands, Cli, Commands, OutputFormat};
use config::Config;
use error::ExitCode;
use metadata::LoftyExtractor;
use output::{CsvOutput, JsonOutput, TableOutput};
use progress::{Progress, ProgressCallback};
use scan::{run_scan, ScanOptions};

/// Run the application with parsed CLI arguments, returning the exit code.
///
/// # Errors
///
/// Returns an error for fatal failures (unusable scan root, cache that
/// cannot be opened); per-file problems are reported through the exit code
/// instead.
pub fn run_app(cli: Cli) -> anyhow::Result<ExitCode> {
    logging::init_logging(cli.verbose, cli.quiet);
    let config = Config::load();
    let quiet = cli.quiet;

    match cli.command {
        Commands::Scan(args) => run_scan_command(quiet, &config, args),
        Commands::Cache(args) => run_cache_command(&config, args),
    }
}

fn run_scan_command(
    quiet: bool,
    config: &Config,
    args: cli::ScanArgs,
) -> anyhow::Result<ExitCode> {
    let cache_path = match args.cache {
        Some(path) => path,
        None => config.resolve_cache_path()?,
    };
    if let Some(parent) = cache_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Cannot create cache directory {}", parent.display()))?;
    }
    let store = FileStateStore::open(&cache_path)
        .with_context(|| format!("Cannot open cache at {}", cache_path.display()))?;

    if args.clear_cache {
        let removed = store.clear().context("Cannot clear cache")?;
        log::info!("Cleared {} cache entr(ies)", removed);
    }

    let fingerprint_policy = if args.no_fingerprint {
        FingerprintPolicy::Disabled
    } else {
        config.fingerprint.into()
    };
    let options = ScanOptions {
        fingerprint_policy,
        deep: args.deep,
        overall_threshold: Some(args.threshold.unwrap_or(config.threshold)),
        io_threads: args.io_threads,
        extra_extensions: config.extra_extensions.clone(),
    };

    let cancel = Arc::new(AtomicBool::new(false));
    let handler_flag = Arc::clone(&cancel);
    ctrlc::set_handler(move || {
        handler_flag.store(true, std::sync::atomic::Ordering::SeqCst);
    })
    .context("Cannot install interrupt handler")?;

    // Bars only make sense on the human-readable path; machine formats get
    // clean stdout.
    let progress: Option<Arc<dyn ProgressCallback>> = match args.output {
        OutputFormat::Table if !quiet => Some(Arc::new(Progress::new(false))),
        _ => None,
    };

    let extractor = LoftyExtractor::new();
    let report = run_scan(
        &store,
        &extractor,
        &args.path,
        &options,
        progress,
        Some(cancel),
    )?;

    let exit_code = ExitCode::for_report(&report);
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    match args.output {
        OutputFormat::Table => TableOutput::new(&report).write_to(&mut out)?,
        OutputFormat::Json => JsonOutput::new(&report, exit_code).write_to(&mut out, true)?,
        OutputFormat::Csv => CsvOutput::new(&report.groups).write_to(&mut out)?,
    }

    Ok(exit_code)
}

fn run_cache_command(config: &Config, args: cli::CacheArgs) -> anyhow::Result<ExitCode> {
    let cache_path = match args.cache {
        Some(path) => path,
        None => config.resolve_cache_path()?,
    };

    match args.command {
        CacheCommands::Stats => {
            let store = FileStateStore::open(&cache_path)
                .with_context(|| format!("Cannot open cache at {}", cache_path.display()))?;
            let entries = store.len().context("Cannot read cache")?;
            let db_size = std::fs::metadata(&cache_path).map(|m| m.len()).unwrap_or(0);
            println!("Cache:   {}", cache_path.display());
            println!("Entries: {}", entries);
            println!("Size:    {}", bytesize::ByteSize(db_size));
        }
        CacheCommands::Clear => {
            let store = FileStateStore::open(&cache_path)
                .with_context(|| format!("Cannot open cache at {}", cache_path.display()))?;
            let removed = store.clear().context("Cannot clear cache")?;
            println!("Removed {} entr(ies)", removed);
        }
        CacheCommands::Evict { path } => {
            let store = FileStateStore::open(&cache_path)
                .with_context(|| format!("Cannot open cache at {}", cache_path.display()))?;
            let removed = store
                .evict(&path)
                .with_context(|| format!("Cannot evict {}", path.display()))?;
            if removed {
                println!("Evicted {}", path.display());
            } else {
                println!("No entry for {}", path.display());
            }
        }
        CacheCommands::Verify { path } => {
            let digest = scanner::full_hash(&path)
                .with_context(|| format!("Cannot hash {}", path.display()))?;
            println!("{}  {}", scanner::hash_to_hex(&digest), path.display());

            // When the cache has an entry for this path, also report
            // whether its quick fingerprint still matches.
            let store = FileStateStore::open(&cache_path)
                .with_context(|| format!("Cannot open cache at {}", cache_path.display()))?;
            if let Some(entry) = store.get(&path).context("Cannot read cache")? {
                match entry.fingerprint {
                    Some(stored) => {
                        let current = scanner::quick_fingerprint(&path)
                            .with_context(|| format!("Cannot fingerprint {}", path.display()))?;
                        if current == stored {
                            println!("Cached fingerprint: match");
                        } else {
                            println!("Cached fingerprint: MISMATCH (file changed since scan)");
                        }
                    }
                    None => println!("Cached entry has no fingerprint"),
                }
            }
        }
    }

    Ok(ExitCode::Success)
}
