//! Password search CLI
//!
//! Usage: pwrainbow_search <TABLE> (--hash <HEX> | --password <TEXT>) [options]
//!
//! Examples:
//!   pwrainbow_search tables/t1000.csv --hash 2cf24dba5f
//!   pwrainbow_search tables/t1000.bin --password hello --timeout-secs 10 --bruteforce

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::{Context, Result, bail};
use clap::Parser;
use log::{LevelFilter, info};
use pwrainbow::app::searcher::{SearchOutcome, brute_force, search_with_stats};
use pwrainbow::domain::table_format::{TableFormatError, ValidationOptions};
use pwrainbow::{Digest, RainbowTable};

#[derive(Parser, Debug)]
#[command(name = "pwrainbow_search", version, about = "Search a rainbow table")]
struct Args {
    /// Table file (.csv or binary)
    table: PathBuf,

    /// Target digest in hex
    #[arg(long = "hash", conflicts_with = "password", required_unless_present = "password")]
    hash: Option<String>,

    /// Hash this password and search for its digest
    #[arg(long = "password")]
    password: Option<String>,

    /// Give up after this many seconds
    #[arg(long = "timeout-secs")]
    timeout_secs: Option<f64>,

    /// Scan the whole key space when the table search fails
    #[arg(long = "bruteforce")]
    bruteforce: bool,

    /// Refuse tables that stopped short of their target size
    #[arg(long = "require-complete")]
    require_complete: bool,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short = 'v', action = clap::ArgAction::Count)]
    verbose: u8,
}

fn init_logger(verbosity: u8) {
    let level = match verbosity {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    let _ = env_logger::Builder::from_default_env()
        .filter_level(level)
        .try_init();
}

fn format_table_error(path: &Path, err: TableFormatError) -> String {
    match err {
        TableFormatError::InvalidMagic => format!(
            "Invalid file: '{}' is not a valid rainbow table file.",
            path.display()
        ),
        TableFormatError::UnsupportedVersion(version) => format!(
            "Unsupported format version: {}.\nPlease regenerate the table file.",
            version
        ),
        TableFormatError::TableIncomplete { target, actual } => format!(
            "Table is incomplete: {} of {} entries.\nRebuild it with a larger attempt budget or drop --require-complete.",
            actual, target
        ),
        TableFormatError::InvalidFileSize { expected, found } => format!(
            "Invalid file size: expected {} bytes, found {} bytes.",
            expected, found
        ),
        other => format!("Failed to load '{}': {}", path.display(), other),
    }
}

#[cfg(feature = "mmap")]
fn open_table(path: &Path, options: &ValidationOptions) -> Result<RainbowTable, TableFormatError> {
    use pwrainbow::infra::table_csv::load_table_csv;
    use pwrainbow::infra::table_io::MappedTable;

    if path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"))
    {
        load_table_csv(path, options)
    } else {
        MappedTable::open(path, options)?.to_table()
    }
}

#[cfg(not(feature = "mmap"))]
fn open_table(path: &Path, options: &ValidationOptions) -> Result<RainbowTable, TableFormatError> {
    pwrainbow::infra::table_io::load_any_table(path, options)
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logger(args.verbose);

    let options = ValidationOptions {
        require_complete: args.require_complete,
        ..ValidationOptions::permissive()
    };
    let load_start = Instant::now();
    let table = match open_table(&args.table, &options) {
        Ok(table) => table,
        Err(e) => bail!(format_table_error(&args.table, e)),
    };
    let params = table.params().clone();
    info!(
        "loaded {} entries in {:.2}s",
        table.len(),
        load_start.elapsed().as_secs_f64()
    );
    println!(
        "Table: {} entries, t={}, {} bits, coverage {:.2}%",
        table.len(),
        params.chain_length(),
        params.digest_bits(),
        table.theoretical_coverage() * 100.0
    );

    let target = match (&args.hash, &args.password) {
        (Some(hex), _) => Digest::from_hex(hex).context("invalid --hash")?,
        (None, Some(text)) => {
            let password = params
                .keyspace()
                .parse_password(text)
                .context("invalid --password")?;
            params.digest(&password)
        }
        (None, None) => bail!("either --hash or --password is required"),
    };
    println!("Target digest: {}", target);

    let deadline = args
        .timeout_secs
        .map(Duration::try_from_secs_f64)
        .transpose()
        .context("invalid --timeout-secs")?
        .and_then(|timeout| Instant::now().checked_add(timeout));

    let search_start = Instant::now();
    let (outcome, stats) = search_with_stats(&table, &target, deadline)?;
    let elapsed = search_start.elapsed().as_secs_f64();
    info!(
        "columns tried: {}, endpoint hits: {}, false alarms: {}",
        stats.positions_tried, stats.endpoint_hits, stats.false_alarms
    );

    match outcome {
        SearchOutcome::Found(password) => {
            println!("Found: {} ({:.4} seconds)", password, elapsed);
            println!("Digest of result: {}", params.digest(&password));
            return Ok(());
        }
        SearchOutcome::NotFound => println!("Not found in table ({:.4} seconds).", elapsed),
        SearchOutcome::TimedOut => println!("Search timed out after {:.4} seconds.", elapsed),
    }

    if args.bruteforce {
        println!("Scanning the whole key space ({} passwords)...", params.keyspace().size());
        let scan_start = Instant::now();
        match brute_force(&params, &target)? {
            Some(password) => println!(
                "Brute force found: {} ({:.2} seconds)",
                password,
                scan_start.elapsed().as_secs_f64()
            ),
            None => println!("No password in the key space has this digest."),
        }
    }

    Ok(())
}
