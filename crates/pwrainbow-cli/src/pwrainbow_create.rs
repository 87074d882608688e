//! Rainbow table creation CLI
//!
//! Usage: pwrainbow_create [options]
//!
//! Example: pwrainbow_create -t 1000 -n 11813 --seed 42 -o tables/t1000.csv
//!
//! The output encoding follows the file extension: `.csv` writes the CSV
//! interchange format, anything else the binary format.

use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use log::{LevelFilter, warn};
use pwrainbow::app::generator::{
    BuildOptions, BuildProgress, BuildStatus, generate_table_parallel_with_progress,
    generate_table_with_progress,
};
use pwrainbow::constants::{
    DEFAULT_ALPHABET, DEFAULT_ATTEMPT_FACTOR, DEFAULT_CHAIN_LENGTH, DEFAULT_DIGEST_BYTES,
    DEFAULT_PASSWORD_LEN, DEFAULT_TABLE_ENTRIES,
};
use pwrainbow::infra::table_io::save_any_table;
use pwrainbow::{KeySpace, TableParams};

#[derive(Parser, Debug)]
#[command(name = "pwrainbow_create", version, about = "Build a rainbow table")]
struct Args {
    /// Chain length (t)
    #[arg(short = 't', long = "chain-length", default_value_t = DEFAULT_CHAIN_LENGTH)]
    chain_length: u32,

    /// Number of unique endpoints to store (n)
    #[arg(short = 'n', long = "entries", default_value_t = DEFAULT_TABLE_ENTRIES)]
    entries: u64,

    /// Password alphabet
    #[arg(long = "alphabet", default_value = DEFAULT_ALPHABET)]
    alphabet: String,

    /// Password length
    #[arg(long = "length", default_value_t = DEFAULT_PASSWORD_LEN)]
    length: usize,

    /// Truncated digest width in bytes
    #[arg(long = "digest-bytes", default_value_t = DEFAULT_DIGEST_BYTES)]
    digest_bytes: usize,

    /// Attempt budget as a multiple of the entry count
    #[arg(long = "attempt-factor", default_value_t = DEFAULT_ATTEMPT_FACTOR)]
    attempt_factor: u64,

    /// Seed for start password selection (random if omitted)
    #[arg(long = "seed")]
    seed: Option<u64>,

    /// Output file (.csv for CSV, anything else for binary)
    #[arg(short = 'o', long = "output")]
    output: Option<PathBuf>,

    /// Build on a single thread
    #[arg(long = "sequential")]
    sequential: bool,

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

fn print_progress(progress: BuildProgress) {
    let percent = if progress.target > 0 {
        (progress.entries as f64 / progress.target as f64) * 100.0
    } else {
        100.0
    };
    print!(
        "\r[Generation] Progress: {:.2}% ({}/{}, {} attempts)",
        percent, progress.entries, progress.target, progress.attempts
    );
    let _ = io::stdout().flush();
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logger(args.verbose);

    let keyspace = KeySpace::new(&args.alphabet, args.length).context("invalid key space")?;
    let params = TableParams::new(keyspace, args.digest_bytes, args.chain_length)
        .context("invalid table parameters")?;

    let mut options = BuildOptions::new(args.entries)
        .with_attempt_budget(args.entries.saturating_mul(args.attempt_factor));
    if let Some(seed) = args.seed {
        options = options.with_seed(seed);
    }

    let output = args.output.unwrap_or_else(|| {
        PathBuf::from(format!(
            "tables/rainbow_table_t{}_n{}.csv",
            args.chain_length, args.entries
        ))
    });

    println!(
        "Generating rainbow table: t={} n={} N={} ({} bits)",
        params.chain_length(),
        args.entries,
        params.keyspace().size(),
        params.digest_bits()
    );
    println!(
        "Theoretical coverage: {:.2}%",
        params.theoretical_coverage(args.entries) * 100.0
    );

    let start = Instant::now();
    let report = if args.sequential {
        generate_table_with_progress(&params, options, print_progress)
    } else {
        generate_table_parallel_with_progress(&params, options, print_progress)
    };
    println!();

    println!(
        "Generated {} entries in {} attempts ({:.2} seconds, seed {})",
        report.table.len(),
        report.attempts,
        start.elapsed().as_secs_f64(),
        report.seed
    );
    println!(
        "Collisions discarded: {} (efficiency {:.2}%)",
        report.collisions(),
        report.efficiency() * 100.0
    );
    if let BuildStatus::Incomplete { target, actual } = report.status() {
        warn!(
            "attempt budget exhausted: table holds {} of {} requested entries",
            actual, target
        );
    }

    save_any_table(&output, &report.table)
        .with_context(|| format!("failed to save table to {}", output.display()))?;

    let file_size = std::fs::metadata(&output).map(|m| m.len()).unwrap_or(0);
    println!(
        "Saved to {} ({:.2} MB)",
        output.display(),
        file_size as f64 / (1024.0 * 1024.0)
    );
    println!("The table is ready for searching with pwrainbow_search.");
    Ok(())
}
