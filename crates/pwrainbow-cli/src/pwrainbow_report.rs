//! Table report CLI
//!
//! Usage: pwrainbow_report <TABLE> [--tests N] [--verify-search N] [--timeout-secs S] [--seed S]
//!
//! Prints the measured key space coverage of a table, the results of searching
//! for passwords taken from stored chains, and the results of an attack
//! experiment against random passwords.

use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use log::{LevelFilter, warn};
use pwrainbow::app::coverage::measure_coverage_with_progress;
use pwrainbow::app::experiment::{ExperimentOptions, run_experiments, run_verification};
use pwrainbow::domain::table_format::ValidationOptions;
use pwrainbow::infra::table_io::load_any_table;

#[derive(Parser, Debug)]
#[command(name = "pwrainbow_report", version, about = "Coverage and attack report")]
struct Args {
    /// Table file (.csv or binary)
    table: PathBuf,

    /// Number of random passwords to attack
    #[arg(long = "tests", default_value_t = 50)]
    tests: usize,

    /// Per-search timeout in seconds
    #[arg(long = "timeout-secs", default_value_t = 10.0)]
    timeout_secs: f64,

    /// Seed for test password selection
    #[arg(long = "seed")]
    seed: Option<u64>,

    /// Skip the coverage measurement
    #[arg(long = "no-coverage")]
    no_coverage: bool,

    /// Recompute this many stored chains and check their endpoints
    #[arg(long = "verify", default_value_t = 0)]
    verify: usize,

    /// Search for passwords replayed from this many stored chains
    #[arg(long = "verify-search", default_value_t = 10)]
    verify_search: usize,

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

fn main() -> Result<()> {
    let args = Args::parse();
    init_logger(args.verbose);

    let table = load_any_table(&args.table, &ValidationOptions::permissive())
        .with_context(|| format!("failed to load {}", args.table.display()))?;
    println!("Table: {} ({} entries)", args.table.display(), table.len());

    if args.verify > 0 {
        let broken = table.verify_entries(args.verify);
        if broken.is_empty() {
            println!("Verified {} chains: all endpoints match.", args.verify.min(table.len()));
        } else {
            for entry in &broken {
                warn!("stored endpoint {} does not match chain from {}", entry.end, entry.start);
            }
            println!("{} of the verified chains have wrong endpoints.", broken.len());
        }
    }

    if !args.no_coverage {
        let coverage = measure_coverage_with_progress(&table, |current, total| {
            print!("\r[Coverage] {}/{} chains", current, total);
            let _ = io::stdout().flush();
        })
        .context("coverage measurement failed")?;
        println!();
        println!("{}", coverage);
        println!();
    }

    let timeout =
        Duration::try_from_secs_f64(args.timeout_secs).context("invalid --timeout-secs")?;
    let with_seed = |options: ExperimentOptions| match args.seed {
        Some(seed) => options.with_seed(seed),
        None => options,
    };

    if args.verify_search > 0 {
        let options = with_seed(ExperimentOptions::new(args.verify_search).with_timeout(timeout));
        let verification = run_verification(&table, options)?;
        println!("{}", verification);
        if verification.failures() > verification.timeouts() {
            warn!(
                "{} stored-chain passwords were not found",
                verification.failures() - verification.timeouts()
            );
        }
        println!();
    }

    let options = with_seed(ExperimentOptions::new(args.tests).with_timeout(timeout));
    let summary = run_experiments(&table, options)?;
    println!("{}", summary);

    Ok(())
}
