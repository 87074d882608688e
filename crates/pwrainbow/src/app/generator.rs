//! Table generation workflow
//!
//! This module provides functions for generating rainbow tables: draw a random
//! start password, compute its chain, keep it only if its endpoint is new, and
//! repeat until the table is full or the attempt budget is spent.

use log::{debug, info, trace};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;

use crate::constants::{BUILD_BATCH_SIZE, DEFAULT_ATTEMPT_FACTOR};
use crate::domain::chain::{ChainEntry, compute_chain};
use crate::domain::keyspace::Password;
use crate::domain::params::TableParams;
use crate::domain::table::{RainbowTable, TableBuilder};

/// Table construction options
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BuildOptions {
    /// Number of unique endpoints wanted (n)
    pub target_entries: u64,
    /// Maximum number of chains to compute
    pub attempt_budget: u64,
    /// Seed for start password selection (None = OS entropy)
    pub seed: Option<u64>,
}

impl BuildOptions {
    /// Options for `target_entries` with the default budget (n × 10)
    pub fn new(target_entries: u64) -> Self {
        Self {
            target_entries,
            attempt_budget: target_entries.saturating_mul(DEFAULT_ATTEMPT_FACTOR),
            seed: None,
        }
    }

    /// Fix the pseudorandom source
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Override the attempt budget
    pub fn with_attempt_budget(mut self, attempt_budget: u64) -> Self {
        self.attempt_budget = attempt_budget;
        self
    }
}

/// Progress snapshot reported during construction
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BuildProgress {
    /// Unique entries stored so far
    pub entries: u64,
    /// Target number of entries
    pub target: u64,
    /// Chains computed so far
    pub attempts: u64,
}

/// Construction outcome
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BuildStatus {
    /// The table reached its target size
    Complete,
    /// The attempt budget ran out first; the table is valid but smaller
    Incomplete { target: u64, actual: u64 },
}

/// Result of a table build
#[derive(Debug)]
pub struct BuildReport {
    /// The finished table
    pub table: RainbowTable,
    /// Chains computed
    pub attempts: u64,
    /// Seed actually used (drawn from OS entropy when none was given)
    pub seed: u64,
}

impl BuildReport {
    pub fn status(&self) -> BuildStatus {
        if self.table.is_complete() {
            BuildStatus::Complete
        } else {
            BuildStatus::Incomplete {
                target: self.table.target_entries(),
                actual: self.table.len() as u64,
            }
        }
    }

    pub fn is_complete(&self) -> bool {
        self.status() == BuildStatus::Complete
    }

    /// Chains discarded because their endpoint was already stored
    pub fn collisions(&self) -> u64 {
        self.attempts - self.table.len() as u64
    }

    /// Fraction of attempts that produced a stored entry
    pub fn efficiency(&self) -> f64 {
        if self.attempts == 0 {
            return 1.0;
        }
        self.table.len() as f64 / self.attempts as f64
    }
}

/// Generate a rainbow table
pub fn generate_table(params: &TableParams, options: BuildOptions) -> BuildReport {
    generate_table_with_progress(params, options, |_| {})
}

/// Generate table with progress callback
///
/// `on_progress` is called every n/20 stored entries and once at the end.
pub fn generate_table_with_progress<F>(
    params: &TableParams,
    options: BuildOptions,
    mut on_progress: F,
) -> BuildReport
where
    F: FnMut(BuildProgress),
{
    let (seed, mut rng) = seeded_rng(options.seed);
    log_start(params, &options, seed);

    let mut builder = TableBuilder::new(params.clone(), options.target_entries);
    let step = progress_step(options.target_entries);
    let mut attempts = 0u64;

    while !builder.is_full() && attempts < options.attempt_budget {
        attempts += 1;
        let start = params.keyspace().random_password(&mut rng);
        let entry = compute_chain(params, start);
        record(&mut builder, entry, attempts, step, &mut on_progress);
    }

    finish(builder, attempts, seed, &mut on_progress)
}

/// Generate a rainbow table using rayon
///
/// Start passwords are drawn from the seeded generator in the same order as
/// `generate_table`, chains are computed in parallel batches, and results are
/// inserted in draw order. For a given seed the table is identical to the
/// sequential one.
pub fn generate_table_parallel(params: &TableParams, options: BuildOptions) -> BuildReport {
    generate_table_parallel_with_progress(params, options, |_| {})
}

/// Generate table in parallel with progress callback
pub fn generate_table_parallel_with_progress<F>(
    params: &TableParams,
    options: BuildOptions,
    mut on_progress: F,
) -> BuildReport
where
    F: FnMut(BuildProgress),
{
    let (seed, mut rng) = seeded_rng(options.seed);
    log_start(params, &options, seed);

    let mut builder = TableBuilder::new(params.clone(), options.target_entries);
    let step = progress_step(options.target_entries);
    let mut attempts = 0u64;

    while !builder.is_full() && attempts < options.attempt_budget {
        let missing = options.target_entries - builder.len() as u64;
        let batch = missing
            .max(64)
            .min(BUILD_BATCH_SIZE as u64)
            .min(options.attempt_budget - attempts) as usize;

        let starts: Vec<Password> = (0..batch)
            .map(|_| params.keyspace().random_password(&mut rng))
            .collect();
        let chains: Vec<ChainEntry> = starts
            .into_par_iter()
            .map(|start| compute_chain(params, start))
            .collect();

        for entry in chains {
            if builder.is_full() {
                break;
            }
            attempts += 1;
            record(&mut builder, entry, attempts, step, &mut on_progress);
        }
    }

    finish(builder, attempts, seed, &mut on_progress)
}

fn seeded_rng(seed: Option<u64>) -> (u64, StdRng) {
    let seed = seed.unwrap_or_else(rand::random);
    (seed, StdRng::seed_from_u64(seed))
}

fn progress_step(target_entries: u64) -> u64 {
    (target_entries / 20).max(1)
}

fn log_start(params: &TableParams, options: &BuildOptions, seed: u64) {
    info!(
        "building table: t={} n={} budget={} N={} coverage≈{:.2}% seed={}",
        params.chain_length(),
        options.target_entries,
        options.attempt_budget,
        params.keyspace().size(),
        params.theoretical_coverage(options.target_entries) * 100.0,
        seed
    );
}

fn record<F>(
    builder: &mut TableBuilder,
    entry: ChainEntry,
    attempts: u64,
    step: u64,
    on_progress: &mut F,
) where
    F: FnMut(BuildProgress),
{
    if builder.insert(entry) {
        let entries = builder.len() as u64;
        if entries % step == 0 {
            debug!("entries: {} (attempts: {})", entries, attempts);
            on_progress(BuildProgress {
                entries,
                target: builder.target_entries(),
                attempts,
            });
        }
    } else {
        trace!(
            "endpoint collision: {} from start {} discarded",
            entry.end, entry.start
        );
    }
}

fn finish<F>(builder: TableBuilder, attempts: u64, seed: u64, on_progress: &mut F) -> BuildReport
where
    F: FnMut(BuildProgress),
{
    let table = builder.finish();
    on_progress(BuildProgress {
        entries: table.len() as u64,
        target: table.target_entries(),
        attempts,
    });

    let report = BuildReport {
        table,
        attempts,
        seed,
    };
    match report.status() {
        BuildStatus::Complete => info!(
            "table built: {} entries in {} attempts ({:.2}% efficiency)",
            report.table.len(),
            attempts,
            report.efficiency() * 100.0
        ),
        BuildStatus::Incomplete { target, actual } => info!(
            "attempt budget exhausted: {} of {} entries after {} attempts",
            actual, target, attempts
        ),
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{DEFAULT_CHAIN_LENGTH, DEFAULT_TABLE_ENTRIES};
    use crate::domain::keyspace::KeySpace;

    fn params() -> TableParams {
        TableParams::reference(DEFAULT_CHAIN_LENGTH).unwrap()
    }

    #[test]
    fn test_build_options_default_budget() {
        let options = BuildOptions::new(200);
        assert_eq!(options.attempt_budget, 2000);
        assert_eq!(options.seed, None);
        assert_eq!(options.with_seed(5).seed, Some(5));
    }

    #[test]
    fn test_generate_table_reaches_target() {
        let report = generate_table(&params(), BuildOptions::new(DEFAULT_TABLE_ENTRIES).with_seed(1));
        assert!(report.is_complete());
        assert_eq!(report.table.len() as u64, DEFAULT_TABLE_ENTRIES);
        assert_eq!(report.collisions(), report.attempts - DEFAULT_TABLE_ENTRIES);
        assert_eq!(report.seed, 1);
    }

    #[test]
    fn test_generate_table_deterministic() {
        let options = BuildOptions::new(50).with_seed(42);
        let a = generate_table(&params(), options);
        let b = generate_table(&params(), options);
        assert_eq!(a.table.entries(), b.table.entries());
        assert_eq!(a.attempts, b.attempts);
    }

    #[test]
    fn test_generate_table_different_seeds() {
        let a = generate_table(&params(), BuildOptions::new(20).with_seed(1));
        let b = generate_table(&params(), BuildOptions::new(20).with_seed(2));
        assert_ne!(a.table.entries(), b.table.entries());
    }

    #[test]
    fn test_generate_table_entries_are_real_chains() {
        let params = params();
        let report = generate_table(&params, BuildOptions::new(30).with_seed(3));
        for entry in report.table.entries() {
            assert_eq!(compute_chain(&params, entry.start), *entry);
        }
        assert!(report.table.verify_entries(usize::MAX).is_empty());
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let params = params();
        let options = BuildOptions::new(300).with_seed(99);
        let sequential = generate_table(&params, options);
        let parallel = generate_table_parallel(&params, options);

        assert_eq!(sequential.table.entries(), parallel.table.entries());
        assert_eq!(sequential.attempts, parallel.attempts);
    }

    #[test]
    fn test_exhausted_budget_returns_partial_table() {
        // "ab" × 3 has only 8 passwords, so at most 8 distinct endpoints exist
        let keyspace = KeySpace::new("ab", 3).unwrap();
        let params = TableParams::new(keyspace, 1, 4).unwrap();
        let options = BuildOptions::new(100).with_seed(7).with_attempt_budget(50);

        let report = generate_table(&params, options);
        assert_eq!(report.attempts, 50);
        assert!(report.table.len() <= 8);
        assert!(!report.table.is_empty());
        assert_eq!(
            report.status(),
            BuildStatus::Incomplete {
                target: 100,
                actual: report.table.len() as u64
            }
        );

        let parallel = generate_table_parallel(&params, options);
        assert_eq!(parallel.attempts, 50);
        assert_eq!(parallel.table.entries(), report.table.entries());
    }

    #[test]
    fn test_zero_entries() {
        let report = generate_table(&params(), BuildOptions::new(0).with_seed(1));
        assert!(report.table.is_empty());
        assert_eq!(report.attempts, 0);
        assert!(report.is_complete());
        assert_eq!(report.efficiency(), 1.0);
    }

    #[test]
    fn test_progress_callback() {
        let mut calls = Vec::new();
        let report = generate_table_with_progress(
            &params(),
            BuildOptions::new(40).with_seed(11),
            |progress| calls.push(progress),
        );

        assert!(calls.len() >= 2);
        let last = calls.last().unwrap();
        assert_eq!(last.entries, 40);
        assert_eq!(last.target, 40);
        assert_eq!(last.attempts, report.attempts);
        assert!(calls.windows(2).all(|w| w[0].entries <= w[1].entries));
    }

    #[test]
    fn test_omitted_seed_is_reported() {
        let a = generate_table(&params(), BuildOptions::new(5));
        let b = generate_table(&params(), BuildOptions::new(5).with_seed(a.seed));
        assert_eq!(a.table.entries(), b.table.entries());
    }
}
