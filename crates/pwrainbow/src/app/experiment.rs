//! Experiment runners
//!
//! `run_experiments` draws random passwords from the key space, hashes them,
//! and searches the table for each digest under a per-trial timeout. The
//! summary compares the observed success rate with the table's theoretical
//! coverage.
//!
//! `run_verification` instead picks passwords that lie on stored chains, so
//! every search must succeed.

use std::fmt;
use std::time::{Duration, Instant};

use log::{debug, info};
use rand::rngs::StdRng;
use rand::seq::index;
use rand::{Rng, SeedableRng};

use crate::app::searcher::{SearchOutcome, search_with_deadline};
use crate::domain::chain::password_at;
use crate::domain::hash::Digest;
use crate::domain::keyspace::Password;
use crate::domain::table::RainbowTable;
use crate::error::RainbowError;

/// Experiment configuration
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ExperimentOptions {
    /// Number of random passwords to attack
    pub num_tests: usize,
    /// Per-trial search timeout (None = unlimited)
    pub timeout: Option<Duration>,
    /// Seed for test password selection (None = OS entropy)
    pub seed: Option<u64>,
}

impl ExperimentOptions {
    pub fn new(num_tests: usize) -> Self {
        Self {
            num_tests,
            timeout: None,
            seed: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

/// Where the attacked passwords come from
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExperimentKind {
    /// Uniformly random passwords from the key space
    Attack,
    /// Passwords replayed from stored chains
    Verification,
}

/// One attacked password
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TrialResult {
    /// Password whose digest was attacked
    pub password: Password,
    /// Column of the stored chain the password was taken from
    pub step: Option<u32>,
    /// Its truncated digest
    pub target: Digest,
    /// Search outcome
    pub outcome: SearchOutcome,
    /// Wall-clock search time
    pub elapsed: Duration,
}

impl TrialResult {
    /// Whether the search returned the attacked password itself rather than
    /// a colliding one
    pub fn recovered_original(&self) -> bool {
        self.outcome.password() == Some(self.password)
    }
}

/// Summary statistics over a set of durations, in seconds
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct TimingStats {
    pub count: usize,
    pub mean: f64,
    pub median: f64,
    pub min: f64,
    pub max: f64,
    pub stddev: f64,
}

impl TimingStats {
    /// Compute statistics (all zero for an empty input)
    pub fn from_durations<'a, I>(durations: I) -> Self
    where
        I: IntoIterator<Item = &'a Duration>,
    {
        let mut secs: Vec<f64> = durations.into_iter().map(Duration::as_secs_f64).collect();
        if secs.is_empty() {
            return Self::default();
        }
        secs.sort_by(f64::total_cmp);

        let count = secs.len();
        let mean = secs.iter().sum::<f64>() / count as f64;
        let variance = secs.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / count as f64;
        let median = if count % 2 == 1 {
            secs[count / 2]
        } else {
            (secs[count / 2 - 1] + secs[count / 2]) / 2.0
        };

        Self {
            count,
            mean,
            median,
            min: secs[0],
            max: secs[count - 1],
            stddev: variance.sqrt(),
        }
    }
}

/// Aggregated experiment results
#[derive(Clone, Debug)]
pub struct ExperimentSummary {
    pub kind: ExperimentKind,
    pub trials: Vec<TrialResult>,
    /// Entries in the attacked table
    pub table_entries: usize,
    pub chain_length: u32,
    /// Theoretical coverage of the attacked table
    pub theoretical_coverage: f64,
    pub timeout: Option<Duration>,
    /// Seed used to draw the test passwords
    pub seed: u64,
}

impl ExperimentSummary {
    pub fn successes(&self) -> usize {
        self.trials.iter().filter(|t| t.outcome.is_found()).count()
    }

    pub fn timeouts(&self) -> usize {
        self.trials
            .iter()
            .filter(|t| t.outcome == SearchOutcome::TimedOut)
            .count()
    }

    pub fn failures(&self) -> usize {
        self.trials.len() - self.successes()
    }

    pub fn originals_recovered(&self) -> usize {
        self.trials.iter().filter(|t| t.recovered_original()).count()
    }

    /// Successful trials that returned a different colliding password
    pub fn alternatives(&self) -> usize {
        self.successes() - self.originals_recovered()
    }

    /// Fraction of trials that found a colliding password
    pub fn success_rate(&self) -> f64 {
        if self.trials.is_empty() {
            return 0.0;
        }
        self.successes() as f64 / self.trials.len() as f64
    }

    /// Success rate the table should reach for this kind of experiment
    pub fn expected_rate(&self) -> f64 {
        match self.kind {
            ExperimentKind::Attack => self.theoretical_coverage.min(1.0),
            ExperimentKind::Verification => 1.0,
        }
    }

    /// Success rate relative to the expected rate
    pub fn efficiency(&self) -> f64 {
        let expected = self.expected_rate();
        if expected <= 0.0 {
            return 0.0;
        }
        self.success_rate() / expected
    }

    pub fn overall_timing(&self) -> TimingStats {
        TimingStats::from_durations(self.trials.iter().map(|t| &t.elapsed))
    }

    pub fn success_timing(&self) -> TimingStats {
        TimingStats::from_durations(
            self.trials
                .iter()
                .filter(|t| t.outcome.is_found())
                .map(|t| &t.elapsed),
        )
    }

    pub fn failure_timing(&self) -> TimingStats {
        TimingStats::from_durations(
            self.trials
                .iter()
                .filter(|t| !t.outcome.is_found())
                .map(|t| &t.elapsed),
        )
    }
}

fn write_timing(f: &mut fmt::Formatter<'_>, label: &str, stats: &TimingStats) -> fmt::Result {
    writeln!(
        f,
        "  {:<10} n={:<5} mean={:.4}s median={:.4}s min={:.4}s max={:.4}s stddev={:.4}s",
        label, stats.count, stats.mean, stats.median, stats.min, stats.max, stats.stddev
    )
}

impl fmt::Display for ExperimentSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            ExperimentKind::Attack => writeln!(f, "Attack results")?,
            ExperimentKind::Verification => writeln!(f, "Verification results")?,
        }
        writeln!(f, "  table entries:       {}", self.table_entries)?;
        writeln!(f, "  chain length:        {}", self.chain_length)?;
        match self.timeout {
            Some(timeout) => writeln!(f, "  timeout:             {:.1}s", timeout.as_secs_f64())?,
            None => writeln!(f, "  timeout:             none")?,
        }
        writeln!(f, "  seed:                {}", self.seed)?;
        writeln!(f, "  passwords tested:    {}", self.trials.len())?;
        writeln!(f, "  successful attacks:  {}", self.successes())?;
        writeln!(f, "    original password: {}", self.originals_recovered())?;
        writeln!(f, "    alternative:       {}", self.alternatives())?;
        writeln!(f, "  failed attacks:      {}", self.failures())?;
        writeln!(f, "    timed out:         {}", self.timeouts())?;
        writeln!(f, "  success rate:        {:.2}%", self.success_rate() * 100.0)?;
        writeln!(f, "  expected rate:       {:.2}%", self.expected_rate() * 100.0)?;
        writeln!(f, "  efficiency:          {:.2}%", self.efficiency() * 100.0)?;
        writeln!(f, "Search times")?;
        write_timing(f, "all", &self.overall_timing())?;
        write_timing(f, "found", &self.success_timing())?;
        write_timing(f, "not found", &self.failure_timing())
    }
}

/// Attack `num_tests` random passwords against the table
///
/// Trials run one after another so their timings are comparable.
pub fn run_experiments(
    table: &RainbowTable,
    options: ExperimentOptions,
) -> Result<ExperimentSummary, RainbowError> {
    let params = table.params();
    let seed = options.seed.unwrap_or_else(rand::random);
    let mut rng = StdRng::seed_from_u64(seed);

    info!(
        "running {} trials against {} entries (timeout: {:?})",
        options.num_tests,
        table.len(),
        options.timeout
    );

    let mut trials = Vec::with_capacity(options.num_tests);
    for _ in 0..options.num_tests {
        let password = params.keyspace().random_password(&mut rng);
        trials.push(run_trial(table, password, None, options.timeout)?);
    }

    Ok(summarize(table, ExperimentKind::Attack, trials, options, seed))
}

/// Search for passwords taken from stored chains
///
/// Samples up to `num_tests` distinct entries, replays each a random number
/// of steps in `0..t`, and searches for the digest of the password reached.
/// Every trial lies on a stored chain, so any miss other than a timeout
/// points at a broken table or search.
pub fn run_verification(
    table: &RainbowTable,
    options: ExperimentOptions,
) -> Result<ExperimentSummary, RainbowError> {
    let params = table.params();
    let seed = options.seed.unwrap_or_else(rand::random);
    let mut rng = StdRng::seed_from_u64(seed);
    let amount = options.num_tests.min(table.len());

    info!(
        "verifying {} stored chains of {} (timeout: {:?})",
        amount,
        table.len(),
        options.timeout
    );

    let sampled = index::sample(&mut rng, table.len(), amount);
    let mut trials = Vec::with_capacity(amount);
    for slot in sampled.iter() {
        let entry = table.entries()[slot];
        let step = rng.gen_range(0..params.chain_length());
        let password = password_at(params, entry.start, step);
        trials.push(run_trial(table, password, Some(step), options.timeout)?);
    }

    Ok(summarize(table, ExperimentKind::Verification, trials, options, seed))
}

fn run_trial(
    table: &RainbowTable,
    password: Password,
    step: Option<u32>,
    timeout: Option<Duration>,
) -> Result<TrialResult, RainbowError> {
    let target = table.params().digest(&password);

    let started = Instant::now();
    let deadline = timeout.and_then(|timeout| started.checked_add(timeout));
    let outcome = search_with_deadline(table, &target, deadline)?;
    let elapsed = started.elapsed();

    debug!(
        "trial {} ({}, step {:?}) -> {:?} in {:.4}s",
        password,
        target,
        step,
        outcome,
        elapsed.as_secs_f64()
    );
    Ok(TrialResult {
        password,
        step,
        target,
        outcome,
        elapsed,
    })
}

fn summarize(
    table: &RainbowTable,
    kind: ExperimentKind,
    trials: Vec<TrialResult>,
    options: ExperimentOptions,
    seed: u64,
) -> ExperimentSummary {
    let summary = ExperimentSummary {
        kind,
        trials,
        table_entries: table.len(),
        chain_length: table.chain_length(),
        theoretical_coverage: table.theoretical_coverage(),
        timeout: options.timeout,
        seed,
    };
    info!(
        "{:?} done: {} of {} found ({:.2}%)",
        kind,
        summary.successes(),
        summary.trials.len(),
        summary.success_rate() * 100.0
    );
    summary
}
