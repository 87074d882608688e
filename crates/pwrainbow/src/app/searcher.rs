//! Search workflow implementation
//!
//! This module recovers a password from a truncated digest using the rainbow
//! table algorithm: assume the target sits at column `i`, project it forward
//! to an endpoint, look the endpoint up, and replay the matching chain.

use std::time::{Duration, Instant};

use log::{debug, trace};
use rayon::prelude::*;

use crate::domain::chain::{find_in_chain, project_to_endpoint};
use crate::domain::hash::Digest;
use crate::domain::keyspace::Password;
use crate::domain::params::TableParams;
use crate::domain::table::RainbowTable;
use crate::error::RainbowError;

/// Outcome of a table search
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SearchOutcome {
    /// A password whose digest equals the target
    Found(Password),
    /// Every column was tried without a verified match
    NotFound,
    /// The deadline passed before every column was tried
    TimedOut,
}

impl SearchOutcome {
    pub fn password(&self) -> Option<Password> {
        match self {
            SearchOutcome::Found(password) => Some(*password),
            _ => None,
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, SearchOutcome::Found(_))
    }
}

/// Counters collected during one search
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SearchStats {
    /// Columns projected
    pub positions_tried: u32,
    /// Projections whose endpoint was in the table
    pub endpoint_hits: u32,
    /// Endpoint hits whose chain did not contain the target
    pub false_alarms: u32,
    /// Column at which the target was assumed when it was found
    pub found_at: Option<u32>,
}

/// Search the table for a password hashing to `target`
///
/// # Errors
/// `InvalidDigestWidth` if `target` is not as wide as the table's digests.
pub fn search(table: &RainbowTable, target: &Digest) -> Result<SearchOutcome, RainbowError> {
    search_with_deadline(table, target, None)
}

/// Search with an optional deadline
///
/// The deadline is checked before each column; once it has passed the search
/// stops with `TimedOut`.
pub fn search_with_deadline(
    table: &RainbowTable,
    target: &Digest,
    deadline: Option<Instant>,
) -> Result<SearchOutcome, RainbowError> {
    search_with_stats(table, target, deadline).map(|(outcome, _)| outcome)
}

/// Search with a timeout measured from now
pub fn search_with_timeout(
    table: &RainbowTable,
    target: &Digest,
    timeout: Duration,
) -> Result<SearchOutcome, RainbowError> {
    search_with_deadline(table, target, Instant::now().checked_add(timeout))
}

/// Search and report per-search counters
pub fn search_with_stats(
    table: &RainbowTable,
    target: &Digest,
    deadline: Option<Instant>,
) -> Result<(SearchOutcome, SearchStats), RainbowError> {
    let params = table.params();
    params.check_digest(target)?;

    let mut stats = SearchStats::default();
    if table.is_empty() {
        return Ok((SearchOutcome::NotFound, stats));
    }

    for column in (0..params.chain_length()).rev() {
        if let Some(deadline) = deadline
            && Instant::now() >= deadline
        {
            debug!(
                "search for {} timed out after {} columns",
                target, stats.positions_tried
            );
            return Ok((SearchOutcome::TimedOut, stats));
        }

        stats.positions_tried += 1;
        if let Some(found) = search_column(table, target, column, &mut stats) {
            stats.found_at = Some(column);
            debug!(
                "found {} for {} at column {} ({} false alarms)",
                found, target, column, stats.false_alarms
            );
            return Ok((SearchOutcome::Found(found), stats));
        }
    }

    debug!(
        "{} not found ({} endpoint hits, {} false alarms)",
        target, stats.endpoint_hits, stats.false_alarms
    );
    Ok((SearchOutcome::NotFound, stats))
}

/// Search at a single column position
fn search_column(
    table: &RainbowTable,
    target: &Digest,
    column: u32,
    stats: &mut SearchStats,
) -> Option<Password> {
    let params = table.params();

    // Step 1: project the target from `column` to the chain end
    let endpoint = project_to_endpoint(params, target, column);

    // Step 2: endpoint lookup
    let start = table.lookup(&endpoint)?;
    stats.endpoint_hits += 1;

    // Step 3: replay the candidate chain
    match find_in_chain(params, start, target) {
        Some((_, password)) => Some(password),
        None => {
            stats.false_alarms += 1;
            trace!("false alarm at column {} (chain start {})", column, start);
            None
        }
    }
}

/// Search many targets in parallel against one table
///
/// Each target gets its own timeout, started when its search begins. The
/// result order matches `targets`.
pub fn search_many(
    table: &RainbowTable,
    targets: &[Digest],
    timeout: Option<Duration>,
) -> Vec<Result<SearchOutcome, RainbowError>> {
    targets
        .par_iter()
        .map(|target| {
            let deadline = timeout.and_then(|timeout| Instant::now().checked_add(timeout));
            search_with_deadline(table, target, deadline)
        })
        .collect()
}

/// Scan the whole key space for a password hashing to `target`
///
/// Exhaustive and parallel; independent of any table. Returns some matching
/// password when several collide under the truncated digest.
pub fn brute_force(params: &TableParams, target: &Digest) -> Result<Option<Password>, RainbowError> {
    params.check_digest(target)?;
    let keyspace = params.keyspace();

    Ok((0..keyspace.size())
        .into_par_iter()
        .filter_map(|index| keyspace.index_to_password(index).ok())
        .find_any(|password| params.digest(password) == *target))
}
