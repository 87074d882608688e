//! Chain operations implementation
//!
//! This module provides the chain entry structure and functions for chain
//! generation, replay and verification.
//!
//! Position convention, shared by construction and search:
//!
//! ```text
//! P0 --h--> H0 --r(·,0)--> P1 --h--> H1 --r(·,1)--> ... P(t-1) --h--> H(t-1)
//! ```
//!
//! The reduction producing `P(j+1)` from `H(j)` uses position `j`, for
//! `j` in `0..=t-2`. Column `c` of a chain holds password `P(c)` and digest
//! `H(c)`; the endpoint is `H(t-1)`.

use crate::domain::hash::Digest;
use crate::domain::keyspace::Password;
use crate::domain::params::TableParams;

/// Chain entry structure
///
/// Only the start password and the endpoint digest are kept.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ChainEntry {
    /// Starting password of the chain
    pub start: Password,
    /// Endpoint digest H(t-1)
    pub end: Digest,
}

impl ChainEntry {
    /// Create a new chain entry
    pub fn new(start: Password, end: Digest) -> Self {
        Self { start, end }
    }
}

/// Compute a single chain
///
/// Starting from `start`, apply `t-1` (hash, reduce) pairs and hash the last
/// password. No intermediate state is retained.
pub fn compute_chain(params: &TableParams, start: Password) -> ChainEntry {
    let mut current = start;

    for position in 0..params.chain_length() - 1 {
        let hash = params.digest(&current);
        current = params.reduce(&hash, position);
    }

    ChainEntry::new(start, params.digest(&current))
}

/// Password at `column` of the chain starting at `start`
///
/// Columns past the end are clamped to `t-1`.
pub fn password_at(params: &TableParams, start: Password, column: u32) -> Password {
    let column = column.min(params.chain_length() - 1);
    let mut current = start;
    for position in 0..column {
        let hash = params.digest(&current);
        current = params.reduce(&hash, position);
    }
    current
}

/// Project a digest assumed to sit at `column` forward to its endpoint
///
/// For `column = t-1` the digest is already an endpoint and is returned as is.
pub fn project_to_endpoint(params: &TableParams, target: &Digest, column: u32) -> Digest {
    let mut hash = *target;
    for position in column..params.chain_length() - 1 {
        let password = params.reduce(&hash, position);
        hash = params.digest(&password);
    }
    hash
}

/// Verify a chain at a specific column
///
/// Traces the chain to `column` and checks whether the digest there matches
/// `target`.
///
/// # Returns
/// `Some(password)` if the hash matches, `None` otherwise
pub fn verify_chain(
    params: &TableParams,
    start: Password,
    column: u32,
    target: &Digest,
) -> Option<Password> {
    if column >= params.chain_length() {
        return None;
    }
    let password = password_at(params, start, column);
    (params.digest(&password) == *target).then_some(password)
}

/// Replay a whole chain looking for `target`
///
/// Checks every column from 0 to t-1 and returns the first one whose digest
/// equals `target`, together with its password.
pub fn find_in_chain(
    params: &TableParams,
    start: Password,
    target: &Digest,
) -> Option<(u32, Password)> {
    let last = params.chain_length() - 1;
    let mut current = start;

    for column in 0..=last {
        let hash = params.digest(&current);
        if hash == *target {
            return Some((column, current));
        }
        if column < last {
            current = params.reduce(&hash, column);
        }
    }

    None
}

/// Visit every password of a chain
///
/// Calls `on_password(column, password)` for columns 0 to t-1.
pub fn walk_chain<F>(params: &TableParams, start: Password, mut on_password: F)
where
    F: FnMut(u32, &Password),
{
    let last = params.chain_length() - 1;
    let mut current = start;
    on_password(0, &current);

    for position in 0..last {
        let hash = params.digest(&current);
        current = params.reduce(&hash, position);
        on_password(position + 1, &current);
    }
}
