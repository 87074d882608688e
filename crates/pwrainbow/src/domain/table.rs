//! Endpoint table
//!
//! `TableBuilder` owns the only mutable phase of a table's life: it inserts
//! chains under the first-writer-wins rule and is then frozen into a
//! read-only `RainbowTable` that searches borrow.

use rustc_hash::FxHashMap;

use crate::domain::chain::{ChainEntry, compute_chain};
use crate::domain::hash::Digest;
use crate::domain::keyspace::Password;
use crate::domain::params::TableParams;
use crate::domain::table_format::TableFormatError;

/// Endpoint digest → position in the entry list
pub type EndpointIndex = FxHashMap<Digest, usize>;

/// Mutable table under construction
#[derive(Debug)]
pub struct TableBuilder {
    params: TableParams,
    target_entries: u64,
    entries: Vec<ChainEntry>,
    index: EndpointIndex,
}

impl TableBuilder {
    pub fn new(params: TableParams, target_entries: u64) -> Self {
        // Preallocation is capped; larger tables grow on demand
        let capacity = usize::try_from(target_entries).unwrap_or(usize::MAX).min(1 << 24);
        Self {
            params,
            target_entries,
            entries: Vec::with_capacity(capacity),
            index: FxHashMap::with_capacity_and_hasher(capacity, Default::default()),
        }
    }

    /// Insert a chain unless its endpoint is already present
    ///
    /// Returns `true` if the entry was stored. An existing endpoint is never
    /// overwritten: the later chain is discarded.
    pub fn insert(&mut self, entry: ChainEntry) -> bool {
        if self.index.contains_key(&entry.end) {
            return false;
        }
        self.index.insert(entry.end, self.entries.len());
        self.entries.push(entry);
        true
    }

    pub fn params(&self) -> &TableParams {
        &self.params
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn target_entries(&self) -> u64 {
        self.target_entries
    }

    /// Whether the target number of entries has been reached
    pub fn is_full(&self) -> bool {
        self.entries.len() as u64 >= self.target_entries
    }

    /// Freeze into a read-only table
    pub fn finish(self) -> RainbowTable {
        RainbowTable {
            params: self.params,
            target_entries: self.target_entries,
            entries: self.entries,
            index: self.index,
        }
    }
}

/// Immutable rainbow table
///
/// Entries keep their insertion order; each endpoint appears at most once.
#[derive(Debug, Clone)]
pub struct RainbowTable {
    params: TableParams,
    target_entries: u64,
    entries: Vec<ChainEntry>,
    index: EndpointIndex,
}

impl RainbowTable {
    /// Rebuild a table from persisted entries without recomputing chains
    ///
    /// # Errors
    /// `DuplicateEndpoint` if two entries share an endpoint, or
    /// `DigestWidthMismatch` if an endpoint has the wrong width.
    pub fn from_entries(
        params: TableParams,
        target_entries: u64,
        entries: impl IntoIterator<Item = ChainEntry>,
    ) -> Result<Self, TableFormatError> {
        let mut builder = TableBuilder::new(params, target_entries);
        for entry in entries {
            if entry.end.len() != builder.params.digest_bytes() {
                return Err(TableFormatError::DigestWidthMismatch {
                    expected: builder.params.digest_bytes(),
                    found: entry.end.len(),
                });
            }
            if !builder.insert(entry) {
                return Err(TableFormatError::DuplicateEndpoint(entry.end.to_hex()));
            }
        }
        Ok(builder.finish())
    }

    pub fn params(&self) -> &TableParams {
        &self.params
    }

    pub fn chain_length(&self) -> u32 {
        self.params.chain_length()
    }

    /// Requested number of entries (n)
    pub fn target_entries(&self) -> u64 {
        self.target_entries
    }

    /// Number of stored entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether construction reached the target size
    pub fn is_complete(&self) -> bool {
        self.entries.len() as u64 >= self.target_entries
    }

    /// Start password of the chain ending at `endpoint`
    #[inline]
    pub fn lookup(&self, endpoint: &Digest) -> Option<Password> {
        self.index
            .get(endpoint)
            .map(|&slot| self.entries[slot].start)
    }

    /// Entries in insertion order
    pub fn entries(&self) -> &[ChainEntry] {
        &self.entries
    }

    pub fn iter(&self) -> impl Iterator<Item = &ChainEntry> + '_ {
        self.entries.iter()
    }

    /// Theoretical coverage n·t / N of the stored entries
    pub fn theoretical_coverage(&self) -> f64 {
        self.params.theoretical_coverage(self.entries.len() as u64)
    }

    /// Recompute up to `sample` chains and return those whose stored endpoint
    /// differs from the recomputed one
    pub fn verify_entries(&self, sample: usize) -> Vec<ChainEntry> {
        self.entries
            .iter()
            .take(sample)
            .filter(|entry| compute_chain(&self.params, entry.start).end != entry.end)
            .copied()
            .collect()
    }
}
