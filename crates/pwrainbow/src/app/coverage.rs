//! Coverage measurement workflow
//!
//! This module walks every chain of a table, marks each password it visits in
//! a key space bitmap, and compares the measured reach with the theoretical
//! estimate n·t / N.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use log::info;
use rayon::prelude::*;

use crate::domain::chain::walk_chain;
use crate::domain::coverage::KeyspaceBitmap;
use crate::domain::table::RainbowTable;
use crate::error::RainbowError;

/// Result of a coverage measurement
#[derive(Clone, Debug, PartialEq)]
pub struct CoverageReport {
    /// Number of chains walked
    pub chains: u64,
    /// Chain length t
    pub chain_length: u32,
    /// Theoretical coverage n·t / N (may exceed 1.0)
    pub theoretical: f64,
    /// Distinct passwords reachable from the table
    pub reachable: u64,
    /// Key space size N
    pub keyspace_size: u64,
}

impl CoverageReport {
    /// Passwords visited counting repeats (n·t)
    pub fn visited(&self) -> u64 {
        self.chains * self.chain_length as u64
    }

    /// Measured coverage (0.0 to 1.0)
    pub fn measured(&self) -> f64 {
        if self.keyspace_size == 0 {
            return 0.0;
        }
        self.reachable as f64 / self.keyspace_size as f64
    }

    /// Share of visited passwords that were distinct
    pub fn efficiency(&self) -> f64 {
        let visited = self.visited();
        if visited == 0 {
            return 0.0;
        }
        self.reachable as f64 / visited as f64
    }

    pub fn missing(&self) -> u64 {
        self.keyspace_size - self.reachable
    }
}

impl fmt::Display for CoverageReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Coverage")?;
        writeln!(f, "  chains:            {}", self.chains)?;
        writeln!(f, "  chain length:      {}", self.chain_length)?;
        writeln!(f, "  key space:         {}", self.keyspace_size)?;
        writeln!(f, "  theoretical:       {:.2}%", self.theoretical * 100.0)?;
        writeln!(
            f,
            "  measured:          {:.2}% ({} reachable)",
            self.measured() * 100.0,
            self.reachable
        )?;
        write!(f, "  chain efficiency:  {:.2}%", self.efficiency() * 100.0)
    }
}

/// Build a reachability bitmap from the table
///
/// Processes all chains in parallel using rayon.
pub fn build_bitmap(table: &RainbowTable) -> Result<KeyspaceBitmap, RainbowError> {
    build_bitmap_with_progress(table, |_, _| {})
}

/// Build a reachability bitmap with progress callback (current, total)
pub fn build_bitmap_with_progress<F>(
    table: &RainbowTable,
    on_progress: F,
) -> Result<KeyspaceBitmap, RainbowError>
where
    F: Fn(u64, u64) + Sync,
{
    let params = table.params();
    let keyspace = params.keyspace();
    let bitmap = KeyspaceBitmap::new(keyspace.size())?;
    let total = table.len() as u64;
    let progress = AtomicU64::new(0);

    table.entries().par_iter().for_each(|entry| {
        walk_chain(params, entry.start, |_, password| {
            if let Ok(index) = keyspace.password_to_index(password) {
                bitmap.set(index);
            }
        });

        let count = progress.fetch_add(1, Ordering::Relaxed);
        if count % 1_000 == 0 {
            on_progress(count, total);
        }
    });

    on_progress(total, total);
    Ok(bitmap)
}

/// Measure how much of the key space the table reaches
pub fn measure_coverage(table: &RainbowTable) -> Result<CoverageReport, RainbowError> {
    measure_coverage_with_progress(table, |_, _| {})
}

/// Measure coverage with progress callback (current, total)
pub fn measure_coverage_with_progress<F>(
    table: &RainbowTable,
    on_progress: F,
) -> Result<CoverageReport, RainbowError>
where
    F: Fn(u64, u64) + Sync,
{
    let bitmap = build_bitmap_with_progress(table, on_progress)?;
    let report = CoverageReport {
        chains: table.len() as u64,
        chain_length: table.chain_length(),
        theoretical: table.theoretical_coverage(),
        reachable: bitmap.count_reachable(),
        keyspace_size: bitmap.size(),
    };

    info!(
        "coverage: {} of {} reachable ({:.2}%, theoretical {:.2}%)",
        report.reachable,
        report.keyspace_size,
        report.measured() * 100.0,
        report.theoretical * 100.0
    );
    Ok(report)
}

/// Key space indices no chain of the table visits
pub fn extract_missing(table: &RainbowTable) -> Result<Vec<u64>, RainbowError> {
    Ok(build_bitmap(table)?.extract_missing())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::generator::{BuildOptions, generate_table};
    use crate::domain::chain::password_at;
    use crate::domain::keyspace::KeySpace;
    use crate::domain::params::TableParams;
    use crate::domain::table::TableBuilder;

    fn small_params(chain_length: u32) -> TableParams {
        TableParams::new(KeySpace::new("abcd", 4).unwrap(), 2, chain_length).unwrap()
    }

    #[test]
    fn test_coverage_bounded_by_n_times_t() {
        let params = TableParams::reference(50).unwrap();
        let table = generate_table(&params, BuildOptions::new(100).with_seed(3)).table;
        let report = measure_coverage(&table).unwrap();

        assert_eq!(report.chains, 100);
        assert!(report.reachable <= report.visited());
        assert!(report.reachable > 0);
        assert!(report.measured() <= report.theoretical);
        assert!(report.efficiency() <= 1.0);
    }

    #[test]
    fn test_coverage_marks_every_chain_password() {
        let params = small_params(8);
        let table = generate_table(&params, BuildOptions::new(10).with_seed(9)).table;
        let bitmap = build_bitmap(&table).unwrap();

        for entry in table.entries() {
            for column in 0..8 {
                let password = password_at(&params, entry.start, column);
                let index = params.keyspace().password_to_index(&password).unwrap();
                assert!(bitmap.is_set(index));
            }
        }
    }

    #[test]
    fn test_extract_missing_matches_report() {
        let params = small_params(6);
        let table = generate_table(&params, BuildOptions::new(8).with_seed(4)).table;
        let report = measure_coverage(&table).unwrap();
        let missing = extract_missing(&table).unwrap();

        assert_eq!(missing.len() as u64, report.missing());
        assert_eq!(report.reachable + report.missing(), 256);
    }

    #[test]
    fn test_empty_table_coverage() {
        let table = TableBuilder::new(small_params(5), 3).finish();
        let report = measure_coverage(&table).unwrap();
        assert_eq!(report.reachable, 0);
        assert_eq!(report.efficiency(), 0.0);
        assert_eq!(report.missing(), 256);
    }

    #[test]
    fn test_coverage_display() {
        let table = TableBuilder::new(small_params(5), 3).finish();
        let text = measure_coverage(&table).unwrap().to_string();
        assert!(text.contains("key space:         256"));
    }
}
