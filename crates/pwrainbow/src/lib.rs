//! pwrainbow - Rainbow table for fixed-format passwords
//!
//! This crate provides functionality to:
//! - Map a fixed-length password key space to and from integer indices
//! - Generate rainbow tables against SHA-256 truncated to a configurable width
//! - Search a table for a password whose truncated digest matches a target
//! - Measure key space coverage and run attack experiments
//! - Persist tables as CSV or as a compact binary file

pub mod constants;
pub mod domain;
pub mod error;
pub mod infra;
pub mod app;

// Re-export commonly used types
pub use app::generator::{BuildOptions, BuildReport, BuildStatus, generate_table};
pub use app::searcher::{SearchOutcome, search, search_with_deadline};
pub use constants::*;
pub use domain::chain::{ChainEntry, compute_chain};
pub use domain::hash::{Digest, digest, reduce_hash};
pub use domain::keyspace::{KeySpace, Password};
pub use domain::params::TableParams;
pub use domain::table::RainbowTable;
pub use error::RainbowError;
