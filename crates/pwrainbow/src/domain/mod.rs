//! Domain layer - Pure computational logic
//!
//! This module contains pure functions and algorithms without I/O dependencies.

pub mod chain;
pub mod coverage;
pub mod hash;
pub mod keyspace;
pub mod params;
pub mod table;
pub mod table_format;
