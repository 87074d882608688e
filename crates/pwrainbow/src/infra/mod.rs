//! Infrastructure layer - I/O and external dependencies
//!
//! This module handles file operations and other external dependencies.

pub mod table_csv;
pub mod table_io;
