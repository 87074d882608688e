//! Application layer - Use case implementations
//!
//! This module coordinates domain and infrastructure layers to implement use cases.

pub mod coverage;
pub mod experiment;
pub mod generator;
pub mod searcher;
