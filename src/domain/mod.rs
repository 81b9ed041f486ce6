//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - configuration enums (`ModelKind`, `TransformKind`)
//! - per-command run configuration (`FitConfig`, `MonteCarloConfig`, `McmcConfig`)
//! - exportable run summaries (`RunSummary` and its sections)

pub mod types;

pub use types::*;
