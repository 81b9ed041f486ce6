//! Terminal reporting for fits, FIM analyses and sampling runs.

pub mod format;

pub use format::*;
