//! Input/output helpers.
//!
//! - scenario JSON read/write (`scenario`)
//! - chain CSV and run-summary JSON exports (`export`)

pub mod export;
pub mod scenario;

pub use export::*;
pub use scenario::*;
