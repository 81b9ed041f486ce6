//! `uq-fit` library crate.
//!
//! Uncertainty quantification for weighted least-squares regression: a
//! `ParametricModel` (predict / residual / cost) and the analyses built around
//! it: Levenberg–Marquardt fitting, Fisher information, Monte Carlo data
//! resampling, and ensemble MCMC with chain diagnostics.
//!
//! The binary (`uq`) is a thin wrapper around this library so that:
//!
//! - core logic is testable without spawning processes
//! - models and analyses are reusable from other Rust code

pub mod app;
pub mod cli;
pub mod diagnostics;
pub mod domain;
pub mod error;
pub mod fit;
pub mod io;
pub mod math;
pub mod models;
pub mod report;
pub mod sampling;
