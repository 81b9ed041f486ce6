//! Nonlinear least-squares fitting.
//!
//! Responsibilities:
//!
//! - minimize `ParametricModel::cost` with Levenberg–Marquardt
//! - report the best fit, its physical parameters and the Jacobian there

pub mod fitter;

pub use fitter::*;
