//! MCMC chain diagnostics.
//!
//! - `autocorr`: integrated autocorrelation time and chain decorrelation
//! - `convergence`: multivariate potential scale reduction factor (r̂)
//! - `equilibration`: MSER burn-in estimate

pub mod autocorr;
pub mod convergence;
pub mod equilibration;

pub use autocorr::*;
pub use convergence::*;
pub use equilibration::*;
