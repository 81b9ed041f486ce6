//! Sampling-based uncertainty propagation.
//!
//! - `montecarlo`: perturb the data by its error bars and refit, many times
//! - `prior`: log-priors for Bayesian sampling
//! - `mcmc`: affine-invariant ensemble sampler (stretch move)

pub mod mcmc;
pub mod montecarlo;
pub mod prior;

pub use mcmc::*;
pub use montecarlo::*;
pub use prior::*;
