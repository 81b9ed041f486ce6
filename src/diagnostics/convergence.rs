//! Brooks & Gelman (1998) multivariate potential scale reduction factor.
//!
//! With `m` chains of `n` steps:
//!
//! ```text
//! W    = mean within-chain covariance
//! B/n  = covariance of the chain means
//! r̂    = 1 − 1/n + (1 + 1/m) λ₁,   λ₁ = largest singular value of W⁻¹ B/n
//! ```
//!
//! Values close to 1 indicate the walkers have mixed.

use nalgebra::DMatrix;

use crate::error::UqError;
use crate::math::{covariance, mean, solve_least_squares_matrix};
use crate::sampling::Chain;

#[derive(Debug, Clone)]
pub struct Psrf {
    pub rhat: f64,
    /// Mean within-chain covariance.
    pub within: DMatrix<f64>,
    /// Between-chain covariance divided by the chain length.
    pub between_over_n: DMatrix<f64>,
}

/// Multivariate PSRF of an ensemble chain (one chain per walker).
pub fn rhat(chain: &Chain) -> Result<Psrf, UqError> {
    let m = chain.n_walkers();
    let n = chain.n_steps();
    if m < 2 || n < 2 {
        return Err(UqError::dimension(format!(
            "r-hat needs at least 2 chains of 2 steps (got {m} x {n})."
        )));
    }
    let dim = chain.n_dim();

    let mut within = DMatrix::<f64>::zeros(dim, dim);
    let mut means = Vec::with_capacity(m);
    for walker in &chain.samples {
        within += covariance(walker)?;
        means.push(mean(walker)?);
    }
    within /= m as f64;
    let between_over_n = covariance(&means)?;

    let v = solve_least_squares_matrix(&within, &between_over_n)
        .ok_or_else(|| UqError::numerical("Within-chain covariance is singular."))?;
    let lambda1 = v
        .singular_values()
        .iter()
        .copied()
        .fold(f64::NEG_INFINITY, f64::max);

    let rhat = 1.0 - 1.0 / n as f64 + (1.0 + 1.0 / m as f64) * lambda1;
    Ok(Psrf {
        rhat,
        within,
        between_over_n,
    })
}
