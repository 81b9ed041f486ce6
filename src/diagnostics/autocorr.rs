//! Integrated autocorrelation time.
//!
//! For each parameter we average the normalized autocorrelation function over
//! walkers, accumulate `τ(w) = 1 + 2 Σ_{l=1}^{w} ρ(l)` and stop at Sokal's
//! automatic window: the first `w` with `w >= c · τ(w)`. Lags are computed on
//! demand, so the cost is proportional to the window, not the chain length.

use nalgebra::DMatrix;

use crate::error::UqError;
use crate::math::{covariance, eigen_decomposition, mean};
use crate::sampling::Chain;

#[derive(Debug, Clone)]
pub struct AutocorrOptions {
    /// Window factor `c`.
    pub c: f64,
    /// Minimum chain length in units of `τ`.
    pub tol: f64,
    /// Log a warning instead of failing when the chain is too short.
    pub quiet: bool,
    /// Rotate samples into the eigenbasis of their covariance first
    /// (see [`decorrelate_chains`]).
    pub decorrelate: bool,
}

impl Default for AutocorrOptions {
    fn default() -> Self {
        Self {
            c: 5.0,
            tol: 50.0,
            quiet: false,
            decorrelate: false,
        }
    }
}

/// Integrated autocorrelation time for every parameter of `chain`.
///
/// With `decorrelate` set, the times refer to the rotated parameters of
/// [`decorrelate_chains`], ordered like ascending covariance eigenvalues.
///
/// # Errors
/// - `InvalidDimension` for an empty chain
/// - `Numerical` if a parameter never moves (zero variance in every walker)
/// - `ChainTooShort` if `n_steps < tol · τ` for some parameter and `!quiet`
pub fn integrated_time(chain: &Chain, opts: &AutocorrOptions) -> Result<Vec<f64>, UqError> {
    let n_steps = chain.n_steps();
    let n_dim = chain.n_dim();
    if chain.n_walkers() == 0 || n_steps == 0 || n_dim == 0 {
        return Err(UqError::dimension("Autocorrelation needs a non-empty chain."));
    }
    if opts.decorrelate {
        let rotated = decorrelate_chains(chain)?;
        let opts = AutocorrOptions {
            decorrelate: false,
            ..opts.clone()
        };
        return integrated_time(&rotated, &opts);
    }

    let mut taus = Vec::with_capacity(n_dim);
    for d in 0..n_dim {
        let traces: Vec<Vec<f64>> = (0..chain.n_walkers()).map(|w| chain.trace(w, d)).collect();
        taus.push(integrated_time_1d(&traces, opts.c).ok_or_else(|| {
            UqError::numerical(format!("Parameter {d} has zero variance in every walker."))
        })?);
    }

    let too_short = taus.iter().any(|&tau| opts.tol * tau > n_steps as f64);
    if too_short {
        let msg = format!(
            "The chain is shorter than {} times the integrated autocorrelation time; \
             N/{}={:.1}; tau={taus:?}",
            opts.tol,
            opts.tol,
            n_steps as f64 / opts.tol
        );
        if opts.quiet {
            log::warn!("{msg}");
        } else {
            return Err(UqError::ChainTooShort(msg));
        }
    }
    Ok(taus)
}

/// `τ` for one parameter from per-walker traces of equal length.
///
/// Returns `None` when every trace is constant.
fn integrated_time_1d(traces: &[Vec<f64>], c: f64) -> Option<f64> {
    let n = traces[0].len();

    // Centre each walker and keep its lag-0 autocovariance.
    let centred: Vec<(Vec<f64>, f64)> = traces
        .iter()
        .filter_map(|x| {
            let mu = x.iter().sum::<f64>() / n as f64;
            let y: Vec<f64> = x.iter().map(|v| v - mu).collect();
            let var0 = y.iter().map(|v| v * v).sum::<f64>() / n as f64;
            (var0 > 0.0).then_some((y, var0))
        })
        .collect();
    if centred.is_empty() {
        return None;
    }
    let n_walkers = centred.len() as f64;

    let mut cumulative = 1.0;
    let mut tau = 1.0;
    for lag in 1..n {
        let rho: f64 = centred
            .iter()
            .map(|(y, var0)| {
                let acov: f64 = y[..n - lag]
                    .iter()
                    .zip(y[lag..].iter())
                    .map(|(a, b)| a * b)
                    .sum::<f64>()
                    / n as f64;
                acov / var0
            })
            .sum::<f64>()
            / n_walkers;
        cumulative += rho;
        tau = 2.0 * cumulative - 1.0;
        if lag as f64 >= c * tau {
            return Some(tau);
        }
    }
    Some(tau)
}

/// Shift samples to zero mean and rotate them into the eigenbasis of their
/// pooled covariance, so the transformed parameters are roughly independent.
pub fn decorrelate_chains(chain: &Chain) -> Result<Chain, UqError> {
    let pooled = chain.flat(0, 1);
    let mu = mean(&pooled)?;
    let cov = covariance(&pooled)?;
    let basis: DMatrix<f64> = eigen_decomposition(&cov)?.vectors;
    let n_dim = mu.len();

    let samples = chain
        .samples
        .iter()
        .map(|walker| {
            walker
                .iter()
                .map(|s| {
                    (0..n_dim)
                        .map(|c| (0..n_dim).map(|r| (s[r] - mu[r]) * basis[(r, c)]).sum())
                        .collect()
                })
                .collect()
        })
        .collect();

    Ok(Chain {
        samples,
        log_prob: chain.log_prob.clone(),
        accepted: chain.accepted.clone(),
    })
}

#[cfg(test)]
mod tests {
    use rand::prelude::*;
    use rand::rngs::StdRng;
    use rand_distr::Normal;

    use super::*;

    fn chain_from(traces: Vec<Vec<Vec<f64>>>) -> Chain {
        let n = traces.len();
        let steps = traces[0].len();
        Chain {
            samples: traces,
            log_prob: vec![vec![0.0; steps]; n],
            accepted: vec![0; n],
        }
    }

    fn ar1(phi: f64, n: usize, seed: u64) -> Vec<Vec<f64>> {
        let mut rng = StdRng::seed_from_u64(seed);
        let normal = Normal::new(0.0, 1.0).unwrap();
        let mut x = 0.0;
        (0..n)
            .map(|_| {
                x = phi * x + normal.sample(&mut rng);
                vec![x]
            })
            .collect()
    }

    #[test]
    fn white_noise_has_unit_time() {
        let traces = (0..4).map(|w| ar1(0.0, 4000, w)).collect();
        let tau = integrated_time(&chain_from(traces), &AutocorrOptions::default()).unwrap();
        assert!((tau[0] - 1.0).abs() < 0.2, "tau={tau:?}");
    }

    #[test]
    fn ar1_time_matches_theory() {
        // τ = (1 + φ) / (1 − φ) = 3 for φ = 0.5.
        let traces = (0..8).map(|w| ar1(0.5, 5000, 100 + w)).collect();
        let tau = integrated_time(&chain_from(traces), &AutocorrOptions::default()).unwrap();
        assert!((tau[0] - 3.0).abs() < 0.5, "tau={tau:?}");
    }

    #[test]
    fn short_chain_errors_unless_quiet() {
        let traces = (0..2).map(|w| ar1(0.9, 100, w)).collect::<Vec<_>>();
        let chain = chain_from(traces);
        let err = integrated_time(&chain, &AutocorrOptions::default()).unwrap_err();
        assert!(matches!(err, UqError::ChainTooShort(_)));

        let quiet = AutocorrOptions {
            quiet: true,
            ..AutocorrOptions::default()
        };
        assert_eq!(integrated_time(&chain, &quiet).unwrap().len(), 1);
    }

    #[test]
    fn constant_chain_is_numerical_error() {
        let chain = chain_from(vec![vec![vec![1.0]; 50]; 2]);
        assert!(matches!(
            integrated_time(&chain, &AutocorrOptions::default()).unwrap_err(),
            UqError::Numerical(_)
        ));
    }

    #[test]
    fn decorrelated_samples_have_diagonal_covariance() {
        let mut rng = StdRng::seed_from_u64(1);
        let normal = Normal::new(0.0, 1.0).unwrap();
        let walker: Vec<Vec<f64>> = (0..2000)
            .map(|_| {
                let a: f64 = normal.sample(&mut rng);
                let b: f64 = normal.sample(&mut rng);
                vec![5.0 + a, -1.0 + 0.9 * a + 0.3 * b]
            })
            .collect();
        let chain = chain_from(vec![walker]);
        let rotated = decorrelate_chains(&chain).unwrap();
        let flat = rotated.flat(0, 1);
        let mu = mean(&flat).unwrap();
        let cov = covariance(&flat).unwrap();
        assert!(mu.iter().all(|m| m.abs() < 1e-10));
        assert!(cov[(0, 1)].abs() < 1e-10, "cov={cov}");
    }

    #[test]
    fn decorrelated_times_follow_rotated_parameters() {
        // Dimension 0: AR(1) with φ = 0.5 (τ = 3) and a large variance.
        // Dimension 1: white noise mixed with a little of dimension 0.
        let mut rng = StdRng::seed_from_u64(77);
        let normal = Normal::new(0.0, 1.0).unwrap();
        let traces: Vec<Vec<Vec<f64>>> = (0..8)
            .map(|w| {
                ar1(0.5, 5000, 200 + w)
                    .into_iter()
                    .map(|x| {
                        let slow = 3.0 * x[0];
                        vec![slow, 0.1 * slow + normal.sample(&mut rng)]
                    })
                    .collect()
            })
            .collect();
        let chain = chain_from(traces);
        let opts = AutocorrOptions {
            decorrelate: true,
            ..AutocorrOptions::default()
        };
        let tau = integrated_time(&chain, &opts).unwrap();
        assert_eq!(tau.len(), 2);
        // Smallest eigenvalue first: the fast direction, then the slow one.
        assert!(tau[0] < 1.5, "tau={tau:?}");
        assert!((tau[1] - 3.0).abs() < 0.6, "tau={tau:?}");
    }
}
