//! Monte Carlo propagation of data error to the parameters.
//!
//! Each draw adds independent `Normal(0, σ_m)` noise to every observation and
//! refits the model. The spread of the refitted parameters is the Monte Carlo
//! estimate of the parameter uncertainty.
//!
//! Noise is drawn sequentially from one seeded RNG, so the ensemble is
//! reproducible; the refits themselves run in parallel.

use nalgebra::DMatrix;
use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::Normal;
use rayon::prelude::*;

use crate::error::UqError;
use crate::fit::{LmOptions, fit_least_squares};
use crate::math::{covariance, mean};
use crate::models::ParametricModel;

#[derive(Debug, Clone)]
pub struct MonteCarloOptions {
    pub n_samples: usize,
    pub seed: u64,
    pub lm: LmOptions,
}

#[derive(Debug, Clone)]
pub struct MonteCarloEnsemble {
    /// Best-fit raw parameters of every successful refit, in draw order.
    pub samples: Vec<Vec<f64>>,
    pub costs: Vec<f64>,
    /// Draws whose refit errored.
    pub failed: usize,
    pub mean: Vec<f64>,
    pub covariance: DMatrix<f64>,
}

/// Generate `n` perturbed copies of the model's data.
pub fn perturbed_datasets(
    model: &ParametricModel,
    n: usize,
    seed: u64,
) -> Result<Vec<Vec<f64>>, UqError> {
    let mut rng = StdRng::seed_from_u64(seed);
    let normal = Normal::new(0.0, 1.0)
        .map_err(|e| UqError::numerical(format!("Noise distribution error: {e}")))?;

    let mut out = Vec::with_capacity(n);
    for _ in 0..n {
        let sample: Vec<f64> = model
            .data()
            .iter()
            .zip(model.data_error().iter())
            .map(|(d, s)| d + s * normal.sample(&mut rng))
            .collect();
        out.push(sample);
    }
    Ok(out)
}

/// Refit the model to `n_samples` noisy datasets starting from `theta0`.
pub fn run_monte_carlo(
    model: &ParametricModel,
    theta0: &[f64],
    opts: &MonteCarloOptions,
) -> Result<MonteCarloEnsemble, UqError> {
    if opts.n_samples < 2 {
        return Err(UqError::parameter("Monte Carlo needs at least 2 samples."));
    }
    if theta0.len() != model.n_params() {
        return Err(UqError::dimension(format!(
            "theta0 has {} entries, model has N={}.",
            theta0.len(),
            model.n_params()
        )));
    }

    let datasets = perturbed_datasets(model, opts.n_samples, opts.seed)?;
    log::info!("Monte Carlo: refitting {} perturbed datasets", datasets.len());

    let fits: Vec<Result<(Vec<f64>, f64), UqError>> = datasets
        .into_par_iter()
        .map(|data| {
            let m = model.with_data(data)?;
            let fit = fit_least_squares(&m, theta0, &opts.lm)?;
            Ok((fit.theta, fit.cost))
        })
        .collect();

    let mut samples = Vec::with_capacity(fits.len());
    let mut costs = Vec::with_capacity(fits.len());
    let mut failed = 0;
    for (i, fit) in fits.into_iter().enumerate() {
        match fit {
            Ok((theta, cost)) => {
                samples.push(theta);
                costs.push(cost);
            }
            Err(e) => {
                log::warn!("Monte Carlo draw {i} failed to fit: {e}");
                failed += 1;
            }
        }
    }

    if samples.len() < 2 {
        return Err(UqError::numerical(format!(
            "Only {} of {} Monte Carlo refits succeeded.",
            samples.len(),
            opts.n_samples
        )));
    }

    let mean = mean(&samples)?;
    let covariance = covariance(&samples)?;
    Ok(MonteCarloEnsemble {
        samples,
        costs,
        failed,
        mean,
        covariance,
    })
}
