//! Affine-invariant ensemble sampler (Goodman & Weare stretch move).
//!
//! The walkers are split into two halves. Each half is moved against the
//! current positions of the other half:
//!
//! ```text
//! Y = X_j + z (X_k − X_j),   z ~ g(z) ∝ 1/√z on [1/a, a]
//! accept with probability min(1, z^(N−1) · p(Y) / p(X_k))
//! ```
//!
//! All random numbers come from one seeded RNG, drawn before the
//! log-probabilities of a half are evaluated in parallel, so a chain depends
//! only on the seed and never on the thread count.

use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::Normal;
use rayon::prelude::*;

use crate::error::UqError;
use crate::models::ParametricModel;
use crate::sampling::prior::{LogPrior, log_probability};

pub const DEFAULT_STRETCH: f64 = 2.0;

#[derive(Debug, Clone)]
pub struct EnsembleSampler {
    n_walkers: usize,
    n_dim: usize,
    stretch: f64,
}

/// Output of an ensemble run.
#[derive(Debug, Clone)]
pub struct Chain {
    /// `samples[walker][step][dim]`.
    pub samples: Vec<Vec<Vec<f64>>>,
    /// `log_prob[walker][step]`.
    pub log_prob: Vec<Vec<f64>>,
    /// Accepted proposals per walker.
    pub accepted: Vec<usize>,
}

struct Proposal {
    walker: usize,
    position: Vec<f64>,
    ln_z_term: f64,
    ln_u: f64,
}

impl EnsembleSampler {
    /// # Errors
    /// `InvalidParameter` unless `n_dim >= 1`, `n_walkers` is even and
    /// `n_walkers >= 2 * n_dim`.
    pub fn new(n_walkers: usize, n_dim: usize) -> Result<Self, UqError> {
        if n_dim == 0 {
            return Err(UqError::parameter("Sampler dimension must be > 0."));
        }
        if n_walkers % 2 != 0 || n_walkers < 2 * n_dim {
            return Err(UqError::parameter(format!(
                "n_walkers={n_walkers} must be even and >= 2 * n_dim = {}.",
                2 * n_dim
            )));
        }
        Ok(Self {
            n_walkers,
            n_dim,
            stretch: DEFAULT_STRETCH,
        })
    }

    pub fn with_stretch(mut self, a: f64) -> Result<Self, UqError> {
        if !(a.is_finite() && a > 1.0) {
            return Err(UqError::parameter(format!("Stretch scale must be > 1 (got {a}).")));
        }
        self.stretch = a;
        Ok(self)
    }

    pub fn n_walkers(&self) -> usize {
        self.n_walkers
    }

    pub fn n_dim(&self) -> usize {
        self.n_dim
    }

    /// Advance every walker `n_steps` times from `initial` and record each step.
    pub fn run(
        &self,
        model: &ParametricModel,
        prior: &LogPrior,
        initial: &[Vec<f64>],
        n_steps: usize,
        seed: u64,
    ) -> Result<Chain, UqError> {
        if model.n_params() != self.n_dim {
            return Err(UqError::dimension(format!(
                "Sampler has n_dim={}, model has N={}.",
                self.n_dim,
                model.n_params()
            )));
        }
        prior.check_dim(self.n_dim)?;
        if initial.len() != self.n_walkers || initial.iter().any(|p| p.len() != self.n_dim) {
            return Err(UqError::dimension(format!(
                "Initial positions must be {} walkers x {} dims.",
                self.n_walkers, self.n_dim
            )));
        }

        let mut positions = initial.to_vec();
        let mut lp: Vec<f64> = positions
            .par_iter()
            .map(|p| log_probability(model, prior, p))
            .collect();
        if let Some(w) = lp.iter().position(|v| !v.is_finite()) {
            return Err(UqError::parameter(format!(
                "Initial position of walker {w} has zero posterior probability: {:?}.",
                positions[w]
            )));
        }

        let mut rng = StdRng::seed_from_u64(seed);
        let mut chain = Chain {
            samples: vec![Vec::with_capacity(n_steps); self.n_walkers],
            log_prob: vec![Vec::with_capacity(n_steps); self.n_walkers],
            accepted: vec![0; self.n_walkers],
        };

        let half = self.n_walkers / 2;
        for step in 0..n_steps {
            let halves = [(0..half, half..self.n_walkers), (half..self.n_walkers, 0..half)];
            for (active, other) in halves {
                let proposals = self.propose(&positions, active, other, &mut rng);

                let lp_new: Vec<f64> = proposals
                    .par_iter()
                    .map(|p| log_probability(model, prior, &p.position))
                    .collect();

                for (p, lp_new) in proposals.into_iter().zip(lp_new) {
                    let ln_ratio = p.ln_z_term + lp_new - lp[p.walker];
                    if p.ln_u < ln_ratio {
                        positions[p.walker] = p.position;
                        lp[p.walker] = lp_new;
                        chain.accepted[p.walker] += 1;
                    }
                }
            }

            for w in 0..self.n_walkers {
                chain.samples[w].push(positions[w].clone());
                chain.log_prob[w].push(lp[w]);
            }

            if (step + 1) % 1000 == 0 {
                log::debug!(
                    "MCMC step {}/{n_steps}: mean acceptance {:.3}",
                    step + 1,
                    chain.accepted.iter().sum::<usize>() as f64
                        / ((step + 1) * self.n_walkers) as f64
                );
            }
        }

        log::info!(
            "MCMC finished: {} walkers x {} steps, acceptance {:.3}",
            self.n_walkers,
            n_steps,
            chain.mean_acceptance()
        );
        Ok(chain)
    }

    fn propose(
        &self,
        positions: &[Vec<f64>],
        active: std::ops::Range<usize>,
        other: std::ops::Range<usize>,
        rng: &mut StdRng,
    ) -> Vec<Proposal> {
        let a = self.stretch;
        let other_len = other.len();
        active
            .map(|k| {
                // Inverse CDF of g(z) ∝ 1/√z on [1/a, a].
                let u: f64 = rng.r#gen();
                let z = ((a - 1.0) * u + 1.0).powi(2) / a;
                let j = other.start + rng.gen_range(0..other_len);
                let ln_u = rng.r#gen::<f64>().ln();

                let position = positions[j]
                    .iter()
                    .zip(positions[k].iter())
                    .map(|(xj, xk)| xj + z * (xk - xj))
                    .collect();

                Proposal {
                    walker: k,
                    position,
                    ln_z_term: (self.n_dim as f64 - 1.0) * z.ln(),
                    ln_u,
                }
            })
            .collect()
    }
}

impl Chain {
    pub fn n_walkers(&self) -> usize {
        self.samples.len()
    }

    pub fn n_steps(&self) -> usize {
        self.samples.first().map_or(0, |w| w.len())
    }

    pub fn n_dim(&self) -> usize {
        self.samples
            .first()
            .and_then(|w| w.first())
            .map_or(0, |s| s.len())
    }

    /// Accepted proposals / steps for every walker.
    pub fn acceptance_fraction(&self) -> Vec<f64> {
        let n = self.n_steps().max(1) as f64;
        self.accepted.iter().map(|&a| a as f64 / n).collect()
    }

    pub fn mean_acceptance(&self) -> f64 {
        let fr = self.acceptance_fraction();
        if fr.is_empty() {
            return 0.0;
        }
        fr.iter().sum::<f64>() / fr.len() as f64
    }

    /// Samples of every walker after dropping `discard` steps and keeping every
    /// `thin`-th one, flattened step-major (like emcee's `get_chain(flat=True)`).
    pub fn flat(&self, discard: usize, thin: usize) -> Vec<Vec<f64>> {
        let thin = thin.max(1);
        let mut out = Vec::new();
        for step in (discard..self.n_steps()).step_by(thin) {
            for walker in &self.samples {
                out.push(walker[step].clone());
            }
        }
        out
    }

    /// Same walkers with the first `discard` steps dropped.
    pub fn discard(&self, discard: usize) -> Chain {
        let d = discard.min(self.n_steps());
        Chain {
            samples: self.samples.iter().map(|w| w[d..].to_vec()).collect(),
            log_prob: self.log_prob.iter().map(|w| w[d..].to_vec()).collect(),
            accepted: self.accepted.clone(),
        }
    }

    /// Trace of one parameter for one walker.
    pub fn trace(&self, walker: usize, dim: usize) -> Vec<f64> {
        self.samples[walker].iter().map(|s| s[dim]).collect()
    }
}

/// Walkers scattered as `center + scale · N(0, 1)` per coordinate.
pub fn initial_ball(
    center: &[f64],
    scale: f64,
    n_walkers: usize,
    seed: u64,
) -> Result<Vec<Vec<f64>>, UqError> {
    let normal = Normal::new(0.0, scale)
        .map_err(|e| UqError::parameter(format!("Invalid initial ball scale {scale}: {e}")))?;
    let mut rng = StdRng::seed_from_u64(seed);
    Ok((0..n_walkers)
        .map(|_| center.iter().map(|c| c + normal.sample(&mut rng)).collect())
        .collect())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::math::{covariance, mean};
    use crate::models::{LinearModel, Transform};

    /// Posterior of a single constant `θ` fitted to `[1, 3]` with σ = 1:
    /// Gaussian with mean 2 and variance 1/2.
    fn constant_model() -> ParametricModel {
        ParametricModel::new(
            1,
            vec![0.0, 1.0],
            vec![1.0, 3.0],
            vec![1.0, 1.0],
            Arc::new(LinearModel),
            Transform::Identity,
        )
        .unwrap()
    }

    #[test]
    fn walker_count_is_validated() {
        assert!(EnsembleSampler::new(3, 1).is_err());
        assert!(EnsembleSampler::new(2, 2).is_err());
        assert!(EnsembleSampler::new(4, 2).is_ok());
        assert!(EnsembleSampler::new(4, 2).unwrap().with_stretch(1.0).is_err());
    }

    #[test]
    fn same_seed_same_chain() {
        let model = constant_model();
        let sampler = EnsembleSampler::new(8, 1).unwrap();
        let init = initial_ball(&[2.0], 0.1, 8, 1).unwrap();
        let a = sampler.run(&model, &LogPrior::Flat, &init, 50, 42).unwrap();
        let b = sampler.run(&model, &LogPrior::Flat, &init, 50, 42).unwrap();
        assert_eq!(a.samples, b.samples);
        assert_eq!(a.accepted, b.accepted);
        assert_eq!(a.n_walkers(), 8);
        assert_eq!(a.n_steps(), 50);
        assert_eq!(a.n_dim(), 1);
    }

    #[test]
    fn recovers_gaussian_posterior() {
        let model = constant_model();
        let sampler = EnsembleSampler::new(16, 1).unwrap();
        let init = initial_ball(&[2.0], 0.5, 16, 5).unwrap();
        let chain = sampler.run(&model, &LogPrior::Flat, &init, 3000, 9).unwrap();

        let flat = chain.flat(500, 5);
        let mu = mean(&flat).unwrap();
        let var = covariance(&flat).unwrap()[(0, 0)];
        assert!((mu[0] - 2.0).abs() < 0.1, "mean={}", mu[0]);
        assert!((var - 0.5).abs() < 0.1, "var={var}");

        let acc = chain.mean_acceptance();
        assert!(acc > 0.2 && acc < 0.95, "acceptance={acc}");
    }

    #[test]
    fn uniform_prior_confines_walkers() {
        let model = constant_model();
        let sampler = EnsembleSampler::new(8, 1).unwrap();
        let prior = LogPrior::uniform(vec![1.9], vec![2.1]).unwrap();
        let init = initial_ball(&[2.0], 0.01, 8, 2).unwrap();
        let chain = sampler.run(&model, &prior, &init, 300, 4).unwrap();
        for s in chain.flat(0, 1) {
            assert!(s[0] >= 1.9 && s[0] <= 2.1);
        }
    }

    #[test]
    fn initial_outside_support_is_rejected() {
        let model = constant_model();
        let sampler = EnsembleSampler::new(2, 1).unwrap();
        let prior = LogPrior::uniform(vec![0.0], vec![1.0]).unwrap();
        let err = sampler
            .run(&model, &prior, &[vec![0.5], vec![5.0]], 10, 0)
            .unwrap_err();
        assert!(matches!(err, UqError::InvalidParameter(_)));
    }

    #[test]
    fn flat_discard_and_thin() {
        let chain = Chain {
            samples: vec![
                (0..6).map(|i| vec![i as f64]).collect(),
                (0..6).map(|i| vec![10.0 + i as f64]).collect(),
            ],
            log_prob: vec![vec![0.0; 6]; 2],
            accepted: vec![3, 6],
        };
        let flat = chain.flat(2, 2);
        assert_eq!(flat, vec![vec![2.0], vec![12.0], vec![4.0], vec![14.0]]);
        assert_eq!(chain.acceptance_fraction(), vec![0.5, 1.0]);
        assert_eq!(chain.discard(4).n_steps(), 2);
        assert_eq!(chain.trace(1, 0), vec![10.0, 11.0, 12.0, 13.0, 14.0, 15.0]);
    }
}
