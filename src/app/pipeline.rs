//! Shared analysis pipeline used by every subcommand.
//!
//! Keeping this in one place avoids duplicating the core workflow:
//! scenario -> model -> least-squares fit -> (FIM | Monte Carlo | MCMC) -> summary
//!
//! The CLI layer only parses arguments and prints what comes back.

use std::path::Path;

use chrono::Utc;

use crate::diagnostics::{AutocorrOptions, integrated_time, mser, rhat};
use crate::domain::{
    FimSummary, FitConfig, FitSummary, McmcConfig, McmcSummary, MonteCarloConfig,
    MonteCarloSummary, RunSummary,
};
use crate::error::UqError;
use crate::fit::{FitResult, LmOptions, fit_least_squares};
use crate::io::{Scenario, read_scenario_json};
use crate::math::{FimAnalysis, covariance, matrix_rows, mean};
use crate::models::ParametricModel;
use crate::report::PosteriorSummary;
use crate::sampling::{
    Chain, EnsembleSampler, LogPrior, MonteCarloEnsemble, MonteCarloOptions, initial_ball,
    run_monte_carlo,
};

/// Burn-in estimates are capped at this fraction of the chain.
const MAX_BURN_FRACTION: f64 = 0.5;

/// A loaded scenario and the model built from it.
#[derive(Debug, Clone)]
pub struct Session {
    pub scenario: Scenario,
    pub model: ParametricModel,
}

impl Session {
    /// Load a scenario file, or the built-in reference scenario when `path` is `None`.
    pub fn load(path: Option<&Path>) -> Result<Self, UqError> {
        let scenario = match path {
            Some(p) => read_scenario_json(p)?,
            None => Scenario::reference(),
        };
        let model = scenario.build_model()?;
        log::info!(
            "Loaded {} model: N={}, M={}",
            model.forward_name(),
            model.n_params(),
            model.n_points()
        );
        Ok(Self { scenario, model })
    }

    pub fn initial_guess(&self, config: &FitConfig) -> Vec<f64> {
        config
            .theta0
            .clone()
            .unwrap_or_else(|| self.scenario.initial_guess())
    }
}

pub fn lm_options(config: &FitConfig) -> LmOptions {
    LmOptions {
        max_iter: config.max_iter,
        jacobian_step: config.jacobian_step,
        ..LmOptions::default()
    }
}

pub fn run_fit(session: &Session, config: &FitConfig) -> Result<FitResult, UqError> {
    let theta0 = session.initial_guess(config);
    let fit = fit_least_squares(&session.model, &theta0, &lm_options(config))?;
    log::info!(
        "Best fit theta={:?} cost={:.6} ({} iterations)",
        fit.theta,
        fit.cost,
        fit.iterations
    );
    Ok(fit)
}

pub fn run_fim(
    session: &Session,
    fit: &FitResult,
    config: &FitConfig,
) -> Result<FimAnalysis, UqError> {
    FimAnalysis::at(&session.model, &fit.theta, config.jacobian_step)
}

/// Monte Carlo refits start from the best fit.
pub fn run_monte_carlo_ensemble(
    session: &Session,
    fit: &FitResult,
    config: &MonteCarloConfig,
) -> Result<MonteCarloEnsemble, UqError> {
    let opts = MonteCarloOptions {
        n_samples: config.n_samples,
        seed: config.seed,
        lm: lm_options(&config.fit),
    };
    run_monte_carlo(&session.model, &fit.theta, &opts)
}

#[derive(Debug, Clone)]
pub struct McmcOutput {
    pub chain: Chain,
    pub posterior: PosteriorSummary,
}

/// Sample the posterior with walkers started in a ball around the best fit.
pub fn run_mcmc(
    session: &Session,
    fit: &FitResult,
    config: &McmcConfig,
) -> Result<McmcOutput, UqError> {
    let n_dim = session.model.n_params();
    let prior = match (&config.lower, &config.upper) {
        (Some(lo), Some(hi)) => LogPrior::uniform(lo.clone(), hi.clone())?,
        (None, None) => LogPrior::Flat,
        _ => {
            return Err(UqError::Config(
                "Prior bounds need both --lower and --upper.".to_string(),
            ));
        }
    };
    prior.check_dim(n_dim)?;
    if config.n_steps < 2 {
        return Err(UqError::parameter("MCMC needs at least 2 steps."));
    }

    let sampler = EnsembleSampler::new(config.n_walkers, n_dim)?;
    let mut initial = initial_ball(&fit.theta, config.ball_scale, config.n_walkers, config.seed)?;
    if let LogPrior::Uniform { lower, upper } = &prior {
        for p in &mut initial {
            for (v, (lo, hi)) in p.iter_mut().zip(lower.iter().zip(upper.iter())) {
                *v = v.clamp(*lo, *hi);
            }
        }
    }

    log::info!(
        "MCMC: {} walkers x {} steps (seed {})",
        config.n_walkers,
        config.n_steps,
        config.seed
    );
    let chain = sampler.run(
        &session.model,
        &prior,
        &initial,
        config.n_steps,
        config.seed.wrapping_add(1),
    )?;

    let burn = match config.burn {
        Some(b) => b.min(config.n_steps - 1),
        None => estimate_burn_in(&chain)?,
    };
    let posterior = summarize_chain(&chain, burn, config.thin)?;
    Ok(McmcOutput { chain, posterior })
}

/// MSER on every walker trace; the most conservative estimate wins.
pub fn estimate_burn_in(chain: &Chain) -> Result<usize, UqError> {
    let n_steps = chain.n_steps();
    let dstep = (n_steps / 100).max(1);
    let cap = (n_steps as f64 * MAX_BURN_FRACTION) as usize;

    let mut burn = 0;
    for w in 0..chain.n_walkers() {
        for d in 0..chain.n_dim() {
            let est = mser(&chain.trace(w, d), 0, dstep, None)?;
            burn = burn.max(est.dstar);
        }
    }
    let burn = burn.min(cap);
    log::info!("MSER burn-in estimate: {burn} steps");
    Ok(burn)
}

pub fn summarize_chain(
    chain: &Chain,
    burn: usize,
    thin: usize,
) -> Result<PosteriorSummary, UqError> {
    let thin = thin.max(1);
    let kept = chain.discard(burn);

    // A chain shorter than `tol · τ` reports no autocorrelation time.
    let tau = match integrated_time(&kept, &AutocorrOptions::default()) {
        Ok(tau) => Some(tau),
        Err(e) => {
            log::warn!("Autocorrelation time unavailable: {e}");
            None
        }
    };
    let psrf = match rhat(&kept) {
        Ok(p) => Some(p),
        Err(e) => {
            log::warn!("r-hat unavailable: {e}");
            None
        }
    };

    let flat = chain.flat(burn, thin);
    let mean = mean(&flat)?;
    let covariance = covariance(&flat)?;

    Ok(PosteriorSummary {
        n_walkers: chain.n_walkers(),
        n_steps: chain.n_steps(),
        burn,
        thin,
        n_samples: flat.len(),
        acceptance: chain.mean_acceptance(),
        tau,
        psrf,
        mean,
        covariance,
    })
}

/// Collect whatever was computed into an exportable summary.
pub fn build_summary(
    session: &Session,
    fit: &FitResult,
    fim: Option<&FimAnalysis>,
    monte_carlo: Option<&MonteCarloEnsemble>,
    posterior: Option<&PosteriorSummary>,
) -> RunSummary {
    RunSummary {
        tool: "uq".to_string(),
        generated_at: Utc::now(),
        model: session.model.forward_name().to_string(),
        n_params: session.model.n_params(),
        n_points: session.model.n_points(),
        fit: FitSummary {
            theta: fit.theta.clone(),
            physical: fit.physical.clone(),
            cost: fit.cost,
            iterations: fit.iterations,
            converged: fit.converged,
        },
        fim: fim.map(|fa| FimSummary {
            fim: matrix_rows(&fa.fim),
            eigenvalues: fa.eigen.values.iter().copied().collect(),
            eigenvectors: matrix_rows(&fa.eigen.vectors.transpose()),
            covariance: fa.covariance.as_ref().map(matrix_rows),
            condition_number: fa.condition_number,
        }),
        monte_carlo: monte_carlo.map(|ens| MonteCarloSummary {
            n_samples: ens.samples.len(),
            failed: ens.failed,
            mean: ens.mean.clone(),
            covariance: matrix_rows(&ens.covariance),
        }),
        mcmc: posterior.map(|post| McmcSummary {
            n_walkers: post.n_walkers,
            n_steps: post.n_steps,
            burn: post.burn,
            thin: post.thin,
            acceptance_fraction: post.acceptance,
            autocorrelation_time: post.tau.clone(),
            rhat: post.psrf.as_ref().map(|p| p.rhat),
            mean: post.mean.clone(),
            covariance: matrix_rows(&post.covariance),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fit_config() -> FitConfig {
        FitConfig {
            theta0: None,
            max_iter: 200,
            jacobian_step: 1e-6,
            export_summary: None,
        }
    }

    #[test]
    fn reference_session_fits_and_summarizes() {
        let session = Session::load(None).unwrap();
        let config = fit_config();
        let fit = run_fit(&session, &config).unwrap();
        let fim = run_fim(&session, &fit, &config).unwrap();
        let summary = build_summary(&session, &fit, Some(&fim), None, None);

        assert_eq!(summary.n_params, 2);
        assert_eq!(summary.n_points, 3);
        let fim_summary = summary.fim.unwrap();
        assert_eq!(fim_summary.eigenvalues.len(), 2);
        assert!(fim_summary.eigenvalues[0] < fim_summary.eigenvalues[1]);
        assert!(fim_summary.covariance.is_some());
    }

    #[test]
    fn mcmc_posterior_is_centred_near_best_fit() {
        let session = Session::load(None).unwrap();
        let fc = fit_config();
        let fit = run_fit(&session, &fc).unwrap();
        let config = McmcConfig {
            fit: fc,
            n_walkers: 8,
            n_steps: 2000,
            burn: Some(200),
            thin: 2,
            seed: 17,
            ball_scale: 1e-2,
            lower: Some(vec![-8.0, -8.0]),
            upper: Some(vec![8.0, 8.0]),
            export_chain: None,
        };
        let out = run_mcmc(&session, &fit, &config).unwrap();
        assert_eq!(out.posterior.burn, 200);
        assert_eq!(out.posterior.n_samples, 8 * 900);
        assert!(out.posterior.acceptance > 0.05);
        for (m, best) in out.posterior.mean.iter().zip(fit.theta.iter()) {
            assert!((m - best).abs() < 1.5, "mean={m} best={best}");
        }
    }

    fn chain_of(traces: Vec<Vec<f64>>) -> Chain {
        let n_steps = traces[0].len();
        Chain {
            log_prob: vec![vec![0.0; n_steps]; traces.len()],
            accepted: vec![0; traces.len()],
            samples: traces
                .into_iter()
                .map(|t| t.into_iter().map(|v| vec![v]).collect())
                .collect(),
        }
    }

    #[test]
    fn burn_in_estimate_finds_the_transient() {
        let trace: Vec<f64> = (0..200)
            .map(|i| match i {
                0..20 => 10.0,
                _ if i % 2 == 0 => 0.1,
                _ => -0.1,
            })
            .collect();
        let burn = estimate_burn_in(&chain_of(vec![trace.clone(), trace])).unwrap();
        assert!((20..=24).contains(&burn), "burn={burn}");
    }

    #[test]
    fn burn_in_estimate_is_capped_at_half_the_chain() {
        // A chain that never settles: MSER would drop nearly everything.
        let ramp: Vec<f64> = (0..200).map(|i| i as f64).collect();
        let burn = estimate_burn_in(&chain_of(vec![ramp.clone(), ramp])).unwrap();
        assert_eq!(burn, 100);
    }

    #[test]
    fn automatic_burn_in_on_a_short_run_reports_no_tau() {
        let session = Session::load(None).unwrap();
        let fc = fit_config();
        let fit = run_fit(&session, &fc).unwrap();
        let config = McmcConfig {
            fit: fc,
            n_walkers: 8,
            n_steps: 100,
            burn: None,
            thin: 1,
            seed: 3,
            ball_scale: 1e-2,
            lower: Some(vec![-8.0, -8.0]),
            upper: Some(vec![8.0, 8.0]),
            export_chain: None,
        };
        let out = run_mcmc(&session, &fit, &config).unwrap();
        let post = &out.posterior;
        assert!(post.burn <= config.n_steps / 2, "burn={}", post.burn);
        assert_eq!(post.n_samples, 8 * (config.n_steps - post.burn));
        assert!(post.tau.is_none(), "tau={:?}", post.tau);
        assert_eq!(post.mean.len(), 2);

        let summary = build_summary(&session, &fit, None, None, Some(post));
        let mcmc = summary.mcmc.unwrap();
        assert!(mcmc.autocorrelation_time.is_none());
        assert_eq!(mcmc.burn, post.burn);
    }

    #[test]
    fn one_sided_prior_bounds_are_rejected() {
        let session = Session::load(None).unwrap();
        let fc = fit_config();
        let fit = run_fit(&session, &fc).unwrap();
        let config = McmcConfig {
            fit: fc,
            n_walkers: 8,
            n_steps: 10,
            burn: None,
            thin: 1,
            seed: 0,
            ball_scale: 1e-2,
            lower: Some(vec![-1.0, -1.0]),
            upper: None,
            export_chain: None,
        };
        assert!(matches!(
            run_mcmc(&session, &fit, &config).unwrap_err(),
            UqError::Config(_)
        ));
    }

    #[test]
    fn monte_carlo_from_best_fit() {
        let session = Session::load(None).unwrap();
        let fc = fit_config();
        let fit = run_fit(&session, &fc).unwrap();
        let config = MonteCarloConfig {
            fit: fc,
            n_samples: 50,
            seed: 5,
        };
        let ens = run_monte_carlo_ensemble(&session, &fit, &config).unwrap();
        assert_eq!(ens.samples.len() + ens.failed, 50);
        let summary = build_summary(&session, &fit, None, Some(&ens), None);
        assert!(summary.monte_carlo.is_some());
    }
}
