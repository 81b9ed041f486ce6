//! Formatted terminal output.
//!
//! We keep formatting code in one place so:
//! - the numerical code stays clean and testable
//! - output changes are localized

use nalgebra::DMatrix;

use crate::diagnostics::Psrf;
use crate::fit::FitResult;
use crate::math::FimAnalysis;
use crate::models::ParametricModel;
use crate::sampling::MonteCarloEnsemble;

/// Sampling outputs summarized after burn-in and thinning.
#[derive(Debug, Clone)]
pub struct PosteriorSummary {
    pub n_walkers: usize,
    pub n_steps: usize,
    pub burn: usize,
    pub thin: usize,
    pub n_samples: usize,
    pub acceptance: f64,
    pub tau: Option<Vec<f64>>,
    pub psrf: Option<Psrf>,
    pub mean: Vec<f64>,
    pub covariance: DMatrix<f64>,
}

pub fn format_model_header(model: &ParametricModel) -> String {
    let mut out = String::new();
    out.push_str("=== uq - regression uncertainty quantification ===\n");
    out.push_str(&format!(
        "Model: {} | N={} | M={} | transform={:?}\n",
        model.forward_name(),
        model.n_params(),
        model.n_points(),
        model.transform()
    ));
    out.push_str(&format!("t:          {}\n", format_vec(model.t(), 4)));
    out.push_str(&format!("data:       {}\n", format_vec(model.data(), 4)));
    out.push_str(&format!("data_error: {}\n", format_vec(model.data_error(), 4)));
    out
}

pub fn format_fit(fit: &FitResult) -> String {
    let mut out = String::new();
    out.push_str("\nLeast-squares fit:\n");
    out.push_str(&format!("  theta*   = {}\n", format_vec(&fit.theta, 6)));
    out.push_str(&format!("  physical = {}\n", format_vec(&fit.physical, 6)));
    out.push_str(&format!("  cost     = {:.6}\n", fit.cost));
    out.push_str(&format!(
        "  iterations={} converged={}\n",
        fit.iterations, fit.converged
    ));
    out
}

pub fn format_fim(fa: &FimAnalysis) -> String {
    let mut out = String::new();
    out.push_str("\nFisher information (Jr^T Jr):\n");
    out.push_str(&format_matrix(&fa.fim, 4));
    out.push_str(&format!(
        "  eigenvalues = {}\n",
        format_vec(fa.eigen.values.as_slice(), 4)
    ));
    out.push_str("  eigenvectors (columns):\n");
    out.push_str(&format_matrix(&fa.eigen.vectors, 4));
    match fa.condition_number {
        Some(c) => out.push_str(&format!("  condition number = {c:.3e}\n")),
        None => out.push_str("  condition number = inf\n"),
    }
    match &fa.covariance {
        Some(cov) => {
            out.push_str("  covariance (FIM^-1):\n");
            out.push_str(&format_matrix(cov, 6));
            out.push_str(&format!("  std dev = {}\n", format_vec(&std_devs(cov), 6)));
        }
        None => out.push_str("  covariance: FIM is singular\n"),
    }
    out
}

pub fn format_monte_carlo(ens: &MonteCarloEnsemble) -> String {
    let mut out = String::new();
    out.push_str("\nMonte Carlo ensemble:\n");
    out.push_str(&format!(
        "  fits={} failed={}\n",
        ens.samples.len(),
        ens.failed
    ));
    out.push_str(&format!("  mean    = {}\n", format_vec(&ens.mean, 6)));
    out.push_str(&format!("  std dev = {}\n", format_vec(&std_devs(&ens.covariance), 6)));
    out.push_str("  covariance:\n");
    out.push_str(&format_matrix(&ens.covariance, 6));
    out
}

pub fn format_posterior(post: &PosteriorSummary) -> String {
    let mut out = String::new();
    out.push_str("\nMCMC posterior:\n");
    out.push_str(&format!(
        "  walkers={} steps={} samples={} (burn={}, thin={}) acceptance={:.3}\n",
        post.n_walkers, post.n_steps, post.n_samples, post.burn, post.thin, post.acceptance
    ));
    match &post.tau {
        Some(tau) => out.push_str(&format!("  autocorrelation time = {}\n", format_vec(tau, 2))),
        None => out.push_str("  autocorrelation time = n/a\n"),
    }
    match &post.psrf {
        Some(p) => out.push_str(&format!("  r-hat = {:.4}\n", p.rhat)),
        None => out.push_str("  r-hat = n/a\n"),
    }
    out.push_str(&format!("  mean    = {}\n", format_vec(&post.mean, 6)));
    out.push_str(&format!("  std dev = {}\n", format_vec(&std_devs(&post.covariance), 6)));
    out.push_str("  covariance:\n");
    out.push_str(&format_matrix(&post.covariance, 6));
    out
}

fn std_devs(cov: &DMatrix<f64>) -> Vec<f64> {
    (0..cov.nrows()).map(|i| cov[(i, i)].max(0.0).sqrt()).collect()
}

fn format_vec(values: &[f64], decimals: usize) -> String {
    let parts: Vec<String> = values.iter().map(|v| format!("{v:.decimals$}")).collect();
    format!("[{}]", parts.join(", "))
}

fn format_matrix(m: &DMatrix<f64>, decimals: usize) -> String {
    let mut out = String::new();
    for row in m.row_iter() {
        let parts: Vec<String> = row
            .iter()
            .map(|v| format!("{v:>14.decimals$}"))
            .collect();
        out.push_str(&format!("    {}\n", parts.join(" ")));
    }
    out
}
