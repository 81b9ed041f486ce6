//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - parsed from CLI flags and scenario files
//! - used in-memory by the analyses
//! - exported to JSON for later comparison

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Which closed-form forward model to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum ModelKind {
    /// `1 / (Σ φ_n tⁿ + t^N)`.
    Fractional,
    /// `φ₀ / (1 + φ₁ t)` (exactly two parameters).
    RationalDecay,
    /// `Σ φ_n tⁿ`.
    Linear,
    /// `(1/N) Σ exp(−φ_n t)`.
    Exponential,
}

impl ModelKind {
    pub const ALL: [ModelKind; 4] = [
        ModelKind::Fractional,
        ModelKind::RationalDecay,
        ModelKind::Linear,
        ModelKind::Exponential,
    ];

    /// Human-readable label for terminal output.
    pub fn display_name(self) -> &'static str {
        match self {
            ModelKind::Fractional => "fractional",
            ModelKind::RationalDecay => "rational-decay",
            ModelKind::Linear => "linear",
            ModelKind::Exponential => "exponential",
        }
    }
}

/// Named built-in parameter transforms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum TransformKind {
    #[default]
    Identity,
    /// `φ = exp(θ)`; fits in log-parameter space.
    Exp,
}

/// Options shared by every command that runs a least-squares fit.
#[derive(Debug, Clone)]
pub struct FitConfig {
    /// Initial guess; defaults to the scenario's `theta0`, else zeros.
    pub theta0: Option<Vec<f64>>,
    pub max_iter: usize,
    /// Relative finite-difference step for Jacobians.
    pub jacobian_step: f64,
    pub export_summary: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct MonteCarloConfig {
    pub fit: FitConfig,
    pub n_samples: usize,
    pub seed: u64,
}

#[derive(Debug, Clone)]
pub struct McmcConfig {
    pub fit: FitConfig,
    pub n_walkers: usize,
    pub n_steps: usize,
    /// Steps dropped from the start of every walker before summarizing.
    ///
    /// `None` uses the MSER equilibration estimate.
    pub burn: Option<usize>,
    pub thin: usize,
    pub seed: u64,
    /// Standard deviation of the Gaussian ball around the best fit.
    pub ball_scale: f64,
    /// Uniform prior bounds (both or neither).
    pub lower: Option<Vec<f64>>,
    pub upper: Option<Vec<f64>>,
    pub export_chain: Option<PathBuf>,
}

/// Best-fit section of a run summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FitSummary {
    pub theta: Vec<f64>,
    pub physical: Vec<f64>,
    pub cost: f64,
    pub iterations: usize,
    pub converged: bool,
}

/// Fisher-information section of a run summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FimSummary {
    pub fim: Vec<Vec<f64>>,
    pub eigenvalues: Vec<f64>,
    /// Eigenvectors as rows, ordered like `eigenvalues`.
    pub eigenvectors: Vec<Vec<f64>>,
    pub covariance: Option<Vec<Vec<f64>>>,
    /// Missing when the FIM is singular.
    pub condition_number: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonteCarloSummary {
    pub n_samples: usize,
    pub failed: usize,
    pub mean: Vec<f64>,
    pub covariance: Vec<Vec<f64>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McmcSummary {
    pub n_walkers: usize,
    pub n_steps: usize,
    pub burn: usize,
    pub thin: usize,
    pub acceptance_fraction: f64,
    pub autocorrelation_time: Option<Vec<f64>>,
    pub rhat: Option<f64>,
    pub mean: Vec<f64>,
    pub covariance: Vec<Vec<f64>>,
}

/// JSON-exportable summary of one `uq` run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub tool: String,
    pub generated_at: DateTime<Utc>,
    pub model: String,
    pub n_params: usize,
    pub n_points: usize,
    pub fit: FitSummary,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub fim: Option<FimSummary>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub monte_carlo: Option<MonteCarloSummary>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub mcmc: Option<McmcSummary>,
}
