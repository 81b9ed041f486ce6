//! Command-line parsing for the `uq` tool.
//!
//! The goal of this module is to keep **argument parsing** separate from the
//! modeling/math code. Every analysis flag can also come from the environment
//! (or a `.env` file), e.g. `UQ_SEED=7 uq mcmc`.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use simplelog::LevelFilter;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "uq", version, about = "Uncertainty quantification for regression models")]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Copy, Args)]
pub struct GlobalOpts {
    /// Minimum log level.
    #[arg(global = true, long, env = "UQ_LOG_LEVEL", default_value_t = LevelFilter::Info)]
    pub log_level: LevelFilter,

    /// Debug logging with timestamps and source locations.
    #[arg(global = true, long, default_value_t = false)]
    pub debug: bool,

    /// Disable colored log output.
    #[arg(global = true, long, default_value_t = false)]
    pub no_colors: bool,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Least-squares best fit.
    Fit(FitArgs),
    /// Best fit plus Fisher information, eigenpairs and covariance estimate.
    Fim(FitArgs),
    /// Monte Carlo resampling of the data and refitting.
    Mc(MonteCarloArgs),
    /// Posterior sampling with an affine-invariant ensemble sampler.
    Mcmc(McmcArgs),
    /// Write the built-in reference scenario as a JSON template.
    Scenario(ScenarioArgs),
}

/// Options shared by every analysis.
#[derive(Debug, Clone, Args)]
pub struct FitArgs {
    /// Scenario JSON; the built-in reference scenario is used when omitted.
    #[arg(short = 's', long, value_name = "JSON", env = "UQ_SCENARIO")]
    pub scenario: Option<PathBuf>,

    /// Initial guess (comma-separated), overriding the scenario's `theta0`.
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
    pub theta0: Option<Vec<f64>>,

    /// Maximum Levenberg-Marquardt iterations.
    #[arg(long, default_value_t = 200)]
    pub max_iter: usize,

    /// Relative finite-difference step for Jacobians.
    #[arg(long, default_value_t = 1e-6)]
    pub jacobian_step: f64,

    /// Write a JSON run summary.
    #[arg(long = "export-summary", value_name = "JSON")]
    pub export_summary: Option<PathBuf>,
}

#[derive(Debug, Clone, Args)]
pub struct MonteCarloArgs {
    #[command(flatten)]
    pub fit: FitArgs,

    /// Number of perturbed datasets.
    #[arg(short = 'n', long, default_value_t = 1000)]
    pub samples: usize,

    /// Random seed for the data perturbations.
    #[arg(long, env = "UQ_SEED", default_value_t = 42)]
    pub seed: u64,
}

#[derive(Debug, Clone, Args)]
pub struct McmcArgs {
    #[command(flatten)]
    pub fit: FitArgs,

    /// Number of walkers (even, at least twice the parameter count).
    #[arg(long, default_value_t = 32)]
    pub walkers: usize,

    /// Steps per walker.
    #[arg(long, default_value_t = 5000)]
    pub steps: usize,

    /// Burn-in steps to drop; estimated with MSER when omitted.
    #[arg(long)]
    pub burn: Option<usize>,

    /// Keep every n-th step after burn-in.
    #[arg(long, default_value_t = 1)]
    pub thin: usize,

    /// Random seed for the initial ball and the sampler.
    #[arg(long, env = "UQ_SEED", default_value_t = 42)]
    pub seed: u64,

    /// Standard deviation of the initial ball around the best fit.
    #[arg(long, default_value_t = 1e-2)]
    pub ball_scale: f64,

    /// Uniform prior lower bounds (comma-separated).
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
    pub lower: Option<Vec<f64>>,

    /// Uniform prior upper bounds (comma-separated).
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
    pub upper: Option<Vec<f64>>,

    /// Export the full chain to CSV.
    #[arg(long = "export-chain", value_name = "CSV")]
    pub export_chain: Option<PathBuf>,
}

#[derive(Debug, Clone, Args)]
pub struct ScenarioArgs {
    /// Output path for the scenario template.
    #[arg(long, value_name = "JSON")]
    pub out: PathBuf,
}
