//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - loads `.env` and parses CLI arguments
//! - initializes logging
//! - loads the scenario and runs the requested analysis
//! - prints reports and writes optional exports

use std::cmp::max;

use clap::Parser;
use simplelog::{ColorChoice, ConfigBuilder, LevelFilter, TermLogger, TerminalMode};

use crate::app::pipeline::Session;
use crate::cli::{Cli, Command, FitArgs, GlobalOpts, McmcArgs, MonteCarloArgs, ScenarioArgs};
use crate::domain::{FitConfig, McmcConfig, MonteCarloConfig, RunSummary};
use crate::error::UqError;
use crate::io::{Scenario, write_chain_csv, write_scenario_json, write_summary_json};

pub mod pipeline;

/// Entry point for the `uq` binary.
pub fn run() -> Result<(), UqError> {
    // Flags with an `env` fallback (UQ_SEED, UQ_LOG_LEVEL, ...) may come from `.env`.
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_logging(cli.global)?;
    log::debug!("Parsed arguments: {cli:?}");

    match cli.command {
        Command::Fit(args) => handle_fit(&args),
        Command::Fim(args) => handle_fim(&args),
        Command::Mc(args) => handle_monte_carlo(&args),
        Command::Mcmc(args) => handle_mcmc(&args),
        Command::Scenario(args) => handle_scenario(&args),
    }
}

fn init_logging(opts: GlobalOpts) -> Result<(), UqError> {
    let level = if opts.debug {
        max(LevelFilter::Debug, opts.log_level)
    } else {
        opts.log_level
    };

    let mut builder = ConfigBuilder::new();
    if opts.debug {
        builder.set_time_level(LevelFilter::Error);
        builder.set_target_level(LevelFilter::Error);
        builder.set_location_level(LevelFilter::Error);
    } else {
        builder.set_time_level(LevelFilter::Off);
        builder.set_thread_level(LevelFilter::Off);
        builder.set_target_level(LevelFilter::Off);
        builder.set_location_level(LevelFilter::Off);
    }
    let colors = if opts.no_colors {
        ColorChoice::Never
    } else {
        ColorChoice::Auto
    };

    TermLogger::init(level, builder.build(), TerminalMode::Stderr, colors)
        .map_err(|e| UqError::Config(format!("Failed to initialize logging: {e}")))
}

fn handle_fit(args: &FitArgs) -> Result<(), UqError> {
    let config = fit_config_from_args(args);
    let session = Session::load(args.scenario.as_deref())?;
    let fit = pipeline::run_fit(&session, &config)?;

    println!("{}", crate::report::format_model_header(&session.model));
    println!("{}", crate::report::format_fit(&fit));

    let summary = pipeline::build_summary(&session, &fit, None, None, None);
    export_summary(&config, &summary)
}

fn handle_fim(args: &FitArgs) -> Result<(), UqError> {
    let config = fit_config_from_args(args);
    let session = Session::load(args.scenario.as_deref())?;
    let fit = pipeline::run_fit(&session, &config)?;
    let fim = pipeline::run_fim(&session, &fit, &config)?;

    println!("{}", crate::report::format_model_header(&session.model));
    println!("{}", crate::report::format_fit(&fit));
    println!("{}", crate::report::format_fim(&fim));

    let summary = pipeline::build_summary(&session, &fit, Some(&fim), None, None);
    export_summary(&config, &summary)
}

fn handle_monte_carlo(args: &MonteCarloArgs) -> Result<(), UqError> {
    let config = MonteCarloConfig {
        fit: fit_config_from_args(&args.fit),
        n_samples: args.samples,
        seed: args.seed,
    };
    let session = Session::load(args.fit.scenario.as_deref())?;
    let fit = pipeline::run_fit(&session, &config.fit)?;
    let ensemble = pipeline::run_monte_carlo_ensemble(&session, &fit, &config)?;

    println!("{}", crate::report::format_model_header(&session.model));
    println!("{}", crate::report::format_fit(&fit));
    println!("{}", crate::report::format_monte_carlo(&ensemble));

    let summary = pipeline::build_summary(&session, &fit, None, Some(&ensemble), None);
    export_summary(&config.fit, &summary)
}

fn handle_mcmc(args: &McmcArgs) -> Result<(), UqError> {
    let config = mcmc_config_from_args(args);
    let session = Session::load(args.fit.scenario.as_deref())?;
    let fit = pipeline::run_fit(&session, &config.fit)?;
    let out = pipeline::run_mcmc(&session, &fit, &config)?;

    println!("{}", crate::report::format_model_header(&session.model));
    println!("{}", crate::report::format_fit(&fit));
    println!("{}", crate::report::format_posterior(&out.posterior));

    if let Some(path) = &config.export_chain {
        write_chain_csv(path, &out.chain)?;
        log::info!("Wrote chain to {}", path.display());
    }
    let summary = pipeline::build_summary(&session, &fit, None, None, Some(&out.posterior));
    export_summary(&config.fit, &summary)
}

fn handle_scenario(args: &ScenarioArgs) -> Result<(), UqError> {
    write_scenario_json(&args.out, &Scenario::reference())?;
    log::info!("Wrote reference scenario to {}", args.out.display());
    Ok(())
}

fn export_summary(config: &FitConfig, summary: &RunSummary) -> Result<(), UqError> {
    if let Some(path) = &config.export_summary {
        write_summary_json(path, summary)?;
        log::info!("Wrote summary to {}", path.display());
    }
    Ok(())
}

pub fn fit_config_from_args(args: &FitArgs) -> FitConfig {
    FitConfig {
        theta0: args.theta0.clone(),
        max_iter: args.max_iter,
        jacobian_step: args.jacobian_step,
        export_summary: args.export_summary.clone(),
    }
}

pub fn mcmc_config_from_args(args: &McmcArgs) -> McmcConfig {
    McmcConfig {
        fit: fit_config_from_args(&args.fit),
        n_walkers: args.walkers,
        n_steps: args.steps,
        burn: args.burn,
        thin: args.thin,
        seed: args.seed,
        ball_scale: args.ball_scale,
        lower: args.lower.clone(),
        upper: args.upper.clone(),
        export_chain: args.export_chain.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mcmc_args_map_to_config() {
        let cli = Cli::try_parse_from([
            "uq", "mcmc", "--steps", "300", "--thin", "3", "--seed", "9",
        ])
        .unwrap();
        let Command::Mcmc(args) = cli.command else {
            panic!("expected mcmc");
        };
        let config = mcmc_config_from_args(&args);
        assert_eq!(config.n_steps, 300);
        assert_eq!(config.thin, 3);
        assert_eq!(config.seed, 9);
        assert_eq!(config.fit.max_iter, 200);
        assert!(config.burn.is_none());
    }
}
