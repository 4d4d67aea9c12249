//! Command-line parsing for the saturation curve fitter.
//!
//! The goal of this module is to keep **argument parsing** and **command dispatch**
//! separate from the modeling/math code.

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand};

use crate::fit::{DEFAULT_MAX_CANDIDATES, DEFAULT_MAX_ITER};

pub mod confirm;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "satfit", version, about = "Saturation curve fitter (BFGS + Levenberg-Marquardt)")]
pub struct Cli {
    /// Increase log verbosity (-v debug, -vv trace). `RUST_LOG` overrides.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fit the model to observed data, print the summary and write the fitted parameters.
    Fit(FitArgs),
    /// Write a synthetic data CSV from a parameter file.
    Simulate(SimulateArgs),
}

#[derive(Debug, Parser, Clone)]
pub struct FitArgs {
    /// Parameter file (`name = value` per line).
    #[arg(short, long, env = "SATFIT_PARAMS", value_name = "FILE")]
    pub params: PathBuf,

    /// Observation CSV (`time,value` with one header row).
    #[arg(short, long, env = "SATFIT_DATA", value_name = "CSV")]
    pub data: PathBuf,

    /// Fitted parameter output file (overwritten).
    #[arg(short, long, default_value = "fitted_parameters.txt")]
    pub output: PathBuf,

    /// `(dt, loss)` search trace CSV, written on every run (overwritten).
    #[arg(long, value_name = "CSV", default_value = "dt_vs_loss.csv")]
    pub trace: PathBuf,

    /// Write a JSON report (parameters, asymptote, fitted grid).
    #[arg(long, value_name = "JSON")]
    pub report: Option<PathBuf>,

    /// BFGS iteration cap per candidate.
    #[arg(long, default_value_t = DEFAULT_MAX_ITER)]
    pub max_iter: u64,

    /// Maximum number of `(dt, cvert)` candidates.
    #[arg(long, default_value_t = DEFAULT_MAX_CANDIDATES)]
    pub max_candidates: usize,

    /// Fit candidates one at a time instead of on the thread pool.
    #[arg(long)]
    pub sequential: bool,

    /// Skip the interactive parameter confirmation.
    #[arg(short = 'y', long)]
    pub yes: bool,

    /// Disable the terminal plot.
    #[arg(long)]
    pub no_plot: bool,

    /// Plot width (columns).
    #[arg(long, default_value_t = 100)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 25)]
    pub height: usize,
}

#[derive(Debug, Parser, Clone)]
pub struct SimulateArgs {
    /// Parameter file supplying the model parameters and constants.
    #[arg(short, long, env = "SATFIT_PARAMS", value_name = "FILE")]
    pub params: PathBuf,

    /// Transition time.
    #[arg(long)]
    pub dt: f64,

    /// Baseline offset.
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    pub cvert: f64,

    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    pub t_min: f64,

    #[arg(long, default_value_t = 100.0, allow_negative_numbers = true)]
    pub t_max: f64,

    #[arg(long, default_value_t = 1.0)]
    pub step: f64,

    /// Standard deviation of additive Gaussian noise.
    #[arg(long, default_value_t = 0.0)]
    pub noise: f64,

    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Output CSV.
    #[arg(long, default_value = "data.csv")]
    pub out: PathBuf,
}
