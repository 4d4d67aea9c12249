//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - loads `.env` and parses CLI arguments
//! - reads and confirms the parameter file
//! - loads observations and runs the fit pipeline
//! - prints the summary/plot and writes outputs

use clap::Parser;
use tracing::info;

use crate::cli::{Cli, Command, FitArgs, SimulateArgs};
use crate::data::{SyntheticGrid, generate, write_series_csv};
use crate::domain::ParameterSchema;
use crate::error::AppError;
use crate::fit::{OptimizerConfig, SearchOptions};

pub mod pipeline;

use pipeline::FitSettings;

/// Entry point for the `satfit` binary.
pub fn run() -> Result<(), AppError> {
    // A missing .env is fine; it only supplies defaults.
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    crate::logging::init(cli.verbose);

    match cli.command {
        Command::Fit(args) => handle_fit(args),
        Command::Simulate(args) => handle_simulate(args),
    }
}

fn handle_fit(args: FitArgs) -> Result<(), AppError> {
    let schema = ParameterSchema::default();
    let input = crate::io::read_parameter_file(&args.params, &schema)?;
    if !args.yes {
        crate::cli::confirm::confirm_parameters(&input, &schema)?;
    }

    let loaded = crate::io::load_series(&args.data)?;
    info!(
        rows_read = loaded.rows_read,
        rows_used = loaded.series.len(),
        rows_skipped = loaded.row_errors.len(),
        "data loaded"
    );

    let settings = fit_settings_from_args(&args);
    let run = pipeline::run_fit(&input, &loaded.series, &settings)?;

    println!("{}", crate::report::format_run_summary(&run));

    crate::io::write_fitted_parameters(&args.output, &run.search.best.parameters, &run.aux, run.bt, &schema)?;
    info!(path = %args.output.display(), "fitted parameters written");

    crate::io::write_trace_csv(&args.trace, &run.search.trace)?;
    info!(path = %args.trace.display(), entries = run.search.trace.len(), "search trace written");
    if let Some(path) = &args.report {
        crate::io::write_report_json(path, &crate::report::build_fit_report(&run))?;
    }

    if !args.no_plot {
        let plot = crate::plot::render_fit_plot(
            &run.windows.display,
            &run.input.guess,
            &run.search.best.parameters,
            &run.aux,
            args.width,
            args.height,
        );
        println!("{plot}");
    }

    Ok(())
}

fn handle_simulate(args: SimulateArgs) -> Result<(), AppError> {
    let input = crate::io::read_parameter_file(&args.params, &ParameterSchema::default())?;
    let aux = input.aux.with_candidate(args.dt, args.cvert);
    let grid = SyntheticGrid {
        t_min: args.t_min,
        t_max: args.t_max,
        step: args.step,
        noise_sigma: args.noise,
        seed: args.seed,
    };

    let series = generate(&input.guess, &aux, &grid)?;
    write_series_csv(&args.out, &series)?;
    info!(samples = series.len(), path = %args.out.display(), "synthetic data written");
    Ok(())
}

pub fn fit_settings_from_args(args: &FitArgs) -> FitSettings {
    FitSettings {
        optimizer: OptimizerConfig {
            max_iter: args.max_iter,
            ..OptimizerConfig::default()
        },
        search: SearchOptions {
            max_candidates: args.max_candidates,
            parallel: !args.sequential,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TunableParameters;

    #[test]
    fn fit_run_always_writes_the_trace() {
        let dir = tempfile::tempdir().unwrap();
        let params = dir.path().join("params.txt");
        let data = dir.path().join("data.csv");
        let output = dir.path().join("fitted.txt");
        let trace = dir.path().join("dt_vs_loss.csv");

        std::fs::write(
            &params,
            "k1 = 0.5\nn0 = 10\nn1 = 20\nn2 = 50\n\
             dt_min = 9\ndt_max = 11\nc3 = 1\nr = 1\n\
             graph_left_cutoff = 0\ngraph_right_cutoff = 40\n\
             optimization_left_cutoff = 0\noptimization_right_cutoff = 40\n",
        )
        .unwrap();
        let input = crate::io::read_parameter_file(&params, &ParameterSchema::default()).unwrap();
        let grid = SyntheticGrid {
            t_min: 0.0,
            t_max: 40.0,
            step: 1.0,
            noise_sigma: 0.0,
            seed: 1,
        };
        let series = generate(&TunableParameters::new(0.5, 10.0, 20.0, 50.0), &input.aux.with_candidate(10.0, 0.0), &grid).unwrap();
        write_series_csv(&data, &series).unwrap();

        let cli = Cli::parse_from([
            "satfit",
            "fit",
            "--yes",
            "--no-plot",
            "--params",
            params.to_str().unwrap(),
            "--data",
            data.to_str().unwrap(),
            "--output",
            output.to_str().unwrap(),
            "--trace",
            trace.to_str().unwrap(),
        ]);
        let Command::Fit(args) = cli.command else {
            panic!("expected fit");
        };
        handle_fit(args).unwrap();

        let body = std::fs::read_to_string(&trace).unwrap();
        // Header plus candidates dt = 9, 10, 11.
        assert_eq!(body.lines().count(), 4);
        assert!(output.exists());
    }
}
