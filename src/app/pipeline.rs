//! Shared fit pipeline: trim -> candidate selection -> search -> asymptote -> bt.
//!
//! Takes already-validated parameters and already-loaded data, so it never
//! touches the filesystem or the terminal. The CLI layer handles both.

use tracing::info;

use crate::domain::{AuxParameters, ParameterSet, Series};
use crate::error::AppError;
use crate::fit::{
    Asymptote, Optimizer, OptimizerConfig, SearchOptions, SearchOutcome, downsample_candidates, find_asymptote,
    search,
};
use crate::models::value_at;

/// Knobs for one run.
#[derive(Debug, Clone, Default)]
pub struct FitSettings {
    pub optimizer: OptimizerConfig,
    pub search: SearchOptions,
}

/// The three trimmed views of the raw data.
#[derive(Debug, Clone)]
pub struct Windows {
    /// Samples the loss is computed on.
    pub optimization: Series,
    /// Samples shown in plots and reports.
    pub display: Series,
    /// Samples whose times are tried as `dt`.
    pub dt: Series,
}

impl Windows {
    pub fn from_series(data: &Series, aux: &AuxParameters) -> Self {
        Self {
            optimization: data.trim(aux.optimization_left_cutoff, aux.optimization_right_cutoff),
            display: data.trim(aux.graph_left_cutoff, aux.graph_right_cutoff),
            dt: data.trim(aux.dt_min, aux.dt_max),
        }
    }
}

/// All computed outputs of a single `satfit fit` run.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub input: ParameterSet,
    pub windows: Windows,
    pub search: SearchOutcome,
    /// Auxiliary constants with the winning `dt` / `cvert`.
    pub aux: AuxParameters,
    pub asymptote: Asymptote,
    pub bt: f64,
}

impl RunOutput {
    /// Root mean squared residual over the optimization window.
    pub fn rmse(&self) -> f64 {
        let n = self.windows.optimization.len().max(1);
        (self.search.best.loss / n as f64).sqrt()
    }
}

/// Execute the full fitting pipeline.
pub fn run_fit(input: &ParameterSet, data: &Series, settings: &FitSettings) -> Result<RunOutput, AppError> {
    let windows = Windows::from_series(data, &input.aux);
    info!(
        samples = data.len(),
        optimization = windows.optimization.len(),
        display = windows.display.len(),
        dt_window = windows.dt.len(),
        "data trimmed"
    );

    if windows.optimization.is_empty() {
        return Err(AppError::data(format!(
            "Optimization window [{}, {}] contains no samples.",
            input.aux.optimization_left_cutoff, input.aux.optimization_right_cutoff
        )));
    }
    if windows.dt.is_empty() {
        return Err(AppError::data(format!(
            "dt window [{}, {}] contains no samples.",
            input.aux.dt_min, input.aux.dt_max
        )));
    }

    let candidates = downsample_candidates(&windows.dt, settings.search.max_candidates);
    info!(candidates = candidates.len(), "iterating through dt candidates");

    let optimizer = Optimizer::new(&settings.optimizer);
    let outcome = search(
        &windows.optimization,
        &candidates,
        &input.aux,
        &input.guess,
        &optimizer,
        &settings.search,
    )?;
    info!(dt = outcome.dt, cvert = outcome.cvert, loss = outcome.best.loss, "final best candidate");

    let aux = outcome.aux(&input.aux);
    let params = outcome.best.parameters;
    let asymptote = find_asymptote(&params, &aux)?;
    let bt = asymptote.value - value_at(aux.optimization_left_cutoff, &params, &aux);
    info!(dt = aux.dt, cvert = aux.cvert, bt, "fit complete");

    Ok(RunOutput {
        input: input.clone(),
        windows,
        search: outcome,
        aux,
        asymptote,
        bt,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TunableParameters;
    use crate::error::EXIT_DATA;

    fn input() -> ParameterSet {
        ParameterSet {
            guess: TunableParameters::new(0.5, 10.0, 20.0, 50.0),
            aux: AuxParameters {
                dt: 0.0,
                cvert: 0.0,
                c3: 1.0,
                r: 1.0,
                dt_min: 0.0,
                dt_max: 20.0,
                optimization_left_cutoff: 0.0,
                optimization_right_cutoff: 100.0,
                graph_left_cutoff: 10.0,
                graph_right_cutoff: 30.0,
            },
        }
    }

    #[test]
    fn windows_are_trimmed_independently() {
        let times: Vec<f64> = (0..=100).map(|i| i as f64).collect();
        let data = Series::from_columns(&times, &times);
        let w = Windows::from_series(&data, &input().aux);
        assert_eq!(w.optimization.len(), 101);
        assert_eq!(w.display.len(), 21);
        assert_eq!(w.dt.len(), 21);
    }

    #[test]
    fn empty_dt_window_is_a_data_error() {
        let mut input = input();
        input.aux.dt_min = 500.0;
        input.aux.dt_max = 600.0;
        let data = Series::from_columns(&[0.0, 1.0, 2.0], &[0.0, 0.0, 0.0]);
        let err = run_fit(&input, &data, &FitSettings::default()).unwrap_err();
        assert_eq!(err.exit_code(), EXIT_DATA);
    }

    #[test]
    fn empty_optimization_window_is_a_data_error() {
        let mut input = input();
        input.aux.optimization_left_cutoff = 500.0;
        input.aux.optimization_right_cutoff = 600.0;
        let data = Series::from_columns(&[0.0, 1.0, 2.0], &[0.0, 0.0, 0.0]);
        let err = run_fit(&input, &data, &FitSettings::default()).unwrap_err();
        assert_eq!(err.exit_code(), EXIT_DATA);
    }
}
