//! Reporting: terminal summary and the JSON report model.
//!
//! Formatting lives here so the fitting code stays free of presentation
//! concerns and output changes stay localized.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::app::pipeline::RunOutput;
use crate::domain::{AuxParameters, TUNED_PARAM_NAMES, TunableParameters};
use crate::fit::Asymptote;
use crate::models::evaluate;

/// Points in the fitted-curve grid of the JSON report.
pub const REPORT_GRID_POINTS: usize = 101;

/// Search statistics included in the report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchStats {
    pub candidates: usize,
    pub best_index: usize,
    pub optimization_samples: usize,
    pub display_samples: usize,
    pub dt_window_samples: usize,
}

/// Evenly spaced samples of the fitted curve.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurveGrid {
    pub time: Vec<f64>,
    pub value: Vec<f64>,
}

/// Portable summary of one run, written with `--report`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FitReport {
    pub tool: String,
    pub generated_at: DateTime<Utc>,
    pub initial_guess: TunableParameters,
    pub parameters: TunableParameters,
    pub aux: AuxParameters,
    pub loss: f64,
    pub rmse: f64,
    pub bt: f64,
    pub asymptote: Asymptote,
    pub search: SearchStats,
    pub grid: CurveGrid,
}

pub fn build_fit_report(run: &RunOutput) -> FitReport {
    // Fall back to the optimization window when the display window is empty.
    let range = run
        .windows
        .display
        .time_range()
        .or_else(|| run.windows.optimization.time_range())
        .unwrap_or((run.aux.graph_left_cutoff, run.aux.graph_right_cutoff));
    let time = grid_times(range.0, range.1, REPORT_GRID_POINTS);
    let value = evaluate(&time, &run.search.best.parameters, &run.aux);

    FitReport {
        tool: "satfit".to_string(),
        generated_at: Utc::now(),
        initial_guess: run.input.guess,
        parameters: run.search.best.parameters,
        aux: run.aux,
        loss: run.search.best.loss,
        rmse: run.rmse(),
        bt: run.bt,
        asymptote: run.asymptote,
        search: SearchStats {
            candidates: run.search.candidates,
            best_index: run.search.best_index,
            optimization_samples: run.windows.optimization.len(),
            display_samples: run.windows.display.len(),
            dt_window_samples: run.windows.dt.len(),
        },
        grid: CurveGrid { time, value },
    }
}

fn grid_times(t0: f64, t1: f64, n: usize) -> Vec<f64> {
    let n = n.max(2);
    let (t0, t1) = if (t1 - t0).abs() < 1e-9 { (t0 - 0.5, t1 + 0.5) } else { (t0, t1) };
    (0..n)
        .map(|i| t0 + (t1 - t0) * i as f64 / (n as f64 - 1.0))
        .collect()
}

/// Format the run summary printed after a fit.
pub fn format_run_summary(run: &RunOutput) -> String {
    let mut out = String::new();

    out.push_str("=== satfit - saturation curve fit ===\n");
    out.push_str(&format!(
        "Samples: optimization={} | display={} | dt window={}\n",
        run.windows.optimization.len(),
        run.windows.display.len(),
        run.windows.dt.len()
    ));
    out.push_str(&format!(
        "Search: {} candidates, best #{}\n",
        run.search.candidates, run.search.best_index
    ));
    out.push_str(&format!(
        "Loss: SSE={:.6e} RMSE={:.6e}\n",
        run.search.best.loss,
        run.rmse()
    ));

    out.push_str("\nFitted parameters:\n");
    for (name, v) in TUNED_PARAM_NAMES.iter().zip(run.search.best.parameters.to_array()) {
        out.push_str(&format!("  {:<3} = {v}\n", name.to_ascii_uppercase()));
    }

    out.push_str(&format!(
        "\nAsymptote: {:?} at t={} (step {}) value={:.6}\n",
        run.asymptote.kind, run.asymptote.time, run.asymptote.step, run.asymptote.value
    ));
    out.push_str(&format!(
        "dt = {:.2} cvert = {:.2} bt = {:.2}\n",
        run.aux.dt, run.aux.cvert, run.bt
    ));

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grid_spans_both_ends() {
        let g = grid_times(10.0, 20.0, REPORT_GRID_POINTS);
        assert_eq!(g.len(), 101);
        assert_eq!(g[0], 10.0);
        assert_eq!(g[100], 20.0);
        assert!((g[50] - 15.0).abs() < 1e-12);
    }

    #[test]
    fn degenerate_grid_is_widened() {
        let g = grid_times(5.0, 5.0, 3);
        assert_eq!(g, vec![4.5, 5.0, 5.5]);
    }
}
