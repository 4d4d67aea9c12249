//! Outer search over `(dt, cvert)` candidates.
//!
//! Every sample in the dt window is a possible transition point: its time is
//! tried as `dt` and its value as `cvert`. Large windows are down-sampled to a
//! fixed number of evenly strided candidates.
//!
//! Candidates are fitted independently (optionally in parallel), collected in
//! index order, and then reduced sequentially so tie-breaking never depends on
//! thread scheduling.

use rayon::prelude::*;
use tracing::{debug, info};

use crate::domain::{AuxParameters, FitResult, Sample, SearchTrace, Series, TunableParameters};
use crate::error::AppError;
use crate::fit::optimizer::{FitStage, Optimizer};

/// Upper bound on candidates tried per run.
pub const DEFAULT_MAX_CANDIDATES: usize = 200;

#[derive(Debug, Clone)]
pub struct SearchOptions {
    pub max_candidates: usize,
    /// Fit candidates on rayon's pool.
    pub parallel: bool,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            max_candidates: DEFAULT_MAX_CANDIDATES,
            parallel: true,
        }
    }
}

/// Best candidate plus the full per-candidate trace.
#[derive(Debug, Clone)]
pub struct SearchOutcome {
    pub best: FitResult,
    /// Position of the winner in the candidate list.
    pub best_index: usize,
    pub dt: f64,
    pub cvert: f64,
    pub trace: SearchTrace,
    pub candidates: usize,
}

impl SearchOutcome {
    /// Auxiliary constants with the winning `(dt, cvert)` filled in.
    pub fn aux(&self, base: &AuxParameters) -> AuxParameters {
        base.with_candidate(self.dt, self.cvert)
    }
}

/// Indices kept when down-sampling `n` items to at most `cap`.
///
/// With `n > cap`, `stride = (n - 1) / cap` and the indices are `0, stride,
/// 2·stride, …` (`cap` of them). Otherwise every index is kept.
pub fn candidate_indices(n: usize, cap: usize) -> Vec<usize> {
    if n <= cap {
        return (0..n).collect();
    }
    let stride = ((n - 1) / cap).max(1);
    (0..cap).map(|i| i * stride).collect()
}

/// Samples of the dt window that become `(dt, cvert)` candidates.
pub fn downsample_candidates(window: &Series, cap: usize) -> Vec<Sample> {
    candidate_indices(window.len(), cap)
        .into_iter()
        .map(|i| window.samples[i])
        .collect()
}

/// Fit every candidate and keep the lowest finite loss.
///
/// The first finite loss becomes the running best; later candidates replace
/// it only with a strictly smaller loss, so ties keep the earlier index.
pub fn search<A: FitStage, B: FitStage>(
    window: &Series,
    candidates: &[Sample],
    aux: &AuxParameters,
    guess: &TunableParameters,
    optimizer: &Optimizer<A, B>,
    opts: &SearchOptions,
) -> Result<SearchOutcome, AppError> {
    if window.is_empty() {
        return Err(AppError::data("Optimization window contains no samples."));
    }
    if candidates.is_empty() {
        return Err(AppError::data("dt window contains no samples."));
    }

    let x = window.times();
    let y = window.values();

    let fit_one = |c: &Sample| {
        let candidate_aux = aux.with_candidate(c.time, c.value);
        optimizer.fit(&x, &y, &candidate_aux, guess)
    };

    let fits: Vec<FitResult> = if opts.parallel {
        candidates.par_iter().map(fit_one).collect()
    } else {
        candidates.iter().map(fit_one).collect()
    };

    let mut trace = SearchTrace::default();
    let mut best: Option<(usize, FitResult)> = None;

    for (idx, (c, fit)) in candidates.iter().zip(fits.iter()).enumerate() {
        trace.push(c.time, fit.loss);

        if !fit.loss.is_finite() {
            debug!(idx, dt = c.time, loss = fit.loss, "candidate diverged");
            continue;
        }
        let improves = match &best {
            None => true,
            Some((_, b)) => fit.loss < b.loss,
        };
        if improves {
            info!(idx, dt = c.time, cvert = c.value, loss = fit.loss, "new best candidate");
            best = Some((idx, *fit));
        }
    }

    let Some((best_index, best)) = best else {
        return Err(AppError::fit(format!(
            "No candidate produced a finite loss ({} tried).",
            candidates.len()
        )));
    };

    let winner = candidates[best_index];
    Ok(SearchOutcome {
        best,
        best_index,
        dt: winner.time,
        cvert: winner.value,
        trace,
        candidates: candidates.len(),
    })
}
