//! Two-stage optimizer for a single `(dt, cvert)` candidate.
//!
//! Stage 1 ([`BfgsStage`]) runs argmin's BFGS with the analytic gradient to land
//! in a good basin. Stage 2 ([`LevenbergMarquardtStage`]) polishes that point
//! with the `levenberg_marquardt` solver on the raw residual vector. Stage 2 is
//! always seeded with stage 1's output.
//!
//! Both stages implement [`FitStage`] so either can be swapped independently.
//! Neither stage treats non-convergence as an error: whatever parameters come
//! out are used, and a diverged fit simply reports a non-finite loss.

use std::sync::{Arc, Mutex};

use argmin::core::observers::{Observe, ObserverMode};
use argmin::core::{Error as ArgminError, Executor, KV, State, TerminationReason, TerminationStatus};
use argmin::solver::linesearch::MoreThuenteLineSearch;
use argmin::solver::quasinewton::BFGS;
use levenberg_marquardt::LevenbergMarquardt;
use tracing::{debug, trace};

use crate::domain::{AuxParameters, FitResult, TunableParameters};
use crate::fit::objective::{Objective, ResidualProblem};

/// Iteration cap for the BFGS stage.
pub const DEFAULT_MAX_ITER: u64 = 5000;

/// Settings for the `levenberg_marquardt` solver.
///
/// Defaults follow MINPACK's `lmder` as driven by a typical `leastsq` call:
/// `ftol = xtol = 1.49012e-8`, `gtol = 0`, a step bound factor of 100 and at
/// most `200·(n+1)` residual evaluations.
#[derive(Debug, Clone)]
pub struct LmConfig {
    pub ftol: f64,
    pub xtol: f64,
    pub gtol: f64,
    pub stepbound: f64,
    /// Evaluation budget is `patience·(n+1)` for `n` parameters.
    pub patience: usize,
}

impl Default for LmConfig {
    fn default() -> Self {
        Self {
            ftol: 1.49012e-8,
            xtol: 1.49012e-8,
            gtol: 0.0,
            stepbound: 100.0,
            patience: 200,
        }
    }
}

/// Optimizer configuration.
#[derive(Debug, Clone)]
pub struct OptimizerConfig {
    /// Maximum BFGS iterations. Tolerances stay at argmin's defaults.
    pub max_iter: u64,
    /// Levenberg–Marquardt refinement settings.
    pub lm: LmConfig,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            max_iter: DEFAULT_MAX_ITER,
            lm: LmConfig::default(),
        }
    }
}

/// What a stage hands to the next one.
#[derive(Debug, Clone, Copy)]
pub struct StageOutcome {
    pub parameters: TunableParameters,
    pub iterations: u64,
    pub converged: bool,
}

impl StageOutcome {
    fn unchanged(seed: TunableParameters) -> Self {
        Self {
            parameters: seed,
            iterations: 0,
            converged: false,
        }
    }
}

/// One step of the fitting pipeline.
pub trait FitStage: Send + Sync {
    fn name(&self) -> &'static str;

    /// Improve `seed` against `objective`. Must not fail: on trouble, return
    /// the best parameters available (possibly `seed` itself).
    fn run(&self, objective: &Objective<'_>, seed: TunableParameters) -> StageOutcome;
}

/// Quasi-Newton minimization of the sum of squares (argmin BFGS + More–Thuente).
#[derive(Debug, Clone)]
pub struct BfgsStage {
    pub max_iter: u64,
}

impl Default for BfgsStage {
    fn default() -> Self {
        Self {
            max_iter: DEFAULT_MAX_ITER,
        }
    }
}

/// Observer recording argmin's best iterate after every completed iteration.
///
/// `Executor::run` drops its state when a step errors, so this is the only
/// way to recover the progress made before the failing line search.
#[derive(Clone, Default)]
struct BestIterate(Arc<Mutex<Option<(Vec<f64>, u64)>>>);

impl BestIterate {
    fn get(&self) -> Option<(TunableParameters, u64)> {
        let slot = self.0.lock().ok()?;
        let (param, iter) = slot.as_ref()?;
        TunableParameters::from_slice(param)
            .filter(TunableParameters::is_finite)
            .map(|p| (p, *iter))
    }
}

impl<I: State<Param = Vec<f64>>> Observe<I> for BestIterate {
    fn observe_iter(&mut self, state: &I, _kv: &KV) -> Result<(), ArgminError> {
        if let (Some(best), Ok(mut slot)) = (state.get_best_param(), self.0.lock()) {
            *slot = Some((best.clone(), state.get_iter()));
        }
        Ok(())
    }
}

impl FitStage for BfgsStage {
    fn name(&self) -> &'static str {
        "bfgs"
    }

    fn run(&self, objective: &Objective<'_>, seed: TunableParameters) -> StageOutcome {
        // argmin's line search has no guard against NaN costs, so never start it there.
        if !objective.loss(&seed).is_finite() {
            debug!(stage = self.name(), "non-finite loss at seed; skipping");
            return StageOutcome::unchanged(seed);
        }

        let linesearch: MoreThuenteLineSearch<Vec<f64>, Vec<f64>, f64> = MoreThuenteLineSearch::new();
        let solver: BFGS<_, f64> = BFGS::new(linesearch);
        let init_inv_hessian = identity(TunableParameters::LEN);
        let best_iterate = BestIterate::default();

        let res = Executor::new(*objective, solver)
            .configure(|state| {
                state
                    .param(seed.to_vec())
                    .inv_hessian(init_inv_hessian)
                    .max_iters(self.max_iter)
            })
            .add_observer(best_iterate.clone(), ObserverMode::Always)
            .run();

        match res {
            Ok(res) => {
                let state = res.state();
                let iterations = state.get_iter();
                let status = state.get_termination_status();
                let converged = matches!(
                    status,
                    TerminationStatus::Terminated(TerminationReason::SolverConverged)
                );
                trace!(stage = self.name(), iterations, ?status, "stage finished");

                let best = state
                    .get_best_param()
                    .and_then(|p| TunableParameters::from_slice(p))
                    .filter(TunableParameters::is_finite);
                match best {
                    Some(parameters) => StageOutcome {
                        parameters,
                        iterations,
                        converged,
                    },
                    None => StageOutcome::unchanged(seed),
                }
            }
            Err(err) => match best_iterate.get() {
                Some((parameters, iterations)) => {
                    debug!(stage = self.name(), iterations, error = %err, "minimizer stopped early; passing best iterate on");
                    StageOutcome {
                        parameters,
                        iterations,
                        converged: false,
                    }
                }
                None => {
                    debug!(stage = self.name(), error = %err, "minimizer failed before its first iteration; passing seed on");
                    StageOutcome::unchanged(seed)
                }
            },
        }
    }
}

fn identity(n: usize) -> Vec<Vec<f64>> {
    (0..n)
        .map(|i| (0..n).map(|j| if i == j { 1.0 } else { 0.0 }).collect())
        .collect()
}

/// Levenberg–Marquardt refinement of the residual vector `Y - M(X, p)`.
#[derive(Debug, Clone, Default)]
pub struct LevenbergMarquardtStage {
    pub config: LmConfig,
}

impl FitStage for LevenbergMarquardtStage {
    fn name(&self) -> &'static str {
        "levenberg-marquardt"
    }

    fn run(&self, objective: &Objective<'_>, seed: TunableParameters) -> StageOutcome {
        if objective.x.len() < TunableParameters::LEN {
            debug!(stage = self.name(), samples = objective.x.len(), "fewer samples than parameters; skipping");
            return StageOutcome::unchanged(seed);
        }

        let solver = LevenbergMarquardt::new()
            .with_ftol(self.config.ftol)
            .with_xtol(self.config.xtol)
            .with_gtol(self.config.gtol)
            .with_stepbound(self.config.stepbound)
            .with_patience(self.config.patience);
        let (problem, report) = solver.minimize(ResidualProblem::new(*objective, seed));

        let fitted = problem.parameters();
        let seed_loss = objective.loss(&seed);
        let loss = objective.loss(&fitted);
        trace!(
            stage = self.name(),
            evaluations = report.number_of_evaluations,
            termination = ?report.termination,
            loss,
            "stage finished"
        );

        // A run aborted on a non-finite trial point can leave the problem there.
        let keep = fitted.is_finite() && loss.is_finite() && (!seed_loss.is_finite() || loss <= seed_loss);
        StageOutcome {
            parameters: if keep { fitted } else { seed },
            iterations: report.number_of_evaluations as u64,
            converged: keep && report.termination.was_successful(),
        }
    }
}

/// Minimizer followed by refiner.
#[derive(Debug, Clone)]
pub struct Optimizer<A = BfgsStage, B = LevenbergMarquardtStage> {
    pub minimizer: A,
    pub refiner: B,
}

impl Optimizer {
    pub fn new(config: &OptimizerConfig) -> Self {
        Self {
            minimizer: BfgsStage {
                max_iter: config.max_iter,
            },
            refiner: LevenbergMarquardtStage {
                config: config.lm.clone(),
            },
        }
    }
}

impl Default for Optimizer {
    fn default() -> Self {
        Self::new(&OptimizerConfig::default())
    }
}

impl<A: FitStage, B: FitStage> Optimizer<A, B> {
    pub fn with_stages(minimizer: A, refiner: B) -> Self {
        Self { minimizer, refiner }
    }

    /// Fit the tunable parameters to `(x, y)` for fixed `aux`, starting from `guess`.
    ///
    /// The returned loss is recomputed from the final parameters and may be
    /// non-finite if the fit diverged.
    pub fn fit(&self, x: &[f64], y: &[f64], aux: &AuxParameters, guess: &TunableParameters) -> FitResult {
        let objective = Objective::new(x, y, aux);

        let first = self.minimizer.run(&objective, *guess);
        let second = self.refiner.run(&objective, first.parameters);
        let loss = objective.loss(&second.parameters);

        debug!(
            dt = aux.dt,
            cvert = aux.cvert,
            loss,
            first_iters = first.iterations,
            second_iters = second.iterations,
            converged = second.converged,
            "candidate fit"
        );

        FitResult {
            parameters: second.parameters,
            loss,
        }
    }
}
