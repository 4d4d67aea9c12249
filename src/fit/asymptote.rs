//! Asymptote detection on a fitted curve.
//!
//! Walks the curve at integer multiples of `dt` and stops where the second
//! forward difference has flattened to 1% of its value at the transition.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::{AuxParameters, TunableParameters};
use crate::error::AppError;
use crate::models::value_at;

/// Multiples of `dt` tried before giving up.
pub const MAX_STEPS: usize = 100;
/// Fraction of the reference second difference treated as flat.
pub const FLATNESS_RATIO: f64 = 0.01;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AsymptoteKind {
    /// Curve still decreasing; the asymptote is the curve value itself.
    Regular,
    /// Curve rising linearly; the asymptote is the tangent line's intercept at time 0.
    Inverse,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Asymptote {
    /// Multiple of `dt` where the curve was judged flat.
    pub step: usize,
    pub time: f64,
    pub value: f64,
    /// Forward difference `f(t+1) - f(t)` at `time`.
    pub slope: f64,
    pub kind: AsymptoteKind,
}

pub fn find_asymptote(params: &TunableParameters, aux: &AuxParameters) -> Result<Asymptote, AppError> {
    let f = |t: f64| value_at(t, params, aux);
    let dt = aux.dt;

    let reference = ((f(dt) - f(dt - 1.0)) - (f(dt + 1.0) - f(dt))).abs();

    for step in 1..MAX_STEPS {
        let t = dt * step as f64;
        let d1 = f(t) - f(t - 1.0);
        let d2 = f(t + 1.0) - f(t);
        let dd = d1 - d2;

        if FLATNESS_RATIO * reference > dd.abs() {
            let (kind, value) = if d2 < 0.0 {
                (AsymptoteKind::Regular, f(t))
            } else {
                (AsymptoteKind::Inverse, f(t) - t * d2)
            };
            debug!(step, time = t, value, slope = d2, ?kind, "asymptote found");
            return Ok(Asymptote {
                step,
                time: t,
                value,
                slope: d2,
                kind,
            });
        }
    }

    Err(AppError::fit(format!(
        "No asymptote found within {} multiples of dt = {dt}.",
        MAX_STEPS - 1
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    use crate::error::EXIT_FIT;

    fn aux(dt: f64) -> AuxParameters {
        AuxParameters {
            dt,
            cvert: 2.0,
            c3: 1.0,
            r: 5.0,
            dt_min: 0.0,
            dt_max: 100.0,
            optimization_left_cutoff: 0.0,
            optimization_right_cutoff: 100.0,
            graph_left_cutoff: 0.0,
            graph_right_cutoff: 100.0,
        }
    }

    #[test]
    fn flat_tail_gives_regular_asymptote() {
        // Fast relaxation, negligible linear terms: settles at cvert - 1/K1 = 1.
        let p = TunableParameters::new(1.0, 1.0, 1e12, 1e12);
        let a = aux(10.0);
        let asym = find_asymptote(&p, &a).unwrap();

        assert_eq!(asym.step, 2);
        assert_eq!(asym.time, 20.0);
        assert_eq!(asym.kind, AsymptoteKind::Regular);
        assert_relative_eq!(asym.value, 1.0, epsilon = 1e-4);
    }

    #[test]
    fn rising_tail_gives_inverse_asymptote() {
        let p = TunableParameters::new(1.0, 1.0, 1e12, 100.0);
        let a = aux(10.0);
        let asym = find_asymptote(&p, &a).unwrap();

        assert_eq!(asym.kind, AsymptoteKind::Inverse);
        let f = |t: f64| value_at(t, &p, &a);
        let t = asym.time;
        assert_relative_eq!(asym.slope, f(t + 1.0) - f(t), epsilon = 1e-12);
        assert_relative_eq!(asym.value, f(t) - t * (f(t + 1.0) - f(t)), epsilon = 1e-12);
    }

    #[test]
    fn zero_dt_never_moves_and_fails() {
        let p = TunableParameters::new(1.0, 1.0, 1e12, 1e12);
        let err = find_asymptote(&p, &aux(0.0)).unwrap_err();
        assert_eq!(err.exit_code(), EXIT_FIT);
    }
}
