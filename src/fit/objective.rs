//! Sum-of-squares objective and its exact gradient.
//!
//! Both are built as closures that borrow the data `(X, Y)` and the auxiliary
//! constants. They hold no other state, so repeated calls with the same
//! parameters return identical results.
//!
//! [`Objective`] bundles the same borrowed data and plugs it into argmin's
//! `CostFunction` / `Gradient` traits for the BFGS stage. The argmin adapter
//! reports non-finite values as errors so a diverging line search stops
//! instead of iterating on NaNs. [`ResidualProblem`] is the least-squares
//! view of the same data for the Levenberg–Marquardt stage.

use argmin::core::{CostFunction, Error as ArgminError, Gradient};
use levenberg_marquardt::LeastSquaresProblem;
use nalgebra::{DVector, Dyn, OMatrix, Owned, U4, Vector4};

use crate::domain::{AuxParameters, TunableParameters};
use crate::models::{gradient_at, value_at};

/// `Σ (Y_i - M(X_i))²`.
pub fn loss(x: &[f64], y: &[f64], params: &TunableParameters, aux: &AuxParameters) -> f64 {
    x.iter()
        .zip(y.iter())
        .map(|(&xi, &yi)| {
            let r = yi - value_at(xi, params, aux);
            r * r
        })
        .sum()
}

/// Residuals `Y_i - M(X_i)`.
pub fn residuals(x: &[f64], y: &[f64], params: &TunableParameters, aux: &AuxParameters) -> Vec<f64> {
    x.iter()
        .zip(y.iter())
        .map(|(&xi, &yi)| yi - value_at(xi, params, aux))
        .collect()
}

/// Gradient of [`loss`]: `Σ [-2·Y_i·∂M/∂p + 2·M(X_i)·∂M/∂p]` for each parameter.
pub fn loss_gradient(x: &[f64], y: &[f64], params: &TunableParameters, aux: &AuxParameters) -> [f64; 4] {
    let mut out = [0.0; 4];
    for (&xi, &yi) in x.iter().zip(y.iter()) {
        let m = value_at(xi, params, aux);
        let dm = gradient_at(xi, params, aux);
        for (o, d) in out.iter_mut().zip(dm.iter()) {
            *o += -2.0 * yi * d + 2.0 * m * d;
        }
    }
    out
}

/// Objective closure over fixed data.
pub fn build_objective<'a>(
    x: &'a [f64],
    y: &'a [f64],
    aux: &'a AuxParameters,
) -> impl Fn(&TunableParameters) -> f64 + 'a {
    move |params| loss(x, y, params, aux)
}

/// Gradient closure over fixed data.
pub fn build_gradient<'a>(
    x: &'a [f64],
    y: &'a [f64],
    aux: &'a AuxParameters,
) -> impl Fn(&TunableParameters) -> [f64; 4] + 'a {
    move |params| loss_gradient(x, y, params, aux)
}

/// Borrowed fitting problem for one `(dt, cvert)` candidate.
#[derive(Debug, Clone, Copy)]
pub struct Objective<'a> {
    pub x: &'a [f64],
    pub y: &'a [f64],
    pub aux: &'a AuxParameters,
}

impl<'a> Objective<'a> {
    pub fn new(x: &'a [f64], y: &'a [f64], aux: &'a AuxParameters) -> Self {
        Self { x, y, aux }
    }

    pub fn loss(&self, params: &TunableParameters) -> f64 {
        loss(self.x, self.y, params, self.aux)
    }

    pub fn gradient(&self, params: &TunableParameters) -> [f64; 4] {
        loss_gradient(self.x, self.y, params, self.aux)
    }

    pub fn residuals(&self, params: &TunableParameters) -> Vec<f64> {
        residuals(self.x, self.y, params, self.aux)
    }
}

fn unpack(p: &[f64]) -> Result<TunableParameters, ArgminError> {
    TunableParameters::from_slice(p).ok_or_else(|| {
        ArgminError::msg(format!(
            "expected {} parameters, got {}",
            TunableParameters::LEN,
            p.len()
        ))
    })
}

impl CostFunction for Objective<'_> {
    type Param = Vec<f64>;
    type Output = f64;

    fn cost(&self, p: &Self::Param) -> Result<Self::Output, ArgminError> {
        let c = self.loss(&unpack(p)?);
        if c.is_finite() {
            Ok(c)
        } else {
            Err(ArgminError::msg(format!("non-finite loss at {p:?}")))
        }
    }
}

impl Gradient for Objective<'_> {
    type Param = Vec<f64>;
    type Gradient = Vec<f64>;

    fn gradient(&self, p: &Self::Param) -> Result<Self::Gradient, ArgminError> {
        let g = Objective::gradient(self, &unpack(p)?);
        if g.iter().all(|v| v.is_finite()) {
            Ok(g.to_vec())
        } else {
            Err(ArgminError::msg(format!("non-finite gradient at {p:?}")))
        }
    }
}

/// Residuals `Y - M(X, p)` and their Jacobian `-∂M/∂p` (`n × 4`) as a
/// `levenberg_marquardt` problem.
///
/// Non-finite residuals or Jacobian entries are reported as `None`, which
/// makes the solver stop.
pub struct ResidualProblem<'a> {
    objective: Objective<'a>,
    params: Vector4<f64>,
}

impl<'a> ResidualProblem<'a> {
    pub fn new(objective: Objective<'a>, seed: TunableParameters) -> Self {
        Self {
            objective,
            params: Vector4::from(seed.to_array()),
        }
    }

    pub fn parameters(&self) -> TunableParameters {
        TunableParameters::new(self.params[0], self.params[1], self.params[2], self.params[3])
    }
}

impl LeastSquaresProblem<f64, Dyn, U4> for ResidualProblem<'_> {
    type ResidualStorage = Owned<f64, Dyn>;
    type JacobianStorage = Owned<f64, Dyn, U4>;
    type ParameterStorage = Owned<f64, U4>;

    fn set_params(&mut self, p: &Vector4<f64>) {
        self.params.copy_from(p);
    }

    fn params(&self) -> Vector4<f64> {
        self.params
    }

    fn residuals(&self) -> Option<DVector<f64>> {
        let r = self.objective.residuals(&self.parameters());
        r.iter().all(|v| v.is_finite()).then(|| DVector::from_vec(r))
    }

    fn jacobian(&self) -> Option<OMatrix<f64, Dyn, U4>> {
        let p = self.parameters();
        let mut jac = OMatrix::<f64, Dyn, U4>::zeros(self.objective.x.len());
        for (row, &t) in self.objective.x.iter().enumerate() {
            for (col, d) in gradient_at(t, &p, self.objective.aux).iter().enumerate() {
                jac[(row, col)] = -d;
            }
        }
        jac.iter().all(|v| v.is_finite()).then_some(jac)
    }
}
