//! Saturation model: relaxation × logistic gate + linear drift.
//!
//! ```text
//! value(t)      = relaxation(t) * gate(t) + drift(t)
//! relaxation(t) = -( (1/K1)·(1 - exp(-(t-dt)/(N0/K1))) + (t-dt)/N1 )
//! gate(t)       = 1 / (1 + c3·exp(-r·(t-dt)))
//! drift(t)      = (t-dt)/N2 + cvert
//! ```
//!
//! The fitter relies on two primitive operations:
//! - predict the curve at a set of times (for residuals/plots)
//! - the analytic Jacobian with respect to `{K1, N0, N1, N2}` (for BFGS and LM)
//!
//! Degenerate inputs (K1 or N_i equal to zero) are not special-cased; they
//! produce infinities/NaNs which the optimizer and search tolerate.

use nalgebra::DMatrix;

use crate::domain::{AuxParameters, TunableParameters};

/// Viscoelastic relaxation term.
pub fn relaxation(t: f64, p: &TunableParameters, aux: &AuxParameters) -> f64 {
    let s = t - aux.dt;
    let tau = p.n0 / p.k1;
    -((1.0 / p.k1) * (1.0 - (-s / tau).exp()) + s / p.n1)
}

/// Logistic switch centred on `dt`.
pub fn gate(t: f64, aux: &AuxParameters) -> f64 {
    1.0 / (1.0 + aux.c3 * (-aux.r * (t - aux.dt)).exp())
}

/// Steady-state drift.
pub fn drift(t: f64, p: &TunableParameters, aux: &AuxParameters) -> f64 {
    (t - aux.dt) / p.n2 + aux.cvert
}

/// Model value at a single time.
pub fn value_at(t: f64, p: &TunableParameters, aux: &AuxParameters) -> f64 {
    relaxation(t, p, aux) * gate(t, aux) + drift(t, p, aux)
}

/// Model value at each time.
pub fn evaluate(times: &[f64], p: &TunableParameters, aux: &AuxParameters) -> Vec<f64> {
    times.iter().map(|&t| value_at(t, p, aux)).collect()
}

/// Partial derivatives `[∂/∂K1, ∂/∂N0, ∂/∂N1, ∂/∂N2]` at a single time.
pub fn gradient_at(t: f64, p: &TunableParameters, aux: &AuxParameters) -> [f64; 4] {
    let s = t - aux.dt;
    let g = gate(t, aux);
    // exp(-(t-dt)/(N0/K1)) written as exp(-s·K1/N0)
    let e = (-s * p.k1 / p.n0).exp();

    let d_k1 = g * ((1.0 - e) / (p.k1 * p.k1) - s * e / (p.k1 * p.n0));
    let d_n0 = g * (s * e / (p.n0 * p.n0));
    let d_n1 = g * (s / (p.n1 * p.n1));
    let d_n2 = -s / (p.n2 * p.n2);

    [d_k1, d_n0, d_n1, d_n2]
}

/// Jacobian of [`evaluate`]: a `4 × times.len()` matrix, one row per parameter.
pub fn gradient(times: &[f64], p: &TunableParameters, aux: &AuxParameters) -> DMatrix<f64> {
    let mut out = DMatrix::<f64>::zeros(TunableParameters::LEN, times.len());
    for (j, &t) in times.iter().enumerate() {
        let g = gradient_at(t, p, aux);
        for (i, v) in g.iter().enumerate() {
            out[(i, j)] = *v;
        }
    }
    out
}
