//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - used in-memory during fitting
//! - exported to JSON/CSV
//! - reloaded later for comparisons

use serde::{Deserialize, Serialize};

/// Canonical (lowercase) names of the tunable parameters, in vector order.
pub const TUNED_PARAM_NAMES: [&str; 4] = ["k1", "n0", "n1", "n2"];

/// Auxiliary keys a parameter file must provide.
pub const AUX_PARAM_KEYS: [&str; 8] = [
    "dt_min",
    "dt_max",
    "c3",
    "r",
    "graph_left_cutoff",
    "graph_right_cutoff",
    "optimization_left_cutoff",
    "optimization_right_cutoff",
];

/// The four physical constants adjusted by the fit.
///
/// All four appear as divisors in the model, so an initial guess must keep them
/// non-zero. Fitted values are unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TunableParameters {
    pub k1: f64,
    pub n0: f64,
    pub n1: f64,
    pub n2: f64,
}

impl TunableParameters {
    pub const LEN: usize = 4;

    pub fn new(k1: f64, n0: f64, n1: f64, n2: f64) -> Self {
        Self { k1, n0, n1, n2 }
    }

    pub fn from_array(values: [f64; 4]) -> Self {
        Self::new(values[0], values[1], values[2], values[3])
    }

    /// Build from a slice of exactly four values.
    pub fn from_slice(values: &[f64]) -> Option<Self> {
        match values {
            [k1, n0, n1, n2] => Some(Self::new(*k1, *n0, *n1, *n2)),
            _ => None,
        }
    }

    pub fn to_array(self) -> [f64; 4] {
        [self.k1, self.n0, self.n1, self.n2]
    }

    pub fn to_vec(self) -> Vec<f64> {
        self.to_array().to_vec()
    }

    pub fn is_finite(&self) -> bool {
        self.to_array().iter().all(|v| v.is_finite())
    }
}

/// Fixed domain constants plus the per-candidate `dt` / `cvert` pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AuxParameters {
    /// Transition time. Set per outer-search candidate.
    pub dt: f64,
    /// Baseline offset of the steady drift. Set per outer-search candidate.
    pub cvert: f64,
    pub c3: f64,
    /// Logistic steepness.
    pub r: f64,
    pub dt_min: f64,
    pub dt_max: f64,
    pub optimization_left_cutoff: f64,
    pub optimization_right_cutoff: f64,
    pub graph_left_cutoff: f64,
    pub graph_right_cutoff: f64,
}

impl AuxParameters {
    /// Copy with `dt` and `cvert` replaced by a candidate pair.
    pub fn with_candidate(&self, dt: f64, cvert: f64) -> Self {
        Self { dt, cvert, ..*self }
    }

    /// Value of one of the file-level keys (see [`AUX_PARAM_KEYS`]), plus `dt`/`cvert`.
    pub fn get(&self, key: &str) -> Option<f64> {
        let v = match key {
            "dt" => self.dt,
            "cvert" => self.cvert,
            "c3" => self.c3,
            "r" => self.r,
            "dt_min" => self.dt_min,
            "dt_max" => self.dt_max,
            "optimization_left_cutoff" => self.optimization_left_cutoff,
            "optimization_right_cutoff" => self.optimization_right_cutoff,
            "graph_left_cutoff" => self.graph_left_cutoff,
            "graph_right_cutoff" => self.graph_right_cutoff,
            _ => return None,
        };
        Some(v)
    }
}

/// One `(time, value)` observation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub time: f64,
    pub value: f64,
}

impl Sample {
    pub fn new(time: f64, value: f64) -> Self {
        Self { time, value }
    }
}

/// An ordered sequence of samples (not deduplicated).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Series {
    pub samples: Vec<Sample>,
}

impl Series {
    pub fn new(samples: Vec<Sample>) -> Self {
        Self { samples }
    }

    pub fn from_columns(times: &[f64], values: &[f64]) -> Self {
        Self::new(
            times
                .iter()
                .zip(values.iter())
                .map(|(&t, &v)| Sample::new(t, v))
                .collect(),
        )
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn times(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.time).collect()
    }

    pub fn values(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.value).collect()
    }

    /// Keep samples with `left <= time <= right`, preserving order.
    pub fn trim(&self, left: f64, right: f64) -> Series {
        Series::new(
            self.samples
                .iter()
                .filter(|s| s.time >= left && s.time <= right)
                .copied()
                .collect(),
        )
    }

    /// `(min, max)` of the time column, if the series is non-empty and finite.
    pub fn time_range(&self) -> Option<(f64, f64)> {
        let mut min_t = f64::INFINITY;
        let mut max_t = f64::NEG_INFINITY;
        for s in &self.samples {
            min_t = min_t.min(s.time);
            max_t = max_t.max(s.time);
        }
        if min_t.is_finite() && max_t.is_finite() {
            Some((min_t, max_t))
        } else {
            None
        }
    }
}

/// Output of one optimizer run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FitResult {
    pub parameters: TunableParameters,
    /// Sum of squared residuals. May be non-finite if the fit diverged.
    pub loss: f64,
}

/// One outer-search iteration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TraceEntry {
    pub dt: f64,
    pub loss: f64,
}

/// `(dt, loss)` per candidate, in candidate order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchTrace {
    pub entries: Vec<TraceEntry>,
}

impl SearchTrace {
    pub fn push(&mut self, dt: f64, loss: f64) {
        self.entries.push(TraceEntry { dt, loss });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TraceEntry> {
        self.entries.iter()
    }
}

/// Names the parameter reader accepts.
///
/// Kept as data rather than globals so callers can validate against a
/// different schema (e.g. in tests).
#[derive(Debug, Clone)]
pub struct ParameterSchema {
    /// Tunable names in vector order (`k1, n0, n1, n2`).
    pub tuned: Vec<String>,
    /// Required auxiliary keys.
    pub aux_keys: Vec<String>,
}

impl Default for ParameterSchema {
    fn default() -> Self {
        Self {
            tuned: TUNED_PARAM_NAMES.iter().map(|s| s.to_string()).collect(),
            aux_keys: AUX_PARAM_KEYS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// A validated initial guess plus auxiliary constants.
///
/// `aux.dt` / `aux.cvert` are placeholders (`0.0`) until the outer search
/// picks a candidate.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterSet {
    pub guess: TunableParameters,
    pub aux: AuxParameters,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trim_is_inclusive_and_keeps_order() {
        let s = Series::from_columns(&[3.0, 1.0, 2.0, 5.0, 4.0], &[30.0, 10.0, 20.0, 50.0, 40.0]);
        let t = s.trim(2.0, 4.0);
        assert_eq!(t.times(), vec![3.0, 2.0, 4.0]);
        assert_eq!(t.values(), vec![30.0, 20.0, 40.0]);
    }

    #[test]
    fn with_candidate_only_touches_dt_and_cvert() {
        let aux = AuxParameters {
            dt: 0.0,
            cvert: 0.0,
            c3: 1.0,
            r: 2.0,
            dt_min: 3.0,
            dt_max: 4.0,
            optimization_left_cutoff: 5.0,
            optimization_right_cutoff: 6.0,
            graph_left_cutoff: 7.0,
            graph_right_cutoff: 8.0,
        };
        let c = aux.with_candidate(10.0, -1.0);
        assert_eq!(c.dt, 10.0);
        assert_eq!(c.cvert, -1.0);
        assert_eq!(c.with_candidate(0.0, 0.0), aux);
    }

    #[test]
    fn tunable_slice_roundtrip_requires_four_values() {
        assert!(TunableParameters::from_slice(&[1.0, 2.0, 3.0]).is_none());
        let p = TunableParameters::from_slice(&[1.0, 2.0, 3.0, 4.0]).unwrap();
        assert_eq!(p.to_array(), [1.0, 2.0, 3.0, 4.0]);
    }
}
