//! Fitting pipeline.
//!
//! - `objective`: sum-of-squares loss and gradient over fixed data
//! - `optimizer`: BFGS followed by Levenberg–Marquardt for one candidate
//! - `search`: outer search over `(dt, cvert)` candidates (parallel)
//! - `asymptote`: where the fitted curve flattens

pub mod asymptote;
pub mod objective;
pub mod optimizer;
pub mod search;

pub use asymptote::*;
pub use objective::*;
pub use optimizer::*;
pub use search::*;
