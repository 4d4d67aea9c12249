//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - the fitted and auxiliary parameter sets (`TunableParameters`, `AuxParameters`)
//! - observations (`Sample`, `Series`)
//! - fit outputs (`FitResult`, `SearchTrace`)

pub mod types;

pub use types::*;
