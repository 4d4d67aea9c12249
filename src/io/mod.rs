//! Input/output helpers.
//!
//! - parameter files in and fitted parameters out (`params`)
//! - observation CSV loading (`data`)
//! - trace CSV and JSON report exports (`export`)

pub mod data;
pub mod export;
pub mod params;

pub use data::*;
pub use export::*;
pub use params::*;
