//! `satfit` library crate.
//!
//! The binary (`satfit`) is a thin wrapper around this library so that:
//!
//! - core logic is testable without spawning processes
//! - the fitting pipeline can be driven directly from tests or other tools

pub mod app;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod fit;
pub mod io;
pub mod logging;
pub mod models;
pub mod plot;
pub mod report;
