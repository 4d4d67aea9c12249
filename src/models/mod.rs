//! Saturation model implementation.
//!
//! The model is implemented as small, pure functions so that fitting/search code can
//! stay generic over the data it is fed.

pub mod saturation;

pub use saturation::*;
