//! Stochastic-resonance model implementation.
//!
//! The model is implemented as small, pure functions so that fitting and
//! plotting code can share it.

pub mod model;

pub use model::*;
