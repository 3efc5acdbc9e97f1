//! Curve fitting.
//!
//! Responsibilities:
//!
//! - Levenberg–Marquardt minimisation (`lm`)
//! - the resonance fit engine with its fallback policy (`fitter`)
//! - per-cohort fitting, optionally in parallel (`cohort`)

pub mod cohort;
pub mod fitter;
pub mod lm;

pub use cohort::*;
pub use fitter::*;
pub use lm::*;
