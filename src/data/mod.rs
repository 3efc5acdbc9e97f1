//! Data sources: the experiment results file and a synthetic generator.

pub mod results;
pub mod sample;

pub use results::*;
pub use sample::{SynthConfig, generate_results};
