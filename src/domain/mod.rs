//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - result-file records (`ResultRecord`, `ResultsFile`, `SystemSize`)
//! - fit-engine inputs and outputs (`Observation`, `ResonanceParams`, `FitOutcome`)
//! - run configuration and the exported fit schema (`RunConfig`, `FitFile`)

pub mod types;

pub use types::*;
