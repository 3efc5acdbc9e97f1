//! Input/output helpers.
//!
//! - fit JSON read/write (`fit_json`)
//! - per-cohort summary CSV (`export`)

pub mod export;
pub mod fit_json;

pub use export::*;
pub use fit_json::*;
