//! Formatted terminal output for fits.

pub mod format;

pub use format::*;
