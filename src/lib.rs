//! `phi-figures` library crate.
//!
//! The binary (`phifig`) is a thin wrapper around this library so that:
//!
//! - the fit engine is testable without spawning processes
//! - figures and exports can be produced from other tools
//! - code stays easy to navigate as the project grows

pub mod app;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod fit;
pub mod io;
pub mod math;
pub mod models;
pub mod plot;
pub mod report;
