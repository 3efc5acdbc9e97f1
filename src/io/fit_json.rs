//! Read/write fit JSON files.
//!
//! Fit JSON is the "portable" representation of a cohort fit:
//! - outcome status (and fallback reason, if any)
//! - parameters, R², optimum, standard errors
//! - the observations that were fitted
//! - a precomputed curve grid for quick plotting
//!
//! The schema is defined by `domain::FitFile`.

use std::fs::File;
use std::path::Path;

use chrono::Utc;

use crate::domain::{CohortFit, CurveGrid, FitFile, FitOutcome};
use crate::error::AppError;
use crate::models::sample_curve;

/// Grid resolution of the saved curve.
const GRID_POINTS: usize = 101;

/// Build the serializable form of a cohort fit.
pub fn to_fit_file(fit: &CohortFit) -> FitFile {
    let params = fit.outcome.params();
    let (x0, x1) = grid_range(fit);
    let (x, y): (Vec<f64>, Vec<f64>) = sample_curve(&params, x0, x1, GRID_POINTS).into_iter().unzip();

    let std_errors = match &fit.outcome {
        FitOutcome::Converged(c) => c.std_errors(),
        FitOutcome::Fallback(_) => None,
    };

    FitFile {
        tool: env!("CARGO_PKG_NAME").to_string(),
        generated_at: Utc::now(),
        system_size: fit.size,
        status: fit.outcome.status(),
        fallback_reason: fit.outcome.fallback_reason(),
        params,
        std_errors,
        r_squared: fit.outcome.r_squared(),
        optimum: fit.outcome.optimum(),
        observations: fit.observations.clone(),
        grid: CurveGrid { x, y },
    }
}

/// Write a fit JSON file.
pub fn write_fit_json(path: &Path, fit: &CohortFit) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::io(format!("Failed to create fit JSON '{}': {e}", path.display())))?;
    serde_json::to_writer_pretty(file, &to_fit_file(fit))
        .map_err(|e| AppError::io(format!("Failed to write fit JSON: {e}")))?;
    Ok(())
}

/// Read a fit JSON file.
pub fn read_fit_json(path: &Path) -> Result<FitFile, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::io(format!("Failed to open fit JSON '{}': {e}", path.display())))?;
    let fit: FitFile =
        serde_json::from_reader(file).map_err(|e| AppError::io(format!("Invalid fit JSON: {e}")))?;
    if fit.grid.x.len() != fit.grid.y.len() {
        return Err(AppError::io("Invalid fit JSON: grid x/y lengths differ."));
    }
    Ok(fit)
}

/// From zero to a little past the largest stimulus (or the optimum, if further out).
fn grid_range(fit: &CohortFit) -> (f64, f64) {
    let x_max = fit
        .observations
        .iter()
        .map(|o| o.x)
        .fold(fit.outcome.optimum().location, f64::max);
    let x_min = fit.observations.iter().map(|o| o.x).fold(0.0, f64::min);
    if x_max > x_min {
        (x_min, x_max * 1.1)
    } else {
        (x_min, x_min + 1.0)
    }
}
