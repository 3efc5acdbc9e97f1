//! Shared pipeline logic behind the `figures` and `fit` commands.
//!
//! Keeping this in one place avoids duplicating the core workflow:
//! load results -> fit cohort(s) -> render figures / write exports
//!
//! The command handlers can then focus on presentation.

use std::path::PathBuf;

use tracing::info;

use crate::data::load_results;
use crate::domain::{CohortFit, RunConfig, SystemSize};
use crate::error::AppError;
use crate::fit::{FitOptions, fit_cohort, fit_cohorts};
use crate::io::{write_fit_json, write_summary_csv};

/// Outputs of a `figures` run.
#[derive(Debug, Clone)]
pub struct FiguresOutput {
    pub fit: CohortFit,
    pub figures: Vec<PathBuf>,
}

/// Outputs of a `fit` run.
#[derive(Debug, Clone)]
pub struct FitOutput {
    /// Fitted cohorts, smallest first; just the requested one unless `all_sizes`.
    pub fits: Vec<CohortFit>,
    primary: usize,
}

impl FitOutput {
    /// The fit of the cohort named by `RunConfig::size`.
    pub fn primary(&self) -> &CohortFit {
        &self.fits[self.primary]
    }
}

fn fit_options(config: &RunConfig) -> FitOptions {
    FitOptions {
        initial_guess: config.initial_guess,
        max_evaluations: config.max_evaluations,
    }
}

/// Load results, fit the configured cohort, and render the four figures.
pub fn run_figures(config: &RunConfig) -> Result<FiguresOutput, AppError> {
    let results = load_results(&config.input)?;
    let fit = fit_cohort(&results, config.size, &fit_options(config))?;
    let figures = crate::plot::render_all(&results, &fit, &config.out_dir, &config.style)?;
    info!(count = figures.len(), dir = %config.out_dir.display(), "figures rendered");
    Ok(FiguresOutput { fit, figures })
}

/// Load results and fit the configured cohort(s).
pub fn run_fit(config: &RunConfig) -> Result<FitOutput, AppError> {
    let results = load_results(&config.input)?;
    let opts = fit_options(config);

    if !config.all_sizes {
        let fit = fit_cohort(&results, config.size, &opts)?;
        return Ok(FitOutput { fits: vec![fit], primary: 0 });
    }

    let fits = fit_cohorts(&results, &SystemSize::ALL, &opts)?;
    let primary = fits
        .iter()
        .position(|f| f.size == config.size)
        .ok_or_else(|| AppError::data(format!("No fit for system size '{}'.", config.size)))?;
    Ok(FitOutput { fits, primary })
}

/// Write the optional fit JSON (primary cohort) and summary CSV (all fitted cohorts).
pub fn write_exports(config: &RunConfig, run: &FitOutput) -> Result<(), AppError> {
    if let Some(path) = &config.export_fit {
        write_fit_json(path, run.primary())?;
        info!(path = %path.display(), "exported fit");
    }
    if let Some(path) = &config.export_summary {
        write_summary_csv(path, &run.fits)?;
        info!(path = %path.display(), "exported summary");
    }
    Ok(())
}
