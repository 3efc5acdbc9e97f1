//! Per-cohort fitting.
//!
//! Each system-size cohort is an independent observation set, so fitting several
//! of them is embarrassingly parallel.

use rayon::prelude::*;
use tracing::info;

use crate::data::{observations, require_cohort};
use crate::domain::{CohortFit, ResultsFile, SystemSize};
use crate::error::AppError;
use crate::fit::fitter::{FitOptions, fit_resonance};

/// Fit the resonance model to one cohort.
pub fn fit_cohort(results: &ResultsFile, size: SystemSize, opts: &FitOptions) -> Result<CohortFit, AppError> {
    let records = require_cohort(results, size)?;
    let effective_neurons = records[0].effective_neurons;
    let observations = observations(&records);
    let outcome = fit_resonance(&observations, opts)?;

    info!(
        size = %size,
        status = %outcome.status(),
        r2 = outcome.r_squared(),
        x_opt = outcome.optimum().location,
        "fitted cohort"
    );

    Ok(CohortFit {
        size,
        effective_neurons,
        observations,
        outcome,
    })
}

/// Fit several cohorts in parallel; output order follows `sizes`.
pub fn fit_cohorts(
    results: &ResultsFile,
    sizes: &[SystemSize],
    opts: &FitOptions,
) -> Result<Vec<CohortFit>, AppError> {
    sizes
        .par_iter()
        .map(|&size| fit_cohort(results, size, opts))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{SynthConfig, generate_results};

    #[test]
    fn fits_every_synthetic_cohort_in_order() {
        let results = generate_results(&SynthConfig { noise_sd: 0.0, ..SynthConfig::default() }).unwrap();
        let fits = fit_cohorts(&results, &SystemSize::ALL, &FitOptions::default()).unwrap();

        assert_eq!(fits.len(), 4);
        for (fit, size) in fits.iter().zip(SystemSize::ALL) {
            assert_eq!(fit.size, size);
            assert_eq!(fit.observations.len(), 7);
            assert!(fit.outcome.is_converged(), "{size}: {:?}", fit.outcome);
            assert!((fit.outcome.optimum().location - 5.0).abs() < 1e-4);
            assert!(fit.outcome.r_squared() > 0.999_999);
        }
        assert_eq!(fits[3].effective_neurons, 6);
    }

    #[test]
    fn missing_cohort_propagates() {
        let mut results = generate_results(&SynthConfig::default()).unwrap();
        results.results.retain(|r| r.system_size != "Large");
        assert!(fit_cohort(&results, SystemSize::Large, &FitOptions::default()).is_err());
        assert!(fit_cohorts(&results, &SystemSize::ALL, &FitOptions::default()).is_err());
    }
}
