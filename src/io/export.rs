//! Export per-cohort fit summaries to CSV.
//!
//! The export is meant to be easy to consume in spreadsheets or downstream scripts.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::domain::{CohortFit, FallbackReason};
use crate::error::AppError;

const HEADER: &str = "system_size,effective_neurons,n_obs,status,fallback_reason,a,b,c,r_squared,x_opt,y_opt";

/// Write one summary row per cohort fit.
pub fn write_summary_csv(path: &Path, fits: &[CohortFit]) -> Result<(), AppError> {
    let mut file = File::create(path)
        .map_err(|e| AppError::io(format!("Failed to create export CSV '{}': {e}", path.display())))?;

    writeln!(file, "{HEADER}")
        .map_err(|e| AppError::io(format!("Failed to write export CSV header: {e}")))?;

    for fit in fits {
        writeln!(file, "{}", summary_row(fit))
            .map_err(|e| AppError::io(format!("Failed to write export CSV row: {e}")))?;
    }

    Ok(())
}

fn summary_row(fit: &CohortFit) -> String {
    let p = fit.outcome.params();
    let opt = fit.outcome.optimum();
    let reason = fit
        .outcome
        .fallback_reason()
        .map(FallbackReason::code)
        .unwrap_or_default();
    format!(
        "{},{},{},{},{},{:.10},{:.10},{:.10},{:.6},{:.6},{:.10}",
        fit.size.label(),
        fit.effective_neurons,
        fit.observations.len(),
        fit.outcome.status(),
        reason,
        p.a,
        p.b,
        p.c,
        fit.outcome.r_squared(),
        opt.location,
        opt.value,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{FallbackFit, FitOutcome, Observation, Optimum, ResonanceParams, SystemSize};

    #[test]
    fn fallback_row_names_reason() {
        let fit = CohortFit {
            size: SystemSize::Small,
            effective_neurons: 3,
            observations: vec![Observation::new(1.0, 0.004), Observation::new(2.0, 0.006)],
            outcome: FitOutcome::Fallback(FallbackFit {
                guess: ResonanceParams::default(),
                reason: FallbackReason::Underdetermined,
                optimum: Optimum { location: 5.0, value: 0.006 },
            }),
        };

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("summary.csv");
        write_summary_csv(&path, &[fit]).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], HEADER);
        assert!(lines[1].starts_with("Small,3,2,fallback,underdetermined,0.0200000000,"));
        assert!(lines[1].ends_with(",0.000000,5.000000,0.0060000000"));
    }
}
