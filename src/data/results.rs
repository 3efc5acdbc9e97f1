//! Reader for the experiment results file.
//!
//! The file is a JSON object with a `results` array; each record carries the
//! system-size cohort, the noise level label, the noise amplitude `ε`, the
//! measured `Φ_max`, and the effective neuron count. It is read once per run.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use tracing::info;

use crate::domain::{Observation, ResultRecord, ResultsFile, SystemSize};
use crate::error::AppError;

/// Load and validate a results file.
pub fn load_results(path: &Path) -> Result<ResultsFile, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::io(format!("Failed to open results file '{}': {e}", path.display())))?;
    let results: ResultsFile = serde_json::from_reader(BufReader::new(file))
        .map_err(|e| AppError::io(format!("Invalid results file '{}': {e}", path.display())))?;

    validate(&results)?;
    info!(path = %path.display(), records = results.results.len(), "loaded results");
    Ok(results)
}

/// Write a results file (used by the synthetic generator).
pub fn write_results(path: &Path, results: &ResultsFile) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::io(format!("Failed to create results file '{}': {e}", path.display())))?;
    serde_json::to_writer_pretty(file, results)
        .map_err(|e| AppError::io(format!("Failed to write results file: {e}")))?;
    Ok(())
}

fn validate(results: &ResultsFile) -> Result<(), AppError> {
    if results.results.is_empty() {
        return Err(AppError::data("Results file contains no records."));
    }
    for (i, r) in results.results.iter().enumerate() {
        if !(r.noise_amplitude.is_finite() && r.max_phi.is_finite()) {
            return Err(AppError::data(format!(
                "Record {i} ({} / {}) has a non-finite value.",
                r.system_size, r.noise_level
            )));
        }
    }
    Ok(())
}

/// Records of one system-size cohort, in file order.
pub fn cohort(results: &ResultsFile, size: SystemSize) -> Vec<&ResultRecord> {
    results
        .results
        .iter()
        .filter(|r| r.system_size == size.label())
        .collect()
}

/// Like [`cohort`], but an empty cohort is a precondition error.
pub fn require_cohort(results: &ResultsFile, size: SystemSize) -> Result<Vec<&ResultRecord>, AppError> {
    let records = cohort(results, size);
    if records.is_empty() {
        return Err(AppError::data(format!("No records for system size '{size}'.")));
    }
    Ok(records)
}

/// Records at a given noise level label, in file order.
pub fn at_noise_level<'a>(results: &'a ResultsFile, level: &str) -> Vec<&'a ResultRecord> {
    results
        .results
        .iter()
        .filter(|r| r.noise_level == level)
        .collect()
}

/// The single record for a cohort at a noise level.
pub fn find_record<'a>(
    results: &'a ResultsFile,
    size: SystemSize,
    level: &str,
) -> Result<&'a ResultRecord, AppError> {
    results
        .results
        .iter()
        .find(|r| r.system_size == size.label() && r.noise_level == level)
        .ok_or_else(|| AppError::data(format!("No record for system size '{size}' at noise level '{level}'.")))
}

/// `(noise_amplitude, max_phi)` pairs for the fit engine.
pub fn observations(records: &[&ResultRecord]) -> Vec<Observation> {
    records
        .iter()
        .map(|r| Observation::new(r.noise_amplitude, r.max_phi))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn record(size: &str, level: &str, eps: f64, phi: f64) -> ResultRecord {
        ResultRecord {
            system_size: size.to_string(),
            noise_level: level.to_string(),
            noise_amplitude: eps,
            max_phi: phi,
            effective_neurons: 6,
        }
    }

    fn sample() -> ResultsFile {
        ResultsFile {
            results: vec![
                record("Small", "Baseline", 0.0, 0.0),
                record("XLarge", "Baseline", 0.0, 0.0),
                record("XLarge", "Very High", 5.0, 0.038),
                record("Small", "Very High", 5.0, 0.011),
            ],
        }
    }

    #[test]
    fn cohort_preserves_file_order() {
        let results = sample();
        let xl = cohort(&results, SystemSize::XLarge);
        assert_eq!(xl.len(), 2);
        assert_eq!(xl[0].noise_level, "Baseline");
        assert_eq!(observations(&xl), vec![Observation::new(0.0, 0.0), Observation::new(5.0, 0.038)]);
    }

    #[test]
    fn missing_cohort_is_an_error() {
        let results = sample();
        assert!(cohort(&results, SystemSize::Medium).is_empty());
        assert!(require_cohort(&results, SystemSize::Medium).is_err());
        assert!(find_record(&results, SystemSize::Large, "Baseline").is_err());
        assert_eq!(find_record(&results, SystemSize::Small, "Very High").unwrap().max_phi, 0.011);
        assert_eq!(at_noise_level(&results, "Very High").len(), 2);
    }

    #[test]
    fn load_round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results.json");
        write_results(&path, &sample()).unwrap();
        let loaded = load_results(&path).unwrap();
        assert_eq!(loaded.results, sample().results);
    }

    #[test]
    fn load_rejects_malformed_and_empty_files() {
        let dir = tempfile::tempdir().unwrap();

        let bad = dir.path().join("bad.json");
        File::create(&bad).unwrap().write_all(b"{\"results\": [").unwrap();
        assert_eq!(load_results(&bad).unwrap_err().exit_code(), crate::error::EXIT_IO);

        let empty = dir.path().join("empty.json");
        File::create(&empty).unwrap().write_all(b"{\"results\": []}").unwrap();
        assert_eq!(load_results(&empty).unwrap_err().exit_code(), crate::error::EXIT_DATA);

        assert!(load_results(&dir.path().join("missing.json")).is_err());
    }
}
