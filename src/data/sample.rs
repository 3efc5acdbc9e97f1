//! Synthetic results generation.
//!
//! Produces a results file with the same schema as a real experiment run: one
//! record per (system size, noise level). Responses follow the resonance model
//! with a size-dependent amplitude plus Gaussian measurement noise. The
//! noise-free configuration (`ε = 0`) is exactly zero.

use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::Normal;

use crate::domain::{ResonanceParams, ResultRecord, ResultsFile, SystemSize, BASELINE_NOISE_LEVEL, OPTIMAL_NOISE_LEVEL};
use crate::error::AppError;
use crate::models::predict;

/// Noise level labels and their amplitudes, in increasing order.
pub const NOISE_LEVELS: [(&str, f64); 7] = [
    (BASELINE_NOISE_LEVEL, 0.0),
    ("Low", 0.5),
    ("Medium", 1.0),
    ("High", 2.0),
    (OPTIMAL_NOISE_LEVEL, 5.0),
    ("Extreme", 10.0),
    ("Maximum", 20.0),
];

/// Settings for [`generate_results`].
#[derive(Debug, Clone)]
pub struct SynthConfig {
    pub seed: u64,
    /// Standard deviation of the additive measurement noise (bits).
    pub noise_sd: f64,
    /// Damping `b` shared by all cohorts; the optimum sits at `sqrt(1 / 2b)`.
    pub damping: f64,
}

impl Default for SynthConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            noise_sd: 0.0015,
            damping: 0.02,
        }
    }
}

/// Effective neuron count per cohort (3 states each: 27..729 joint states).
pub fn effective_neurons(size: SystemSize) -> u64 {
    match size {
        SystemSize::Small => 3,
        SystemSize::Medium => 4,
        SystemSize::Large => 5,
        SystemSize::XLarge => 6,
    }
}

/// Peak amplitude `a` per cohort; larger systems integrate more information.
fn amplitude(size: SystemSize) -> f64 {
    match size {
        SystemSize::Small => 0.0035,
        SystemSize::Medium => 0.0060,
        SystemSize::Large => 0.0090,
        SystemSize::XLarge => 0.0125,
    }
}

pub fn generate_results(config: &SynthConfig) -> Result<ResultsFile, AppError> {
    if !(config.noise_sd.is_finite() && config.noise_sd >= 0.0) {
        return Err(AppError::data("Noise standard deviation must be finite and >= 0."));
    }
    if !(config.damping.is_finite() && config.damping > 0.0) {
        return Err(AppError::data("Damping must be finite and > 0."));
    }

    let mut rng = StdRng::seed_from_u64(config.seed);
    let normal = Normal::new(0.0, config.noise_sd)
        .map_err(|e| AppError::data(format!("Noise distribution error: {e}")))?;

    let mut results = Vec::with_capacity(SystemSize::ALL.len() * NOISE_LEVELS.len());
    for size in SystemSize::ALL {
        let params = ResonanceParams::new(amplitude(size), config.damping, 0.0);
        for (level, eps) in NOISE_LEVELS {
            let max_phi = if eps == 0.0 {
                0.0
            } else {
                (predict(eps, &params) + normal.sample(&mut rng)).max(0.0)
            };
            results.push(ResultRecord {
                system_size: size.label().to_string(),
                noise_level: level.to_string(),
                noise_amplitude: eps,
                max_phi,
                effective_neurons: effective_neurons(size),
            });
        }
    }

    Ok(ResultsFile { results })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::results::{cohort, find_record};

    #[test]
    fn one_record_per_cohort_and_level() {
        let results = generate_results(&SynthConfig::default()).unwrap();
        assert_eq!(results.results.len(), 28);
        for size in SystemSize::ALL {
            assert_eq!(cohort(&results, size).len(), NOISE_LEVELS.len());
            let base = find_record(&results, size, BASELINE_NOISE_LEVEL).unwrap();
            assert_eq!(base.max_phi, 0.0);
        }
    }

    #[test]
    fn same_seed_same_file() {
        let cfg = SynthConfig { seed: 9, ..SynthConfig::default() };
        let a = generate_results(&cfg).unwrap();
        let b = generate_results(&cfg).unwrap();
        assert_eq!(a.results, b.results);
    }

    #[test]
    fn noiseless_peak_is_at_optimal_level() {
        let cfg = SynthConfig { noise_sd: 0.0, ..SynthConfig::default() };
        let results = generate_results(&cfg).unwrap();
        let xl = cohort(&results, SystemSize::XLarge);
        let best = xl
            .iter()
            .max_by(|a, b| a.max_phi.partial_cmp(&b.max_phi).unwrap_or(std::cmp::Ordering::Equal))
            .unwrap();
        assert_eq!(best.noise_level, OPTIMAL_NOISE_LEVEL);
    }

    #[test]
    fn rejects_negative_noise() {
        let cfg = SynthConfig { noise_sd: -1.0, ..SynthConfig::default() };
        assert!(generate_results(&cfg).is_err());
    }
}
