//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - read from the experiment results file
//! - used in-memory during fitting
//! - exported to JSON/CSV and reloaded later for plotting

use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use clap::ValueEnum;
use nalgebra::Matrix3;
use serde::{Deserialize, Serialize};

use crate::plot::FigureStyle;

/// Noise level label of the unperturbed (pure state) configuration.
pub const BASELINE_NOISE_LEVEL: &str = "Baseline";
/// Noise level label of the configuration reported as optimal.
pub const OPTIMAL_NOISE_LEVEL: &str = "Very High";

/// System-size cohort label used in the results file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
pub enum SystemSize {
    #[value(name = "small")]
    Small,
    #[value(name = "medium")]
    Medium,
    #[value(name = "large")]
    Large,
    #[value(name = "xlarge")]
    XLarge,
}

impl SystemSize {
    pub const ALL: [SystemSize; 4] = [
        SystemSize::Small,
        SystemSize::Medium,
        SystemSize::Large,
        SystemSize::XLarge,
    ];

    /// Label as stored in the `system_size` field.
    pub fn label(self) -> &'static str {
        match self {
            SystemSize::Small => "Small",
            SystemSize::Medium => "Medium",
            SystemSize::Large => "Large",
            SystemSize::XLarge => "XLarge",
        }
    }
}

impl fmt::Display for SystemSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One row of the experiment results file.
///
/// Only the fields the figures need are modelled; anything else in the record is
/// ignored on read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRecord {
    pub system_size: String,
    pub noise_level: String,
    /// Stimulus amplitude `ε`.
    pub noise_amplitude: f64,
    /// Measured response `Φ_max` (bits).
    pub max_phi: f64,
    pub effective_neurons: u64,
}

/// The results file as a whole.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResultsFile {
    pub results: Vec<ResultRecord>,
}

/// A single `(x, y)` observation fed to the fit engine.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub x: f64,
    pub y: f64,
}

impl Observation {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Parameters of `f(x) = a·x·exp(−b·x²) + c`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResonanceParams {
    pub a: f64,
    pub b: f64,
    pub c: f64,
}

impl ResonanceParams {
    pub fn new(a: f64, b: f64, c: f64) -> Self {
        Self { a, b, c }
    }

    pub fn to_array(self) -> [f64; 3] {
        [self.a, self.b, self.c]
    }

    pub fn from_slice(v: &[f64]) -> Self {
        Self::new(v[0], v[1], v[2])
    }

    pub fn is_finite(&self) -> bool {
        self.a.is_finite() && self.b.is_finite() && self.c.is_finite()
    }
}

impl Default for ResonanceParams {
    /// The documented initial guess `(0.02, 0.02, 0.0)`.
    fn default() -> Self {
        Self::new(0.02, 0.02, 0.0)
    }
}

/// Interior optimum of a fitted curve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Optimum {
    pub location: f64,
    pub value: f64,
}

/// Why the fit engine fell back to the initial guess.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackReason {
    /// Fewer observations than model parameters.
    Underdetermined,
    /// The damped step system could not be solved.
    SolverFailed,
    /// The evaluation cap was reached before the tolerances were met.
    EvaluationLimit,
    /// Residuals, parameters, or R² became non-finite.
    NonFinite,
}

impl FallbackReason {
    /// Stable machine-readable name, matching the serialized form.
    pub fn code(self) -> &'static str {
        match self {
            FallbackReason::Underdetermined => "underdetermined",
            FallbackReason::SolverFailed => "solver_failed",
            FallbackReason::EvaluationLimit => "evaluation_limit",
            FallbackReason::NonFinite => "non_finite",
        }
    }
}

impl fmt::Display for FallbackReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FallbackReason::Underdetermined => "fewer than 3 observations",
            FallbackReason::SolverFailed => "step system could not be solved",
            FallbackReason::EvaluationLimit => "evaluation limit reached",
            FallbackReason::NonFinite => "non-finite values during fit",
        };
        f.write_str(s)
    }
}

/// A genuine least-squares fit.
#[derive(Debug, Clone, PartialEq)]
pub struct ConvergedFit {
    pub params: ResonanceParams,
    /// Parameter covariance `s²·(JᵀJ)⁻¹`; `None` when `n <= 3` or `JᵀJ` is singular.
    pub covariance: Option<Matrix3<f64>>,
    pub r_squared: f64,
    pub optimum: Optimum,
    pub sse: f64,
    pub iterations: usize,
    pub evaluations: usize,
}

impl ConvergedFit {
    /// One-sigma parameter uncertainties from the covariance diagonal.
    pub fn std_errors(&self) -> Option<[f64; 3]> {
        let cov = self.covariance.as_ref()?;
        let se = [cov[(0, 0)].sqrt(), cov[(1, 1)].sqrt(), cov[(2, 2)].sqrt()];
        se.iter().all(|v| v.is_finite()).then_some(se)
    }
}

/// Deterministic stand-in used when no fit could be obtained.
#[derive(Debug, Clone, PartialEq)]
pub struct FallbackFit {
    /// The initial guess, reported in place of fitted parameters.
    pub guess: ResonanceParams,
    pub reason: FallbackReason,
    /// Location is the fixed fallback constant, value is the largest observed response.
    pub optimum: Optimum,
}

/// Output of the fit engine: either a real fit or the documented fallback.
#[derive(Debug, Clone, PartialEq)]
pub enum FitOutcome {
    Converged(ConvergedFit),
    Fallback(FallbackFit),
}

impl FitOutcome {
    pub fn params(&self) -> ResonanceParams {
        match self {
            FitOutcome::Converged(fit) => fit.params,
            FitOutcome::Fallback(fb) => fb.guess,
        }
    }

    /// Coefficient of determination; `0` for a fallback.
    pub fn r_squared(&self) -> f64 {
        match self {
            FitOutcome::Converged(fit) => fit.r_squared,
            FitOutcome::Fallback(_) => 0.0,
        }
    }

    pub fn optimum(&self) -> Optimum {
        match self {
            FitOutcome::Converged(fit) => fit.optimum,
            FitOutcome::Fallback(fb) => fb.optimum,
        }
    }

    pub fn is_converged(&self) -> bool {
        matches!(self, FitOutcome::Converged(_))
    }

    pub fn fallback_reason(&self) -> Option<FallbackReason> {
        match self {
            FitOutcome::Converged(_) => None,
            FitOutcome::Fallback(fb) => Some(fb.reason),
        }
    }

    pub fn status(&self) -> FitStatus {
        match self {
            FitOutcome::Converged(_) => FitStatus::Converged,
            FitOutcome::Fallback(_) => FitStatus::Fallback,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FitStatus {
    Converged,
    Fallback,
}

impl fmt::Display for FitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FitStatus::Converged => f.write_str("converged"),
            FitStatus::Fallback => f.write_str("fallback"),
        }
    }
}

/// Fit result for one system-size cohort.
#[derive(Debug, Clone)]
pub struct CohortFit {
    pub size: SystemSize,
    pub effective_neurons: u64,
    pub observations: Vec<Observation>,
    pub outcome: FitOutcome,
}

/// A full run's configuration as understood by the pipeline.
///
/// This is derived from CLI flags (plus defaults).
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub input: PathBuf,
    pub out_dir: PathBuf,
    /// Cohort fitted for the resonance figure and the single-cohort report.
    pub size: SystemSize,
    /// Fit every cohort instead of just `size`.
    pub all_sizes: bool,

    pub initial_guess: ResonanceParams,
    pub max_evaluations: usize,

    pub plot: bool,
    pub plot_width: usize,
    pub plot_height: usize,

    pub export_fit: Option<PathBuf>,
    pub export_summary: Option<PathBuf>,

    pub style: FigureStyle,
}

/// A saved fit file (JSON).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FitFile {
    pub tool: String,
    pub generated_at: DateTime<Utc>,
    pub system_size: SystemSize,
    pub status: FitStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback_reason: Option<FallbackReason>,
    pub params: ResonanceParams,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub std_errors: Option<[f64; 3]>,
    pub r_squared: f64,
    pub optimum: Optimum,
    pub observations: Vec<Observation>,
    pub grid: CurveGrid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurveGrid {
    pub x: Vec<f64>,
    pub y: Vec<f64>,
}
