//! Levenberg–Marquardt minimisation of a sum of squared residuals.
//!
//! The solver is generic over two closures:
//!
//! - `residuals(p)` returns `rᵢ(p)` (model minus observation)
//! - `jacobian(p)` returns `∂rᵢ/∂pⱼ`
//!
//! Each iteration solves the damped step `[J; √λ D] δ = [−r; 0]` where `D` holds
//! the running maximum of the Jacobian column norms (Marquardt scaling). A step is
//! accepted only if it lowers the cost; otherwise `λ` grows and the step shrinks.
//!
//! Termination (first match wins):
//! - cost is exactly zero
//! - relative cost reduction (actual and predicted) below `ftol`
//! - step length below `xtol · (‖p‖ + xtol)`
//! - gradient cosine below `gtol`
//!
//! The residual closure is called at most `max_evaluations` times.

use nalgebra::{DMatrix, DVector};

use crate::math::damped_step;

/// `sqrt(f64::EPSILON)`, the customary default tolerance for MINPACK-style solvers.
const DEFAULT_TOL: f64 = 1.490_116_119_384_765_6e-8;

const LAMBDA_UP: f64 = 10.0;
const LAMBDA_DOWN: f64 = 0.1;
const LAMBDA_MIN: f64 = 1e-12;
/// Past this damping no step can make progress.
const LAMBDA_MAX: f64 = 1e32;

/// Solver options.
#[derive(Debug, Clone)]
pub struct LmOptions {
    /// Cap on residual evaluations (including the initial one).
    pub max_evaluations: usize,
    pub ftol: f64,
    pub xtol: f64,
    pub gtol: f64,
    pub initial_lambda: f64,
}

impl Default for LmOptions {
    fn default() -> Self {
        Self {
            max_evaluations: 5000,
            ftol: DEFAULT_TOL,
            xtol: DEFAULT_TOL,
            gtol: 0.0,
            initial_lambda: 1e-3,
        }
    }
}

/// Converged solver state.
#[derive(Debug, Clone)]
pub struct LmReport {
    pub params: DVector<f64>,
    pub residuals: DVector<f64>,
    /// Jacobian at `params` (for covariance estimation).
    pub jacobian: DMatrix<f64>,
    /// `‖r‖²` at `params`.
    pub cost: f64,
    pub iterations: usize,
    pub evaluations: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LmError {
    /// Residuals or Jacobian were non-finite at an accepted point.
    NonFinite,
    /// The damped step system could not be solved, or damping diverged.
    Singular,
    /// `max_evaluations` reached before any tolerance was met.
    EvaluationLimit { evaluations: usize },
}

impl std::fmt::Display for LmError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LmError::NonFinite => write!(f, "non-finite residuals or Jacobian"),
            LmError::Singular => write!(f, "damped step system is singular"),
            LmError::EvaluationLimit { evaluations } => {
                write!(f, "no convergence after {evaluations} evaluations")
            }
        }
    }
}

impl std::error::Error for LmError {}

/// Minimise `‖r(p)‖²` starting from `p0`.
pub fn levenberg_marquardt<R, J>(
    residuals: R,
    jacobian: J,
    p0: &DVector<f64>,
    opts: &LmOptions,
) -> Result<LmReport, LmError>
where
    R: Fn(&DVector<f64>) -> DVector<f64>,
    J: Fn(&DVector<f64>) -> DMatrix<f64>,
{
    let n = p0.len();
    let mut p = p0.clone();
    let mut r = residuals(&p);
    let mut evaluations = 1;
    if !all_finite(r.iter()) {
        return Err(LmError::NonFinite);
    }
    let mut cost = r.norm_squared();
    let mut lambda = opts.initial_lambda.max(LAMBDA_MIN);
    let mut scale = vec![0.0f64; n];

    let mut iterations = 0;
    loop {
        let jac = jacobian(&p);
        if !all_finite(jac.iter()) {
            return Err(LmError::NonFinite);
        }

        if cost == 0.0 {
            return Ok(report(p, r, jac, cost, iterations, evaluations));
        }

        // Marquardt scaling: running max of column norms, floored at 1 for
        // columns that have never been non-zero.
        let mut col_norms = Vec::with_capacity(n);
        for j in 0..n {
            let norm = jac.column(j).norm();
            if !norm.is_finite() {
                return Err(LmError::NonFinite);
            }
            col_norms.push(norm);
            scale[j] = scale[j].max(norm);
        }
        let scale_eff: Vec<f64> = scale.iter().map(|&d| if d > 0.0 { d } else { 1.0 }).collect();

        if opts.gtol > 0.0 && gradient_cosine(&jac, &r, &col_norms, cost) <= opts.gtol {
            return Ok(report(p, r, jac, cost, iterations, evaluations));
        }

        iterations += 1;

        // Inner loop: grow damping until a step lowers the cost.
        loop {
            if evaluations >= opts.max_evaluations {
                return Err(LmError::EvaluationLimit { evaluations });
            }
            if lambda > LAMBDA_MAX {
                return Err(LmError::Singular);
            }

            let Some(delta) = damped_step(&jac, &r, &scale_eff, lambda) else {
                lambda *= LAMBDA_UP;
                continue;
            };

            let step_norm = delta.norm();
            let step_small = step_norm <= opts.xtol * (p.norm() + opts.xtol);

            let p_new = &p + &delta;
            let r_new = residuals(&p_new);
            evaluations += 1;
            let cost_new = r_new.norm_squared();

            if !cost_new.is_finite() || cost_new >= cost {
                // A rejected step that is already negligible means no nearby
                // point does better: we are at the minimum.
                if step_small {
                    return Ok(report(p, r, jac, cost, iterations, evaluations));
                }
                lambda *= LAMBDA_UP;
                continue;
            }

            let predicted = (cost - (&r + &jac * &delta).norm_squared()).max(0.0);
            let actual = cost - cost_new;
            let f_small = actual <= opts.ftol * cost && predicted <= opts.ftol * cost;

            p = p_new;
            r = r_new;
            cost = cost_new;
            lambda = (lambda * LAMBDA_DOWN).max(LAMBDA_MIN);

            if f_small || step_small || cost == 0.0 {
                let jac = jacobian(&p);
                if !all_finite(jac.iter()) {
                    return Err(LmError::NonFinite);
                }
                return Ok(report(p, r, jac, cost, iterations, evaluations));
            }
            break;
        }
    }
}

fn report(
    params: DVector<f64>,
    residuals: DVector<f64>,
    jacobian: DMatrix<f64>,
    cost: f64,
    iterations: usize,
    evaluations: usize,
) -> LmReport {
    LmReport {
        params,
        residuals,
        jacobian,
        cost,
        iterations,
        evaluations,
    }
}

/// Largest `|Jⱼ·r| / (‖Jⱼ‖ ‖r‖)` over columns; 0 when `r` is orthogonal to `J`.
fn gradient_cosine(jac: &DMatrix<f64>, r: &DVector<f64>, col_norms: &[f64], cost: f64) -> f64 {
    let r_norm = cost.sqrt();
    let mut worst: f64 = 0.0;
    for (j, &norm) in col_norms.iter().enumerate() {
        if norm == 0.0 {
            continue;
        }
        let g = jac.column(j).dot(r);
        worst = worst.max((g / (norm * r_norm)).abs());
    }
    worst
}

fn all_finite<'a>(mut values: impl Iterator<Item = &'a f64>) -> bool {
    values.all(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Exponential decay `y = k·exp(−t/τ)` as a small standalone problem.
    fn decay_problem(k: f64, tau: f64) -> (Vec<f64>, Vec<f64>) {
        let t: Vec<f64> = (0..15).map(|i| i as f64 * 0.5).collect();
        let y = t.iter().map(|&t| k * (-t / tau).exp()).collect();
        (t, y)
    }

    #[test]
    fn recovers_exponential_decay() {
        let (t, y) = decay_problem(3.0, 2.0);
        let residuals = |p: &DVector<f64>| {
            DVector::from_iterator(
                t.len(),
                t.iter().zip(&y).map(|(&t, &y)| p[0] * (-t / p[1]).exp() - y),
            )
        };
        let jacobian = |p: &DVector<f64>| {
            let mut jac = DMatrix::zeros(t.len(), 2);
            for (i, &ti) in t.iter().enumerate() {
                let e = (-ti / p[1]).exp();
                jac[(i, 0)] = e;
                jac[(i, 1)] = p[0] * e * ti / (p[1] * p[1]);
            }
            jac
        };

        let p0 = DVector::from_row_slice(&[1.0, 1.0]);
        let out = levenberg_marquardt(residuals, jacobian, &p0, &LmOptions::default()).unwrap();
        assert!((out.params[0] - 3.0).abs() < 1e-6, "k = {}", out.params[0]);
        assert!((out.params[1] - 2.0).abs() < 1e-6, "tau = {}", out.params[1]);
        assert!(out.cost < 1e-12);
        assert!(out.evaluations <= 5000);
    }

    #[test]
    fn zero_cost_start_returns_immediately() {
        let residuals = |p: &DVector<f64>| DVector::from_row_slice(&[p[0] - 1.0]);
        let jacobian = |_: &DVector<f64>| DMatrix::from_row_slice(1, 1, &[1.0]);
        let p0 = DVector::from_row_slice(&[1.0]);
        let out = levenberg_marquardt(residuals, jacobian, &p0, &LmOptions::default()).unwrap();
        assert_eq!(out.iterations, 0);
        assert_eq!(out.evaluations, 1);
    }

    #[test]
    fn evaluation_cap_is_enforced() {
        let (t, y) = decay_problem(3.0, 2.0);
        let calls = std::cell::Cell::new(0usize);
        let residuals = |p: &DVector<f64>| {
            calls.set(calls.get() + 1);
            DVector::from_iterator(
                t.len(),
                t.iter().zip(&y).map(|(&t, &y)| p[0] * (-t / p[1]).exp() - y),
            )
        };
        let jacobian = |p: &DVector<f64>| {
            let mut jac = DMatrix::zeros(t.len(), 2);
            for (i, &ti) in t.iter().enumerate() {
                let e = (-ti / p[1]).exp();
                jac[(i, 0)] = e;
                jac[(i, 1)] = p[0] * e * ti / (p[1] * p[1]);
            }
            jac
        };
        let opts = LmOptions {
            max_evaluations: 3,
            ..LmOptions::default()
        };
        let p0 = DVector::from_row_slice(&[1.0, 1.0]);
        let err = levenberg_marquardt(residuals, jacobian, &p0, &opts).unwrap_err();
        assert_eq!(err, LmError::EvaluationLimit { evaluations: 3 });
        assert_eq!(calls.get(), 3);
    }

    #[test]
    fn non_finite_start_is_reported() {
        let residuals = |_: &DVector<f64>| DVector::from_row_slice(&[f64::INFINITY]);
        let jacobian = |_: &DVector<f64>| DMatrix::from_row_slice(1, 1, &[1.0]);
        let p0 = DVector::from_row_slice(&[0.0]);
        let err = levenberg_marquardt(residuals, jacobian, &p0, &LmOptions::default()).unwrap_err();
        assert_eq!(err, LmError::NonFinite);
    }
}
