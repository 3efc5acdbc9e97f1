//! Dense least squares solves.
//!
//! Each Levenberg–Marquardt step solves a small, tall linear least squares problem:
//!
//! ```text
//! minimize ‖J δ + r‖² + λ ‖D δ‖²
//! ```
//!
//! which we express as one ordinary least squares problem on the stacked system
//! `[J; √λ D] δ = [−r; 0]`. Solving the stacked system via SVD avoids squaring the
//! condition number the way the normal equations `JᵀJ` would.
//!
//! The same module also provides the parameter covariance `s²·(JᵀJ)⁻¹` reported
//! with a converged fit.

use nalgebra::{DMatrix, DVector, Matrix3};

/// Upper bound on SVD sweeps; keeps pathological inputs from spinning forever.
const SVD_MAX_ITER: usize = 500;

/// Solve a least squares problem using SVD.
///
/// Returns `None` if the decomposition fails or the system is too
/// ill-conditioned to produce a finite solution.
pub fn solve_least_squares(x: &DMatrix<f64>, y: &DVector<f64>) -> Option<DVector<f64>> {
    if x.iter().any(|v| !v.is_finite()) || y.iter().any(|v| !v.is_finite()) {
        return None;
    }
    let svd = x.clone().try_svd(true, true, f64::EPSILON, SVD_MAX_ITER)?;

    // Try progressively looser tolerances if strict solve fails.
    for &tol in &[1e-14, 1e-12, 1e-10] {
        if let Ok(beta) = svd.solve(y, tol) {
            if beta.iter().all(|v| v.is_finite()) {
                return Some(beta);
            }
        }
    }

    None
}

/// Solve the damped Gauss–Newton step `[J; √λ D] δ = [−r; 0]`.
///
/// `scale` holds the diagonal of `D`, one entry per parameter.
pub fn damped_step(
    jacobian: &DMatrix<f64>,
    residuals: &DVector<f64>,
    scale: &[f64],
    lambda: f64,
) -> Option<DVector<f64>> {
    let (m, n) = jacobian.shape();
    let sqrt_lambda = lambda.sqrt();

    let mut a = DMatrix::<f64>::zeros(m + n, n);
    let mut b = DVector::<f64>::zeros(m + n);
    a.view_mut((0, 0), (m, n)).copy_from(jacobian);
    for i in 0..m {
        b[i] = -residuals[i];
    }
    for j in 0..n {
        a[(m + j, j)] = sqrt_lambda * scale[j];
    }

    solve_least_squares(&a, &b)
}

/// Parameter covariance `s²·(JᵀJ)⁻¹` with `s² = SSE / (m − 3)`.
///
/// Returns `None` when there are no residual degrees of freedom or `JᵀJ` is
/// singular.
pub fn covariance(jacobian: &DMatrix<f64>, sse: f64) -> Option<Matrix3<f64>> {
    let (m, n) = jacobian.shape();
    if n != 3 || m <= n {
        return None;
    }
    let jtj = jacobian.transpose() * jacobian;
    let jtj = Matrix3::from_iterator(jtj.iter().copied());
    let inv = jtj.try_inverse()?;
    let s2 = sse / (m - n) as f64;
    let cov = inv * s2;
    cov.iter().all(|v| v.is_finite()).then_some(cov)
}
