//! Evaluation of the stochastic-resonance model.
//!
//! `f(x; a, b, c) = a·x·exp(−b·x²) + c`
//!
//! The fitter relies on three primitive operations:
//! - predict `f(x)` (residuals, plots)
//! - the parameter gradient `∂f/∂(a, b, c)` (Jacobian rows)
//! - the analytic interior optimum of a fitted curve

use crate::domain::{Optimum, ResonanceParams};

/// Optimum location used when the curve has no interior maximum (`b <= 0`) and
/// for fallback results.
pub const FALLBACK_OPTIMUM_LOCATION: f64 = 5.0;

/// Predict `f(x)` for the given parameters.
pub fn predict(x: f64, p: &ResonanceParams) -> f64 {
    p.a * x * (-p.b * x * x).exp() + p.c
}

/// Partial derivatives of `f(x)` with respect to `(a, b, c)`.
pub fn param_gradient(x: f64, p: &ResonanceParams) -> [f64; 3] {
    let damp = (-p.b * x * x).exp();
    [x * damp, -p.a * x * x * x * damp, 1.0]
}

/// `df/dx = a·exp(−b·x²)·(1 − 2·b·x²)`.
pub fn slope(x: f64, p: &ResonanceParams) -> f64 {
    p.a * (-p.b * x * x).exp() * (1.0 - 2.0 * p.b * x * x)
}

/// Interior optimum over `x > 0`.
///
/// For `b > 0` the slope vanishes at `x* = sqrt(1 / (2b))`. Otherwise there is no
/// interior turning point and the fixed fallback location is used instead.
pub fn optimum(p: &ResonanceParams) -> Optimum {
    let location = if p.b > 0.0 {
        (1.0 / (2.0 * p.b)).sqrt()
    } else {
        FALLBACK_OPTIMUM_LOCATION
    };
    Optimum {
        location,
        value: predict(location, p),
    }
}

/// Sample the curve on `n` evenly spaced points over `[x0, x1]`.
pub fn sample_curve(p: &ResonanceParams, x0: f64, x1: f64, n: usize) -> Vec<(f64, f64)> {
    let n = n.max(2);
    (0..n)
        .map(|i| {
            let u = i as f64 / (n as f64 - 1.0);
            let x = x0 + u * (x1 - x0);
            (x, predict(x, p))
        })
        .collect()
}
