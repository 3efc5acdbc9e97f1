//! Goodness-of-fit statistics.

/// Relative threshold below which a response set counts as having zero variance.
const ZERO_VARIANCE_REL: f64 = 1e-20;

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Total sum of squares `Σ(yᵢ − ȳ)²`.
pub fn total_sum_of_squares(y: &[f64]) -> f64 {
    let Some(ybar) = mean(y) else {
        return 0.0;
    };
    y.iter().map(|v| (v - ybar) * (v - ybar)).sum()
}

/// Coefficient of determination `1 − SS_res / SS_tot`.
///
/// The response counts as constant when `SS_tot` is negligible relative to `Σy²`,
/// however small the values are. For a constant response the ratio is undefined:
/// the result is `1` if the residuals vanish as well (the model reproduces the
/// constant) and `0` otherwise, so the value is never NaN.
pub fn r_squared(y: &[f64], ss_res: f64) -> f64 {
    let ss_tot = total_sum_of_squares(y);
    let sum_sq: f64 = y.iter().map(|v| v * v).sum();

    if ss_tot <= ZERO_VARIANCE_REL * sum_sq {
        // Residual tolerance keeps an absolute floor so an all-zero response can match.
        let tol = ZERO_VARIANCE_REL * sum_sq.max(1.0);
        return if ss_res <= tol { 1.0 } else { 0.0 };
    }
    1.0 - ss_res / ss_tot
}

/// Largest finite value, if any.
pub fn max_finite(values: &[f64]) -> Option<f64> {
    values
        .iter()
        .copied()
        .filter(|v| v.is_finite())
        .fold(None, |acc, v| Some(acc.map_or(v, |m: f64| m.max(v))))
}
