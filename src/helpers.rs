//! Small numeric helpers shared by the analyses.

/// Small epsilon for numerical comparisons (e.g., avoiding division by zero).
pub const NUMERICAL_EPS: f64 = 1e-10;

/// Tolerance used when checking that a resampling factor divides the period.
pub const RESAMPLE_TOL: f64 = 1e-6;

/// Arithmetic mean, `None` for an empty slice.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Mean and population variance (divisor `n`) in one pass over the data.
///
/// # Returns
/// `None` for an empty slice.
pub fn mean_and_variance(values: &[f64]) -> Option<(f64, f64)> {
    let m = mean(values)?;
    let var = values.iter().map(|&v| (v - m) * (v - m)).sum::<f64>() / values.len() as f64;
    Some((m, var))
}

/// Upper median: the element at index `len / 2` of the sorted copy.
///
/// This is the convention used for activity thresholds and sine-fit bounds:
/// for even lengths the larger of the two central values is returned.
pub fn upper_median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    Some(sorted[sorted.len() / 2])
}

/// Largest value, `None` for an empty slice.
pub fn max_value(values: &[f64]) -> Option<f64> {
    values.iter().copied().reduce(f64::max)
}

/// IEEE 754 remainder: `x - y * n` with `n` the integer nearest to `x / y`
/// (ties to even).
pub fn ieee_remainder(x: f64, y: f64) -> f64 {
    x - y * (x / y).round_ties_even()
}

/// Wrap `value` into `[-half, half)` for a circle of circumference `2 * half`.
pub fn wrap_centered(value: f64, circumference: f64) -> f64 {
    let half = circumference / 2.0;
    (value + half).rem_euclid(circumference) - half
}
