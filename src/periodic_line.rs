//! Linear regression on a circle: `y = m x + t (mod Ty)`.
//!
//! Used for phase drift of markers (onsets, offsets, acrophases) across many
//! periods, where `x` is the period index and `y` the position within the
//! period. Wrapped data cannot be regressed directly, so the fit works in
//! three stages:
//!
//! 1. **Slope**: coarse-to-fine grid search minimizing the circular spread
//!    of the residual phases `y - m x`; this does not depend on `t`.
//! 2. **Intercept**: the same grid search minimizing the RMS of the wrapped
//!    residuals `y - (t + m x)` for the slope found in stage 1.
//! 3. **Refinement**: every `y` is shifted by the multiple of `Ty` that puts
//!    it closest to the fitted line, and an ordinary least-squares pass on
//!    the unwrapped values gives the final `(m, t)`.

use crate::error::{AnalysisError, Result};
use crate::helpers::wrap_centered;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use tracing::{debug, trace};

/// Number of grid points in the first pass of each search.
const GRID_POINTS: i64 = 41;
/// Half width (in steps) of every later pass.
const REFINE_HALF_WIDTH: i64 = 2;

/// A line fitted to wrapped data.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WrappedLine {
    pub slope: f64,
    pub intercept: f64,
}

impl WrappedLine {
    pub fn value_at(&self, x: f64) -> f64 {
        self.intercept + self.slope * x
    }
}

/// A drift line over a range of period indices.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegressionLine {
    /// Drift per period
    pub slope: f64,
    /// Position within the period at period index 0
    pub intercept: f64,
    pub first_period: i64,
    pub last_period: i64,
}

impl RegressionLine {
    /// Unwrapped position of the line at `period`.
    pub fn phase_at(&self, period: f64) -> f64 {
        self.intercept + self.slope * period
    }

    /// Position of the line at `period`, wrapped into `[0, circumference)`.
    pub fn wrapped_phase_at(&self, period: f64, circumference: f64) -> f64 {
        self.phase_at(period).rem_euclid(circumference)
    }
}

/// Coarse-to-fine 1-D grid search.
///
/// The first pass scans `GRID_POINTS` values spaced `step` apart around
/// `center`; every later pass halves the step and scans `±REFINE_HALF_WIDTH`
/// steps around the best value so far, until the step is at most
/// `resolution`.
fn grid_search<F>(center: f64, mut step: f64, resolution: f64, mut criterion: F) -> f64
where
    F: FnMut(f64) -> f64,
{
    let mut best = center;
    let mut half_width = GRID_POINTS / 2;
    let mut passes = 0;
    loop {
        let mut best_value = f64::INFINITY;
        let mut pick = best;
        for i in -half_width..=half_width {
            let candidate = best + i as f64 * step;
            let value = criterion(candidate);
            if value < best_value {
                best_value = value;
                pick = candidate;
            }
        }
        best = pick;
        passes += 1;
        trace!(pass = passes, step, best, best_value, "grid pass");
        if step <= resolution {
            return best;
        }
        half_width = REFINE_HALF_WIDTH;
        step /= 2.0;
    }
}

/// `1 - R` where `R` is the mean resultant length of the residual phases.
fn circular_spread(x: &[f64], y: &[f64], slope: f64, circumference: f64) -> f64 {
    let scale = 2.0 * PI / circumference;
    let (mut s, mut c) = (0.0, 0.0);
    for (&xi, &yi) in x.iter().zip(y) {
        let angle = (yi - slope * xi) * scale;
        s += angle.sin();
        c += angle.cos();
    }
    let n = x.len() as f64;
    1.0 - (s * s + c * c).sqrt() / n
}

/// RMS of the residuals wrapped into `[-Ty/2, Ty/2)`.
fn wrapped_rms(x: &[f64], y: &[f64], line: WrappedLine, circumference: f64) -> f64 {
    let sum: f64 = x
        .iter()
        .zip(y)
        .map(|(&xi, &yi)| {
            let r = wrap_centered(yi - line.value_at(xi), circumference);
            r * r
        })
        .sum();
    (sum / x.len() as f64).sqrt()
}

fn validate_points(x: &[f64], y: &[f64], circumference: f64, resolution: f64) -> Result<()> {
    if x.len() != y.len() {
        return Err(AnalysisError::invalid(format!(
            "{} x values but {} y values",
            x.len(),
            y.len()
        )));
    }
    if x.len() < 2 {
        return Err(AnalysisError::insufficient(2, x.len()));
    }
    if !circumference.is_finite() || circumference <= 0.0 {
        return Err(AnalysisError::invalid(format!(
            "circumference must be positive, got {circumference}"
        )));
    }
    if !resolution.is_finite() || resolution <= 0.0 {
        return Err(AnalysisError::invalid(format!(
            "resolution must be positive, got {resolution}"
        )));
    }
    if x.iter().chain(y).any(|v| !v.is_finite()) {
        return Err(AnalysisError::invalid("points must be finite"));
    }
    Ok(())
}

/// Ordinary least squares `y = m x + t`.
fn least_squares(x: &[f64], y: &[f64]) -> Result<WrappedLine> {
    let n = x.len() as f64;
    let (mut sx, mut sy, mut sxx, mut sxy) = (0.0, 0.0, 0.0, 0.0);
    for (&xi, &yi) in x.iter().zip(y) {
        sx += xi;
        sy += yi;
        sxx += xi * xi;
        sxy += xi * yi;
    }
    let denom = n * sxx - sx * sx;
    if denom.abs() <= f64::EPSILON * n * sxx.abs().max(1.0) {
        return Err(AnalysisError::degenerate(
            "all points share the same x value",
        ));
    }
    let slope = (n * sxy - sx * sy) / denom;
    Ok(WrappedLine {
        slope,
        intercept: (sy - slope * sx) / n,
    })
}

/// Fit `y = m x + t (mod circumference)`.
///
/// # Arguments
/// * `x` - Abscissae, typically period indices
/// * `y` - Positions on the circle, typically in `[0, circumference)`
/// * `circumference` - Length `Ty` of the circle
/// * `resolution` - Grid searches stop once their step is at most this
///
/// # Returns
/// The line after unwrapping and least-squares refinement. Its intercept
/// is not reduced modulo `circumference`.
pub fn fit_wrapped_line(
    x: &[f64],
    y: &[f64],
    circumference: f64,
    resolution: f64,
) -> Result<WrappedLine> {
    validate_points(x, y, circumference, resolution)?;

    let step = circumference / GRID_POINTS as f64;
    let slope = grid_search(0.0, step, resolution, |m| {
        circular_spread(x, y, m, circumference)
    });

    let min_x = x.iter().copied().fold(f64::INFINITY, f64::min);
    let start = circumference / 2.0 - slope * min_x;
    let intercept = grid_search(start, step, resolution, |t| {
        wrapped_rms(
            x,
            y,
            WrappedLine {
                slope,
                intercept: t,
            },
            circumference,
        )
    });
    debug!(slope, intercept, points = x.len(), "wrapped grid fit");

    let coarse = WrappedLine { slope, intercept };
    let unwrapped = unwrap_to_line(x, y, coarse, circumference);
    let refined = least_squares(x, &unwrapped)?;
    debug!(
        slope = refined.slope,
        intercept = refined.intercept,
        "unwrapped least-squares fit"
    );
    Ok(refined)
}

/// Shift each `y` by the multiple of `circumference` closest to `line`.
pub fn unwrap_to_line(x: &[f64], y: &[f64], line: WrappedLine, circumference: f64) -> Vec<f64> {
    x.iter()
        .zip(y)
        .map(|(&xi, &yi)| {
            let k = ((line.value_at(xi) - yi) / circumference).round();
            yi + k * circumference
        })
        .collect()
}
