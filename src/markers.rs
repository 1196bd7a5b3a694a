//! Marker series (onsets, offsets, acrophases) and their phase drift.

use crate::error::{AnalysisError, Result};
use crate::onoffset::OnsetOffsetSeries;
use crate::periodic_line::{fit_wrapped_line, RegressionLine};
use crate::signal::Signal;
use crate::time::TimeInterval;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Grid resolution of the drift fit, in milliseconds.
const DRIFT_RESOLUTION_MS: f64 = 1.0;

/// Named sample positions with the sampling interval that places them in time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkerSeries {
    name: String,
    positions: Vec<usize>,
    calibration_millis: f64,
}

impl MarkerSeries {
    pub fn new(
        name: impl Into<String>,
        positions: Vec<usize>,
        calibration_millis: f64,
    ) -> Result<Self> {
        if !calibration_millis.is_finite() || calibration_millis <= 0.0 {
            return Err(AnalysisError::invalid(format!(
                "calibration must be positive, got {calibration_millis}"
            )));
        }
        Ok(Self {
            name: name.into(),
            positions,
            calibration_millis,
        })
    }

    /// Markers at sample positions of `signal`.
    pub fn from_signal(name: impl Into<String>, positions: Vec<usize>, signal: &Signal) -> Self {
        Self {
            name: name.into(),
            positions,
            calibration_millis: signal.interval().millis,
        }
    }

    /// Onset and offset series of a detector run on `signal`.
    pub fn from_onsets_offsets(series: &OnsetOffsetSeries, signal: &Signal) -> (Self, Self) {
        (
            Self::from_signal(
                format!("{}_onsets", signal.name()),
                series.onsets.clone(),
                signal,
            ),
            Self::from_signal(
                format!("{}_offsets", signal.name()),
                series.offsets.clone(),
                signal,
            ),
        )
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn positions(&self) -> &[usize] {
        &self.positions
    }

    pub fn calibration_millis(&self) -> f64 {
        self.calibration_millis
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Time of marker `i` from the start of the recording; `None` past the
    /// last marker.
    pub fn time_at(&self, i: usize) -> Option<TimeInterval> {
        self.positions
            .get(i)
            .map(|&p| TimeInterval::from_millis(p as f64 * self.calibration_millis))
    }

    /// `(period index, millis within the period)` for every marker.
    pub fn phase_points(&self, period: TimeInterval) -> Vec<(f64, f64)> {
        let t = period.millis;
        self.positions
            .iter()
            .map(|&p| {
                let millis = p as f64 * self.calibration_millis;
                ((millis / t).floor(), millis.rem_euclid(t))
            })
            .collect()
    }

    /// Drift line of the markers across periods of length `period`.
    ///
    /// # Errors
    /// `InvalidParameter` for a non-positive period, `InsufficientData` for
    /// fewer than two markers, `DegenerateSignal` when every marker falls
    /// into the same period.
    pub fn regression(&self, period: TimeInterval) -> Result<RegressionLine> {
        if !period.millis.is_finite() || period.millis <= 0.0 {
            return Err(AnalysisError::invalid(format!(
                "period must be positive, got {} ms",
                period.millis
            )));
        }
        let (x, y): (Vec<f64>, Vec<f64>) = self.phase_points(period).into_iter().unzip();
        let line = fit_wrapped_line(&x, &y, period.millis, DRIFT_RESOLUTION_MS)?;

        let first = x.iter().copied().fold(f64::INFINITY, f64::min) as i64;
        let last = x.iter().copied().fold(f64::NEG_INFINITY, f64::max) as i64;
        debug!(
            markers = self.name.as_str(),
            slope = line.slope,
            first,
            last,
            "marker drift"
        );
        Ok(RegressionLine {
            slope: line.slope,
            intercept: line.intercept,
            first_period: first,
            last_period: last,
        })
    }
}
