//! Periodic activity signals and their transforms.
//!
//! A [`Signal`] is an immutable, regularly sampled series with a declared
//! number of samples per period (e.g. 1440 for one-minute bins over a 24h
//! day). Transforms (downsample, convolve, sum, average, normalize) always
//! return new signals; the only in-place operation is the crate-private
//! scaling used while accumulating averages and normalizations.

use crate::error::{AnalysisError, Result};
use crate::helpers::{ieee_remainder, RESAMPLE_TOL};
use crate::smoothing::gaussian_kernel;
use crate::time::{TimeInterval, TimeUnit};
use serde::{Deserialize, Serialize};

/// A regularly sampled activity series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    name: String,
    values: Vec<f64>,
    samples_per_period: usize,
    interval: TimeInterval,
    unit: TimeUnit,
}

impl Signal {
    /// Create a signal.
    ///
    /// # Arguments
    /// * `name` - Label used for identification only
    /// * `values` - Samples, oldest first
    /// * `samples_per_period` - Samples in one nominal period (must be > 0)
    /// * `interval` - Time between consecutive samples (must be positive)
    /// * `unit` - Unit in which periods and durations are displayed
    pub fn new(
        name: impl Into<String>,
        values: Vec<f64>,
        samples_per_period: usize,
        interval: TimeInterval,
        unit: TimeUnit,
    ) -> Result<Self> {
        if samples_per_period == 0 {
            return Err(AnalysisError::invalid("samples per period must be positive"));
        }
        if !interval.millis.is_finite() || interval.millis <= 0.0 {
            return Err(AnalysisError::invalid(format!(
                "sampling interval must be positive, got {} ms",
                interval.millis
            )));
        }
        Ok(Self {
            name: name.into(),
            values,
            samples_per_period,
            interval,
            unit,
        })
    }

    /// Copy of this signal under a new name.
    pub fn renamed(&self, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..self.clone()
        }
    }

    /// Same sampling as `self`, different data. Used by transforms.
    fn with_values(&self, name: String, values: Vec<f64>) -> Self {
        Self {
            name,
            values,
            samples_per_period: self.samples_per_period,
            interval: self.interval,
            unit: self.unit,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn samples_per_period(&self) -> usize {
        self.samples_per_period
    }

    pub fn interval(&self) -> TimeInterval {
        self.interval
    }

    pub fn unit(&self) -> TimeUnit {
        self.unit
    }

    /// Duration of one nominal period.
    pub fn period(&self) -> TimeInterval {
        self.interval.mul(self.samples_per_period as f64)
    }

    /// Nearest sample index for a time offset from the recording start.
    pub fn index_for_time(&self, time: TimeInterval) -> usize {
        (time.millis / self.interval.millis).round().max(0.0) as usize
    }

    /// Start time of the sample at `index`.
    pub fn time_for_index(&self, index: usize) -> TimeInterval {
        self.interval.mul(index as f64)
    }

    /// Number of samples (possibly fractional) spanned by `value` given in
    /// this signal's display unit.
    pub fn samples_for(&self, value: f64) -> f64 {
        value * self.unit.millis() / self.interval.millis
    }

    /// Validate a half-open selection `[from, to)` against this signal.
    pub fn check_range(&self, from: usize, to: usize) -> Result<()> {
        if from >= to {
            return Err(AnalysisError::invalid(format!(
                "empty selection [{from}, {to})"
            )));
        }
        if to > self.values.len() {
            return Err(AnalysisError::invalid(format!(
                "selection end {to} exceeds signal length {}",
                self.values.len()
            )));
        }
        Ok(())
    }

    /// The samples in `[from, to)`.
    pub fn selection(&self, from: usize, to: usize) -> Result<&[f64]> {
        self.check_range(from, to)?;
        Ok(&self.values[from..to])
    }

    /// Sum of all samples.
    pub fn total_activity(&self) -> f64 {
        self.values.iter().sum()
    }

    /// Resample by `factor`.
    ///
    /// `factor` must divide `samples_per_period` up to a tolerance of `1e-6`
    /// (IEEE remainder), so that period boundaries stay aligned. Integral
    /// factors average blocks of `factor` samples and drop an incomplete
    /// trailing block; fractional factors integrate the prefix sum so each
    /// output sample is the exact mean of the interval it covers.
    ///
    /// # Returns
    /// A signal with `round(samples_per_period / factor)` samples per period
    /// and an interval `factor` times longer.
    pub fn downsample(&self, factor: f64) -> Result<Signal> {
        if !factor.is_finite() || factor <= 0.0 {
            return Err(AnalysisError::invalid(format!(
                "downsampling factor must be positive, got {factor}"
            )));
        }
        let rem = ieee_remainder(self.samples_per_period as f64, factor);
        if rem.abs() > RESAMPLE_TOL {
            return Err(AnalysisError::invalid(format!(
                "downsampling factor {factor} does not divide {} samples per period",
                self.samples_per_period
            )));
        }
        if factor == factor.trunc() {
            Ok(self.downsample_blocks(factor as usize))
        } else {
            Ok(self.downsample_fractional(factor))
        }
    }

    fn downsample_blocks(&self, factor: usize) -> Signal {
        let values: Vec<f64> = self
            .values
            .chunks_exact(factor)
            .map(|block| block.iter().sum::<f64>() / factor as f64)
            .collect();
        Signal {
            name: self.name.clone(),
            values,
            samples_per_period: self.samples_per_period / factor,
            interval: self.interval.mul(factor as f64),
            unit: self.unit,
        }
    }

    fn downsample_fractional(&self, factor: f64) -> Signal {
        let n = self.values.len();
        let out_len = (n as f64 / factor).ceil() as usize;

        let mut cum_old = vec![0.0; n + 1];
        for (i, &v) in self.values.iter().enumerate() {
            cum_old[i + 1] = cum_old[i] + v;
        }

        // cum_new tracks the integral already assigned to earlier outputs.
        let mut cum_new = 0.0;
        let mut values = Vec::with_capacity(out_len);
        for k in 0..out_len {
            let end = (k + 1) as f64 * factor;
            let whole = end.floor() as usize;
            let partial = end - whole as f64;
            let mut mass = cum_old[whole.min(n)] - cum_new;
            if partial > RESAMPLE_TOL && whole < n {
                mass += partial * self.values[whole];
            }
            values.push(mass / factor);
            cum_new += mass;
        }

        Signal {
            name: self.name.clone(),
            values,
            samples_per_period: (self.samples_per_period as f64 / factor).round() as usize,
            interval: self.interval.mul(factor),
            unit: self.unit,
        }
    }

    /// Correlate with a centered, odd-length kernel.
    ///
    /// Samples outside the signal count as zero; the output has the same
    /// length as the input.
    pub fn convolve(&self, kernel: &[f64]) -> Result<Signal> {
        if kernel.is_empty() || kernel.len() % 2 == 0 {
            return Err(AnalysisError::invalid(format!(
                "kernel length must be odd, got {}",
                kernel.len()
            )));
        }
        Ok(self.with_values(
            format!("{}_smoothed", self.name),
            convolve_zero_padded(&self.values, kernel),
        ))
    }

    /// Gaussian smoothing with standard deviation `sigma` (in samples).
    ///
    /// Returns an unchanged copy for `sigma <= 0`.
    pub fn smooth(&self, sigma: f64) -> Signal {
        if !sigma.is_finite() || sigma <= 0.0 {
            return self.clone();
        }
        let kernel = gaussian_kernel(sigma);
        self.with_values(
            format!("{}_smoothed", self.name),
            convolve_zero_padded(&self.values, &kernel),
        )
    }

    /// Element-wise sum of compatible signals.
    ///
    /// All signals must share samples per period, interval and unit. The
    /// result is as long as the longest input; shorter inputs contribute
    /// zero past their end.
    pub fn sum(signals: &[Signal]) -> Result<Signal> {
        let first = signals
            .first()
            .ok_or_else(|| AnalysisError::invalid("no signals to sum"))?;

        for s in &signals[1..] {
            if s.samples_per_period != first.samples_per_period {
                return Err(AnalysisError::IncompatibleSignals(format!(
                    "'{}' has {} samples per period, '{}' has {}",
                    s.name, s.samples_per_period, first.name, first.samples_per_period
                )));
            }
            if s.interval != first.interval {
                return Err(AnalysisError::IncompatibleSignals(format!(
                    "'{}' is sampled every {}, '{}' every {}",
                    s.name, s.interval, first.name, first.interval
                )));
            }
            if s.unit != first.unit {
                return Err(AnalysisError::IncompatibleSignals(format!(
                    "'{}' uses unit {}, '{}' uses {}",
                    s.name, s.unit, first.name, first.unit
                )));
            }
        }

        let len = signals.iter().map(Signal::len).max().unwrap_or(0);
        let mut values = vec![0.0; len];
        for s in signals {
            for (acc, &v) in values.iter_mut().zip(s.values.iter()) {
                *acc += v;
            }
        }
        Ok(first.with_values("#sum".to_string(), values))
    }

    /// Element-wise mean of compatible signals (see [`Signal::sum`]).
    pub fn average(signals: &[Signal]) -> Result<Signal> {
        let mut res = Self::sum(signals)?;
        res.scale_in_place(1.0 / signals.len() as f64);
        res.name = "#average".to_string();
        Ok(res)
    }

    /// Multiply every sample by `factor`, in place.
    ///
    /// Only called on signals this crate has just created and not yet shared.
    pub(crate) fn scale_in_place(&mut self, factor: f64) {
        for v in self.values.iter_mut() {
            *v *= factor;
        }
    }

    /// Copy of this signal rescaled so its total activity equals that of
    /// `reference`.
    pub fn normalize_to(&self, reference: &Signal) -> Result<Signal> {
        let own = self.total_activity();
        if own == 0.0 || !own.is_finite() {
            return Err(AnalysisError::degenerate(format!(
                "'{}' has no total activity to normalize",
                self.name
            )));
        }
        let mut res = self.renamed(format!("{}_normalized", self.name));
        res.scale_in_place(reference.total_activity() / own);
        Ok(res)
    }

    /// Normalize every signal to the total activity of `signals[reference]`.
    ///
    /// The reference itself is returned as an unscaled copy.
    pub fn normalize_group(signals: &[Signal], reference: usize) -> Result<Vec<Signal>> {
        if signals.len() < 2 {
            return Err(AnalysisError::invalid(
                "at least two signals are required for normalization",
            ));
        }
        let ref_signal = signals.get(reference).ok_or_else(|| {
            AnalysisError::invalid(format!(
                "reference index {reference} out of range for {} signals",
                signals.len()
            ))
        })?;

        signals
            .iter()
            .enumerate()
            .map(|(i, s)| {
                if i == reference {
                    Ok(s.renamed(format!("{}_normalized", s.name)))
                } else {
                    s.normalize_to(ref_signal)
                }
            })
            .collect()
    }
}

/// Zero-padded correlation of `data` with a centered odd-length kernel.
pub(crate) fn convolve_zero_padded(data: &[f64], kernel: &[f64]) -> Vec<f64> {
    let n = data.len();
    let half = kernel.len() / 2;
    let mut out = vec![0.0; n];
    for (i, o) in out.iter_mut().enumerate() {
        let mut acc = 0.0;
        for (j, &w) in kernel.iter().enumerate() {
            // index i + j - half, skipped when outside [0, n)
            let idx = i + j;
            if idx < half || idx - half >= n {
                continue;
            }
            acc += w * data[idx - half];
        }
        *o = acc;
    }
    out
}
