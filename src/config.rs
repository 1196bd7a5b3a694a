//! Parameter records for the analyses.
//!
//! Durations (periods, smoothing sigmas) are given in the display unit of
//! the analyzed signal and converted to samples with
//! [`Signal::samples_for`]. All records are serde-serializable so a host
//! application can persist them in any format.

use crate::error::{AnalysisError, Result};
use crate::onoffset::ThresholdMethod;
use crate::optimize::PowellConfig;
use crate::periodogram::PeriodogramMethod;
use crate::signal::Signal;
use serde::{Deserialize, Serialize};

fn check_sigma(name: &str, sigma: f64) -> Result<()> {
    if !sigma.is_finite() || sigma < 0.0 {
        return Err(AnalysisError::invalid(format!(
            "{name} must be finite and non-negative, got {sigma}"
        )));
    }
    Ok(())
}

fn check_period(name: &str, period: Option<f64>) -> Result<()> {
    match period {
        Some(p) if !p.is_finite() || p <= 0.0 => Err(AnalysisError::invalid(format!(
            "{name} must be positive, got {p}"
        ))),
        _ => Ok(()),
    }
}

/// Period override in the signal's unit, or its nominal samples per period.
fn period_samples_or_nominal(period: Option<f64>, signal: &Signal) -> usize {
    period
        .map(|p| signal.samples_for(p).round().max(0.0) as usize)
        .unwrap_or_else(|| signal.samples_per_period())
}

/// Periodogram parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PeriodogramConfig {
    pub method: PeriodogramMethod,
    /// Shortest candidate period; `None` means two thirds of the nominal period
    pub from_period: Option<f64>,
    /// Longest candidate period (exclusive); `None` means four thirds of it
    pub to_period: Option<f64>,
    /// Number of peaks to report
    pub n_peaks: usize,
    /// Gaussian pre-smoothing sigma; 0 disables smoothing
    pub smoothing_sigma: f64,
    /// Downsampling factor applied after smoothing
    pub step_size: usize,
    /// Significance level
    pub p_level: f64,
}

impl Default for PeriodogramConfig {
    fn default() -> Self {
        Self {
            method: PeriodogramMethod::Fourier,
            from_period: None,
            to_period: None,
            n_peaks: 1,
            smoothing_sigma: 0.0,
            step_size: 1,
            p_level: 0.05,
        }
    }
}

impl PeriodogramConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.p_level > 0.0 && self.p_level < 1.0) {
            return Err(AnalysisError::invalid(format!(
                "p level must lie in (0, 1), got {}",
                self.p_level
            )));
        }
        if self.step_size == 0 {
            return Err(AnalysisError::invalid("step size must be at least 1"));
        }
        if self.n_peaks == 0 {
            return Err(AnalysisError::invalid("at least one peak must be requested"));
        }
        check_sigma("smoothing sigma", self.smoothing_sigma)?;
        check_period("from period", self.from_period)?;
        check_period("to period", self.to_period)?;
        if let (Some(from), Some(to)) = (self.from_period, self.to_period) {
            if from >= to {
                return Err(AnalysisError::invalid(format!(
                    "empty candidate period range [{from}, {to})"
                )));
            }
        }
        Ok(())
    }

    /// Candidate period range in the signal's unit.
    pub fn period_range(&self, signal: &Signal) -> (f64, f64) {
        let nominal = signal.period().in_unit(signal.unit());
        (
            self.from_period.unwrap_or(nominal - nominal / 3.0),
            self.to_period.unwrap_or(nominal + nominal / 3.0),
        )
    }
}

/// Onset/offset detection parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OnsetOffsetConfig {
    /// Gaussian pre-smoothing sigma; 0 disables smoothing
    pub smoothing_sigma: f64,
    pub threshold: ThresholdMethod,
    /// Period override; `None` uses the signal's nominal period
    pub period: Option<f64>,
}

impl Default for OnsetOffsetConfig {
    fn default() -> Self {
        Self {
            smoothing_sigma: 5.0,
            threshold: ThresholdMethod::MedianWithoutZero,
            period: None,
        }
    }
}

impl OnsetOffsetConfig {
    pub fn validate(&self) -> Result<()> {
        check_sigma("smoothing sigma", self.smoothing_sigma)?;
        check_period("period", self.period)?;
        self.threshold.validate()
    }

    pub fn period_samples(&self, signal: &Signal) -> usize {
        period_samples_or_nominal(self.period, signal)
    }
}

/// Average activity parameters.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AverageActivityConfig {
    /// Period override; `None` uses the signal's nominal period
    pub period: Option<f64>,
    pub smoothing_sigma: f64,
}

impl AverageActivityConfig {
    pub fn validate(&self) -> Result<()> {
        check_sigma("smoothing sigma", self.smoothing_sigma)?;
        check_period("period", self.period)
    }

    pub fn period_samples(&self, signal: &Signal) -> usize {
        period_samples_or_nominal(self.period, signal)
    }
}

/// Sine fit parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SineFitConfig {
    pub tolerance_x: f64,
    pub tolerance_fx: f64,
    pub max_iterations: usize,
    /// The coarsest pyramid level is no longer than this
    pub max_level_length: usize,
}

impl Default for SineFitConfig {
    fn default() -> Self {
        Self {
            tolerance_x: 0.01,
            tolerance_fx: 0.01,
            max_iterations: 200,
            max_level_length: 1000,
        }
    }
}

impl SineFitConfig {
    pub fn validate(&self) -> Result<()> {
        for (name, tol) in [
            ("tolerance_x", self.tolerance_x),
            ("tolerance_fx", self.tolerance_fx),
        ] {
            if !tol.is_finite() || tol <= 0.0 {
                return Err(AnalysisError::invalid(format!(
                    "{name} must be positive, got {tol}"
                )));
            }
        }
        if self.max_iterations == 0 {
            return Err(AnalysisError::invalid("max_iterations must be at least 1"));
        }
        if self.max_level_length == 0 {
            return Err(AnalysisError::invalid("max_level_length must be at least 1"));
        }
        Ok(())
    }

    pub fn powell(&self) -> PowellConfig {
        PowellConfig {
            tolerance_x: self.tolerance_x,
            tolerance_fx: self.tolerance_fx,
            max_iterations: self.max_iterations,
        }
    }
}

/// All analysis parameters of one session.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub periodogram: PeriodogramConfig,
    pub onset_offset: OnsetOffsetConfig,
    pub average_activity: AverageActivityConfig,
    pub sine_fit: SineFitConfig,
}

impl AnalysisConfig {
    pub fn validate(&self) -> Result<()> {
        self.periodogram.validate()?;
        self.onset_offset.validate()?;
        self.average_activity.validate()?;
        self.sine_fit.validate()
    }
}
