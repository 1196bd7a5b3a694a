//! Coarse-to-fine fit of a clipped sinusoid `max(0, a sin(b t + c) + d)`.
//!
//! The fit minimizes the sum of absolute deviations, which keeps isolated
//! activity bursts from dragging the curve. A pyramid of smoothed, halved
//! copies of the whole signal is built first; the coarsest level is fitted
//! from a data-driven initial guess, and each finer level starts from the
//! parameters of the level above it. The original resolution is always the
//! last level fitted.

use crate::config::SineFitConfig;
use crate::error::{AnalysisError, Result};
use crate::helpers::{max_value, upper_median};
use crate::optimize::{minimize_bounded, Bounds};
use crate::signal::{convolve_zero_padded, Signal};
use crate::smoothing::gaussian_kernel;
use crate::time::TimeInterval;
use nalgebra::DVector;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use tracing::debug;

/// Parameters of `f(t) = max(0, a sin(b t + c) + d)` with `t` in samples.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FitParameters {
    /// `a`
    pub amplitude: f64,
    /// `b`, radians per sample
    pub angular_frequency: f64,
    /// `c`, radians
    pub phase: f64,
    /// `d`
    pub offset: f64,
}

impl FitParameters {
    fn from_array(p: [f64; 4]) -> Self {
        Self {
            amplitude: p[0],
            angular_frequency: p[1],
            phase: p[2],
            offset: p[3],
        }
    }

    fn to_array(self) -> [f64; 4] {
        [
            self.amplitude,
            self.angular_frequency,
            self.phase,
            self.offset,
        ]
    }

    /// Model value at sample position `t`.
    pub fn evaluate(&self, t: f64) -> f64 {
        (self.amplitude * (self.angular_frequency * t + self.phase).sin() + self.offset).max(0.0)
    }

    /// Period of the model in samples.
    pub fn period_samples(&self) -> f64 {
        2.0 * PI / self.angular_frequency
    }
}

/// Output of [`fit_sine`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SineFitResult {
    pub parameters: FitParameters,
    /// Recovered period `2 pi / (b / interval)`
    pub period: TimeInterval,
    /// L1 cost at the original resolution
    pub cost: f64,
    /// Number of pyramid levels fitted
    pub levels: usize,
    /// Model evaluated over the whole signal
    pub curve: Signal,
}

/// One pyramid level; sample `i` stands for original position `factor * i`.
#[derive(Debug, Clone)]
struct PyramidLevel {
    data: Vec<f64>,
    factor: usize,
}

impl PyramidLevel {
    fn smoothed(&self, sigma: f64) -> Self {
        let kernel = gaussian_kernel(sigma);
        Self {
            data: convolve_zero_padded(&self.data, &kernel),
            factor: self.factor,
        }
    }

    /// Pairwise means; a trailing odd sample is dropped.
    fn halved(&self) -> Self {
        Self {
            data: self
                .data
                .chunks_exact(2)
                .map(|pair| (pair[0] + pair[1]) / 2.0)
                .collect(),
            factor: self.factor * 2,
        }
    }

    /// Level-local bounds of the caller's selection.
    fn window(&self, from: usize, to: usize) -> (usize, usize) {
        let f = from / self.factor;
        let t = (to / self.factor).min(self.data.len());
        (f, t.max(f))
    }

    fn cost(&self, from: usize, to: usize, params: &FitParameters) -> f64 {
        let (f, t) = self.window(from, to);
        self.data[f..t]
            .iter()
            .enumerate()
            .map(|(k, &v)| (v - params.evaluate(((f + k) * self.factor) as f64)).abs())
            .sum()
    }
}

/// Number of levels such that the coarsest one is no longer than
/// `max_level_length` (always at least one).
fn pyramid_depth(len: usize, max_level_length: usize) -> usize {
    let mut l = len;
    let mut n = 1;
    loop {
        l /= 2;
        if l <= max_level_length {
            return n;
        }
        n += 1;
    }
}

fn build_pyramid(
    signal: &Signal,
    from: usize,
    to: usize,
    max_level_length: usize,
) -> Vec<PyramidLevel> {
    let n = pyramid_depth(signal.len(), max_level_length);
    let mut pyramid = vec![PyramidLevel {
        data: signal.values().to_vec(),
        factor: 1,
    }];
    if n == 1 {
        return pyramid;
    }
    let sigma = signal.samples_per_period() as f64 / 30.0 / (n - 1) as f64;
    for _ in 1..n {
        let next = pyramid[pyramid.len() - 1].smoothed(sigma).halved();
        let (f, t) = next.window(from, to);
        // Short selections cannot be fitted on very coarse levels.
        if t - f < 2 {
            break;
        }
        pyramid.push(next);
    }
    pyramid
}

/// Initial guess and box constraints, derived from the coarsest level.
#[derive(Debug, Clone, Copy)]
struct ParameterBox {
    initial: [f64; 4],
    lower: [f64; 4],
    upper: [f64; 4],
}

impl ParameterBox {
    fn from_level(level: &PyramidLevel, from: usize, to: usize, spp: usize) -> Result<Self> {
        let (f, t) = level.window(from, to);
        let data = &level.data[f..t];
        let (maximum, median) = match (max_value(data), upper_median(data)) {
            (Some(m), Some(med)) => (m, med),
            _ => return Err(AnalysisError::insufficient(2, data.len())),
        };
        if !(maximum > 0.0 && maximum.is_finite()) {
            return Err(AnalysisError::degenerate(
                "selection has no positive activity to fit",
            ));
        }
        let b = 2.0 * PI / spp as f64;
        Ok(Self {
            initial: [maximum, b, 0.0, 0.0],
            lower: [median, 0.5 * b, 0.0, -maximum],
            upper: [2.0 * maximum, 1.5 * b, spp as f64, maximum],
        })
    }
}

/// Affine map between optimizer coordinates and model parameters.
///
/// The origin sits on the current guess, and every axis is stretched so
/// that its admissible span equals the widest span of all axes.
struct Normalization {
    origin: [f64; 4],
    factor: [f64; 4],
}

impl Normalization {
    fn new(origin: [f64; 4], bounds: &ParameterBox) -> Self {
        let spans: Vec<f64> = (0..4)
            .map(|i| (bounds.upper[i] - bounds.lower[i]).abs())
            .collect();
        let ax = spans.iter().copied().fold(0.0, f64::max);
        let mut factor = [1.0; 4];
        for i in 0..4 {
            if spans[i] > 0.0 {
                factor[i] = ax / spans[i];
            }
        }
        Self { origin, factor }
    }

    fn bounds(&self, b: &ParameterBox) -> Result<Bounds> {
        let scaled = |edge: &[f64; 4]| {
            DVector::from_iterator(4, (0..4).map(|i| (edge[i] - self.origin[i]) * self.factor[i]))
        };
        let lower = scaled(&b.lower);
        let upper = scaled(&b.upper);
        Bounds::new(lower, upper)
    }

    fn parameters(&self, x: &DVector<f64>) -> FitParameters {
        let mut p = [0.0; 4];
        for i in 0..4 {
            p[i] = self.origin[i] + x[i] / self.factor[i];
        }
        FitParameters::from_array(p)
    }
}

/// Fit `max(0, a sin(b t + c) + d)` to `signal[from..to]`.
///
/// The pyramid is built from the whole signal; only the selection enters
/// the cost. Fails with `DegenerateSignal` if the selection carries no
/// positive activity.
pub fn fit_sine(
    signal: &Signal,
    from: usize,
    to: usize,
    config: &SineFitConfig,
) -> Result<SineFitResult> {
    config.validate()?;
    signal.check_range(from, to)?;
    if to - from < 2 {
        return Err(AnalysisError::insufficient(2, to - from));
    }

    let spp = signal.samples_per_period();
    let pyramid = build_pyramid(signal, from, to, config.max_level_length);
    let coarsest = &pyramid[pyramid.len() - 1];
    let bounds = ParameterBox::from_level(coarsest, from, to, spp)?;
    let powell = config.powell();

    let mut current = bounds.initial;
    let mut cost = f64::INFINITY;
    for (index, level) in pyramid.iter().enumerate().rev() {
        let norm = Normalization::new(current, &bounds);
        let box_constraints = norm.bounds(&bounds)?;
        let outcome = minimize_bounded(
            |x: &DVector<f64>| level.cost(from, to, &norm.parameters(x)),
            &DVector::zeros(4),
            &box_constraints,
            &powell,
        )?;
        current = norm.parameters(&outcome.best.point).to_array();
        cost = outcome.best.value;
        debug!(
            level = index,
            factor = level.factor,
            cost,
            iterations = outcome.iterations,
            evaluations = outcome.evaluations,
            "fitted pyramid level"
        );
    }

    let parameters = FitParameters::from_array(current);
    let period = TimeInterval::from_millis(
        2.0 * PI / (parameters.angular_frequency / signal.interval().millis),
    );
    let values: Vec<f64> = (0..signal.len())
        .map(|i| parameters.evaluate(i as f64))
        .collect();
    let curve = Signal::new("fitted", values, spp, signal.interval(), signal.unit())?;

    Ok(SineFitResult {
        parameters,
        period,
        cost,
        levels: pyramid.len(),
        curve,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::TimeUnit;

    fn clipped_sine(n: usize, spp: usize, a: f64, c: f64, d: f64) -> Signal {
        let b = 2.0 * PI / spp as f64;
        let values = (0..n)
            .map(|i| (a * (b * i as f64 + c).sin() + d).max(0.0))
            .collect();
        Signal::new(
            "sine",
            values,
            spp,
            TimeInterval::new(15.0, TimeUnit::Minutes),
            TimeUnit::Hours,
        )
        .unwrap()
    }

    #[test]
    fn test_pyramid_depth() {
        assert_eq!(pyramid_depth(960, 1000), 1);
        assert_eq!(pyramid_depth(2001, 1000), 1);
        assert_eq!(pyramid_depth(2002, 1000), 2);
        assert_eq!(pyramid_depth(14400, 1000), 4);
    }

    #[test]
    fn test_pyramid_levels_halve() {
        let s = clipped_sine(3001, 96, 10.0, 0.0, 0.0);
        let pyramid = build_pyramid(&s, 0, 3001, 1000);
        assert_eq!(pyramid.len(), 2);
        assert_eq!(pyramid[1].data.len(), 1500);
        assert_eq!(pyramid[1].factor, 2);
    }

    #[test]
    fn test_evaluate_clips_at_zero() {
        let p = FitParameters {
            amplitude: 2.0,
            angular_frequency: PI / 2.0,
            phase: 0.0,
            offset: -1.0,
        };
        assert!((p.evaluate(1.0) - 1.0).abs() < 1e-12);
        assert_eq!(p.evaluate(3.0), 0.0);
        assert!((p.period_samples() - 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_recovers_clipped_sine() {
        let s = clipped_sine(960, 96, 10.0, 1.0, 2.0);
        let res = fit_sine(&s, 0, 960, &SineFitConfig::default()).unwrap();
        assert_eq!(res.levels, 1);
        assert!(
            (res.parameters.amplitude - 10.0).abs() < 0.5,
            "amplitude {}",
            res.parameters.amplitude
        );
        let hours = res.period.in_unit(TimeUnit::Hours);
        assert!((hours - 24.0).abs() < 0.48, "period {hours}");
        assert_eq!(res.curve.name(), "fitted");
        assert_eq!(res.curve.len(), 960);
    }

    #[test]
    fn test_fit_through_pyramid() {
        let s = clipped_sine(2880, 96, 5.0, 2.0, 1.0);
        let res = fit_sine(&s, 0, 2880, &SineFitConfig::default()).unwrap();
        assert_eq!(res.levels, 2);
        let hours = res.period.in_unit(TimeUnit::Hours);
        assert!((hours - 24.0).abs() < 0.48, "period {hours}");
        assert!((res.parameters.amplitude - 5.0).abs() < 0.5);
    }

    #[test]
    fn test_no_activity_is_degenerate() {
        let s = Signal::new(
            "zero",
            vec![0.0; 500],
            50,
            TimeInterval::new(1.0, TimeUnit::Minutes),
            TimeUnit::Hours,
        )
        .unwrap();
        assert!(matches!(
            fit_sine(&s, 0, 500, &SineFitConfig::default()),
            Err(AnalysisError::DegenerateSignal(_))
        ));
    }

    #[test]
    fn test_short_selection_rejected() {
        let s = clipped_sine(100, 10, 1.0, 0.0, 0.0);
        assert!(fit_sine(&s, 5, 6, &SineFitConfig::default()).is_err());
        assert!(fit_sine(&s, 50, 200, &SineFitConfig::default()).is_err());
    }
}
