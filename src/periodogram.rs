//! Periodograms over a range of candidate periods.
//!
//! Three methods share one capability, [`Periodogram`]:
//! - **Fourier**: squared amplitude of the discrete Fourier coefficient
//!   evaluated directly at the (generally fractional) frequency `N / P`
//! - **Chi-Square** (Enright): variance of the phase means folded at `P`
//! - **Lomb-Scargle**: phase-corrected normalized sine/cosine projections
//!
//! Candidate periods are given in samples. A method is selected at call
//! time through [`PeriodogramMethod`]; [`periodogram`] evaluates one
//! statistic per candidate and the method's significance threshold, and
//! [`compute_periodogram`] adds the smoothing/downsampling front end.

use crate::config::PeriodogramConfig;
use crate::distributions::chi_square_quantile;
use crate::error::{AnalysisError, Result};
use crate::helpers::mean_and_variance;
use crate::iter_maybe_parallel;
use crate::peaks::find_peaks;
use crate::signal::Signal;
use crate::time::{TimeInterval, TimeUnit};
#[cfg(feature = "parallel")]
use rayon::iter::ParallelIterator;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::ops::Range;
use tracing::debug;

/// Available periodogram methods.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PeriodogramMethod {
    #[default]
    Fourier,
    ChiSquare,
    LombScargle,
}

impl PeriodogramMethod {
    pub const ALL: [PeriodogramMethod; 3] = [
        PeriodogramMethod::Fourier,
        PeriodogramMethod::ChiSquare,
        PeriodogramMethod::LombScargle,
    ];

    /// Display name of the method.
    pub fn name(self) -> &'static str {
        match self {
            PeriodogramMethod::Fourier => "Fourier",
            PeriodogramMethod::ChiSquare => "Chi-Square",
            PeriodogramMethod::LombScargle => "Lomb-Scargle",
        }
    }

    /// Name of the statistic the method reports.
    pub fn response_name(self) -> &'static str {
        match self {
            PeriodogramMethod::Fourier => "R^2",
            PeriodogramMethod::ChiSquare => "Qp",
            PeriodogramMethod::LombScargle => "PN",
        }
    }

    /// Instantiate the method over `data`.
    ///
    /// Fails with [`AnalysisError::DegenerateSignal`] if the method needs a
    /// non-zero variance and `data` is constant.
    pub fn build<'a>(self, data: &'a [f64], p_level: f64) -> Result<Box<dyn Periodogram + 'a>> {
        Ok(match self {
            PeriodogramMethod::Fourier => Box::new(FourierPeriodogram::new(data, p_level)?),
            PeriodogramMethod::ChiSquare => Box::new(ChiSquarePeriodogram::new(data, p_level)?),
            PeriodogramMethod::LombScargle => {
                Box::new(LombScarglePeriodogram::new(data, p_level)?)
            }
        })
    }
}

/// Capability shared by all periodogram methods.
pub trait Periodogram: Sync {
    fn method(&self) -> PeriodogramMethod;

    fn method_name(&self) -> &'static str {
        self.method().name()
    }

    fn response_name(&self) -> &'static str {
        self.method().response_name()
    }

    /// Minimum number of samples needed to evaluate every candidate in `periods`.
    fn min_samples(&self, periods: &Range<usize>) -> usize {
        periods.start
    }

    /// Statistic for one candidate period (in samples).
    fn compute_statistic(&self, period: usize) -> f64;

    /// Significance threshold for each candidate, given all statistics.
    fn compute_thresholds(&self, periods: &[usize], statistics: &[f64]) -> Vec<f64>;
}

fn non_degenerate_variance(data: &[f64]) -> Result<(f64, f64)> {
    let (mean, variance) = mean_and_variance(data)
        .ok_or_else(|| AnalysisError::insufficient(2, data.len()))?;
    if variance <= 0.0 || !variance.is_finite() {
        return Err(AnalysisError::degenerate(
            "selected data has zero variance",
        ));
    }
    Ok((mean, variance))
}

/// Fourier periodogram, `R^2 = a_j^2 + b_j^2` at frequency index `j = N / P`.
pub struct FourierPeriodogram<'a> {
    data: &'a [f64],
    p_level: f64,
}

impl<'a> FourierPeriodogram<'a> {
    pub fn new(data: &'a [f64], p_level: f64) -> Result<Self> {
        Ok(Self { data, p_level })
    }
}

impl Periodogram for FourierPeriodogram<'_> {
    fn method(&self) -> PeriodogramMethod {
        PeriodogramMethod::Fourier
    }

    fn compute_statistic(&self, period: usize) -> f64 {
        let n = self.data.len() as f64;
        let j = n / period as f64;
        let (mut aj, mut bj) = (0.0, 0.0);
        for (i, &x) in self.data.iter().enumerate() {
            let arg = 2.0 * PI * j * i as f64 / n;
            aj += x * arg.cos();
            bj += x * arg.sin();
        }
        aj *= 2.0 / n;
        bj *= 2.0 / n;
        aj * aj + bj * bj
    }

    /// One uniform bound `sum(R^2) * (1 - (p / N)^(1 / (N - 1)))`.
    fn compute_thresholds(&self, periods: &[usize], statistics: &[f64]) -> Vec<f64> {
        let n = self.data.len() as f64;
        let sum_r2: f64 = statistics.iter().sum();
        let bound = sum_r2 * (1.0 - (self.p_level / n).powf(1.0 / (n - 1.0)));
        vec![bound; periods.len()]
    }
}

/// Enright's chi-square periodogram.
pub struct ChiSquarePeriodogram<'a> {
    data: &'a [f64],
    mean: f64,
    variance: f64,
    p_level: f64,
}

impl<'a> ChiSquarePeriodogram<'a> {
    pub fn new(data: &'a [f64], p_level: f64) -> Result<Self> {
        let (mean, variance) = non_degenerate_variance(data)?;
        Ok(Self {
            data,
            mean,
            variance,
            p_level,
        })
    }
}

impl Periodogram for ChiSquarePeriodogram<'_> {
    fn method(&self) -> PeriodogramMethod {
        PeriodogramMethod::ChiSquare
    }

    /// Every candidate needs at least one complete cycle.
    fn min_samples(&self, periods: &Range<usize>) -> usize {
        periods.end.saturating_sub(1).max(periods.start)
    }

    fn compute_statistic(&self, period: usize) -> f64 {
        let k = self.data.len() / period;
        let mut qp = 0.0;
        for h in 0..period {
            let mut mh = 0.0;
            for c in 0..k {
                mh += self.data[h + c * period];
            }
            mh /= k as f64;
            let diff = mh - self.mean;
            qp += diff * diff;
        }
        qp * k as f64 / self.variance
    }

    /// Upper `1 - p` quantile of chi-square with `P` degrees of freedom.
    fn compute_thresholds(&self, periods: &[usize], _statistics: &[f64]) -> Vec<f64> {
        periods
            .iter()
            .map(|&p| chi_square_quantile(1.0 - self.p_level, p))
            .collect()
    }
}

/// Phase-corrected Lomb-Scargle periodogram on evenly spaced samples.
pub struct LombScarglePeriodogram<'a> {
    data: &'a [f64],
    mean: f64,
    variance: f64,
    p_level: f64,
}

impl<'a> LombScarglePeriodogram<'a> {
    pub fn new(data: &'a [f64], p_level: f64) -> Result<Self> {
        let (mean, variance) = non_degenerate_variance(data)?;
        Ok(Self {
            data,
            mean,
            variance,
            p_level,
        })
    }

    /// Time shift that centers the sine/cosine basis at `period`.
    fn phase_offset(&self, period: f64) -> f64 {
        let four_pi_by_p = 4.0 * PI / period;
        let (mut sin, mut cos) = (0.0, 0.0);
        for i in 0..self.data.len() {
            let t = i as f64 * four_pi_by_p;
            sin += t.sin();
            cos += t.cos();
        }
        cos.atan2(sin) / four_pi_by_p
    }
}

impl Periodogram for LombScarglePeriodogram<'_> {
    fn method(&self) -> PeriodogramMethod {
        PeriodogramMethod::LombScargle
    }

    fn compute_statistic(&self, period: usize) -> f64 {
        let p = period as f64;
        let delta = self.phase_offset(p);

        let (mut nom_c, mut den_c, mut nom_s, mut den_s) = (0.0, 0.0, 0.0, 0.0);
        for (i, &x) in self.data.iter().enumerate() {
            let resid = x - self.mean;
            let arg = 2.0 * PI * (i as f64 - delta) / p;
            let c = arg.cos();
            let s = arg.sin();
            nom_c += resid * c;
            nom_s += resid * s;
            den_c += c * c;
            den_s += s * s;
        }
        (nom_c * nom_c / den_c + nom_s * nom_s / den_s) / (2.0 * self.variance * self.variance)
    }

    /// One constant threshold `-ln(1 - (1 - p)^(1 / N))`.
    fn compute_thresholds(&self, periods: &[usize], _statistics: &[f64]) -> Vec<f64> {
        let n = self.data.len() as f64;
        let bound = -(1.0 - (1.0 - self.p_level).powf(1.0 / n)).ln();
        vec![bound; periods.len()]
    }
}

/// Output of one periodogram run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodogramResult {
    pub method: PeriodogramMethod,
    /// Candidate periods in samples of the analyzed (possibly downsampled) signal
    pub periods: Vec<usize>,
    /// Statistic for each candidate
    pub statistics: Vec<f64>,
    /// Significance threshold for each candidate
    pub thresholds: Vec<f64>,
    /// Sampling interval of the analyzed signal; converts periods to time
    pub interval: TimeInterval,
    /// Display unit of the analyzed signal
    pub unit: TimeUnit,
}

/// A ranked local maximum of a periodogram.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PeriodogramPeak {
    /// Index into the result arrays
    pub index: usize,
    /// Period in samples
    pub period: usize,
    /// Period in the signal's display unit
    pub period_in_unit: f64,
    pub statistic: f64,
    pub threshold: f64,
    /// Whether the statistic exceeds its threshold
    pub significant: bool,
}

impl PeriodogramResult {
    pub fn response_name(&self) -> &'static str {
        self.method.response_name()
    }

    fn duration_of(&self, period: usize) -> TimeInterval {
        self.interval.mul(period as f64)
    }

    /// Period of candidate `index` as a duration; `None` past the last candidate.
    pub fn period_time(&self, index: usize) -> Option<TimeInterval> {
        self.periods.get(index).map(|&p| self.duration_of(p))
    }

    /// Candidate periods converted to `unit`.
    pub fn periods_in(&self, unit: TimeUnit) -> Vec<f64> {
        self.periods
            .iter()
            .map(|&p| self.duration_of(p).in_unit(unit))
            .collect()
    }

    /// The `n` highest local maxima of the statistic, highest first.
    pub fn peaks(&self, n: usize) -> Vec<PeriodogramPeak> {
        find_peaks(&self.statistics)
            .into_iter()
            .take(n)
            .map(|index| PeriodogramPeak {
                index,
                period: self.periods[index],
                period_in_unit: self.duration_of(self.periods[index]).in_unit(self.unit),
                statistic: self.statistics[index],
                threshold: self.thresholds[index],
                significant: self.statistics[index] > self.thresholds[index],
            })
            .collect()
    }

    /// Candidate with the largest statistic.
    pub fn best_period(&self) -> Option<usize> {
        self.statistics
            .iter()
            .enumerate()
            .max_by(|(_, a), (_, b)| a.total_cmp(b))
            .map(|(i, _)| self.periods[i])
    }
}

/// Evaluate a periodogram on `signal[from_data..to_data]`.
///
/// # Arguments
/// * `signal` - Signal to analyze
/// * `from_data`, `to_data` - Half-open sample range
/// * `periods` - Half-open range of candidate periods in samples
/// * `method` - Periodogram method
/// * `p_level` - Significance level in `(0, 1)`
///
/// # Errors
/// `InvalidParameter` for empty/zero period ranges or a bad `p_level`,
/// `InsufficientData` for ranges shorter than the method needs,
/// `DegenerateSignal` for constant data or non-finite statistics.
pub fn periodogram(
    signal: &Signal,
    from_data: usize,
    to_data: usize,
    periods: Range<usize>,
    method: PeriodogramMethod,
    p_level: f64,
) -> Result<PeriodogramResult> {
    signal.check_range(from_data, to_data)?;
    let data = &signal.values()[from_data..to_data];
    if data.len() < 2 {
        return Err(AnalysisError::insufficient(2, data.len()));
    }
    if periods.is_empty() || periods.start == 0 {
        return Err(AnalysisError::invalid(format!(
            "candidate period range {}..{} is empty or starts at zero",
            periods.start, periods.end
        )));
    }
    if !(p_level > 0.0 && p_level < 1.0) {
        return Err(AnalysisError::invalid(format!(
            "p level must lie in (0, 1), got {p_level}"
        )));
    }

    let pg = method.build(data, p_level)?;
    let required = pg.min_samples(&periods);
    if data.len() < required {
        return Err(AnalysisError::insufficient(required, data.len()));
    }

    let statistics: Vec<f64> = iter_maybe_parallel!(periods.clone())
        .map(|p| pg.compute_statistic(p))
        .collect();
    if let Some(i) = statistics.iter().position(|s| !s.is_finite()) {
        return Err(AnalysisError::degenerate(format!(
            "{} statistic is not finite at period {}",
            pg.method_name(),
            periods.start + i
        )));
    }

    let period_list: Vec<usize> = periods.collect();
    let thresholds = pg.compute_thresholds(&period_list, &statistics);

    debug!(
        method = pg.method_name(),
        samples = data.len(),
        candidates = period_list.len(),
        "computed periodogram"
    );

    Ok(PeriodogramResult {
        method,
        periods: period_list,
        statistics,
        thresholds,
        interval: signal.interval(),
        unit: signal.unit(),
    })
}

/// Periodogram with the smoothing and downsampling front end.
///
/// The whole signal is smoothed first (`config.smoothing_sigma`, in the
/// signal's unit), then downsampled by `config.step_size`; the selection and
/// the candidate range (in the signal's unit, defaulting to the nominal
/// period ± one third) are mapped onto the downsampled grid.
pub fn compute_periodogram(
    signal: &Signal,
    from: usize,
    to: usize,
    config: &PeriodogramConfig,
) -> Result<PeriodogramResult> {
    config.validate()?;
    signal.check_range(from, to)?;

    let smoothed = signal.smooth(signal.samples_for(config.smoothing_sigma));
    let step = config.step_size;
    let working = if step > 1 {
        smoothed.downsample(step as f64)?
    } else {
        smoothed
    };

    let from_d = from / step;
    let to_d = (to / step).min(working.len());

    let (from_period, to_period) = config.period_range(signal);
    let from_p = working.samples_for(from_period).round().max(1.0) as usize;
    let to_p = working.samples_for(to_period).round().max(0.0) as usize;

    debug!(
        signal = signal.name(),
        step,
        from_period = from_p,
        to_period = to_p,
        "periodogram front end"
    );

    periodogram(&working, from_d, to_d, from_p..to_p, config.method, config.p_level)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hourly(values: Vec<f64>, spp: usize) -> Signal {
        Signal::new(
            "s",
            values,
            spp,
            TimeInterval::new(1.0, TimeUnit::Hours),
            TimeUnit::Hours,
        )
        .unwrap()
    }

    fn sine(n: usize, period: f64) -> Vec<f64> {
        (0..n)
            .map(|i| (2.0 * PI * i as f64 / period).sin())
            .collect()
    }

    #[test]
    fn test_fourier_peak_at_true_period() {
        let s = hourly(sine(240, 24.0), 24);
        let res = periodogram(&s, 0, 240, 12..48, PeriodogramMethod::Fourier, 0.05).unwrap();
        assert_eq!(res.periods.len(), 36);
        assert_eq!(res.best_period(), Some(24));
        let peaks = res.peaks(1);
        assert_eq!(peaks[0].period, 24);
        assert!((peaks[0].statistic - 1.0).abs() < 1e-9);
        assert!(peaks[0].significant);
        // Uniform threshold
        assert!(res.thresholds.iter().all(|&t| t == res.thresholds[0]));
    }

    #[test]
    fn test_fourier_threshold_formula() {
        let data = sine(100, 10.0);
        let pg = FourierPeriodogram::new(&data, 0.05).unwrap();
        let th = pg.compute_thresholds(&[5, 6], &[1.0, 2.0]);
        let expected = 3.0 * (1.0 - (0.05_f64 / 100.0).powf(1.0 / 99.0));
        assert!((th[0] - expected).abs() < 1e-12);
        assert_eq!(th.len(), 2);
    }

    #[test]
    fn test_chi_square_square_wave() {
        let values: Vec<f64> = (0..200).map(|i| if i % 10 < 4 { 1.0 } else { 0.0 }).collect();
        let s = hourly(values, 10);
        let res = periodogram(&s, 0, 200, 5..16, PeriodogramMethod::ChiSquare, 0.05).unwrap();
        assert_eq!(res.best_period(), Some(10));
        let i = res.periods.iter().position(|&p| p == 10).unwrap();
        // Perfectly periodic data: Qp = K * P = N
        assert!((res.statistics[i] - 200.0).abs() < 1e-9);
        assert!(res.statistics[i] > res.thresholds[i]);
        // Thresholds grow with the degrees of freedom
        assert!(res.thresholds.windows(2).all(|w| w[1] > w[0]));
        assert_eq!(res.response_name(), "Qp");
    }

    #[test]
    fn test_chi_square_needs_a_full_cycle() {
        let s = hourly(sine(30, 10.0), 10);
        let err = periodogram(&s, 0, 30, 10..40, PeriodogramMethod::ChiSquare, 0.05).unwrap_err();
        assert_eq!(
            err,
            AnalysisError::InsufficientData {
                required: 39,
                available: 30
            }
        );
    }

    #[test]
    fn test_lomb_scargle_peak_and_threshold() {
        let s = hourly(sine(240, 24.0), 24);
        let res =
            periodogram(&s, 0, 240, 12..48, PeriodogramMethod::LombScargle, 0.05).unwrap();
        assert_eq!(res.best_period(), Some(24));
        let i = res.periods.iter().position(|&p| p == 24).unwrap();
        // Full cycles: PN = N for a unit sine (variance 1/2)
        assert!((res.statistics[i] - 240.0).abs() < 1e-6);
        let expected = -(1.0 - 0.95_f64.powf(1.0 / 240.0)).ln();
        assert!((res.thresholds[0] - expected).abs() < 1e-12);
    }

    #[test]
    fn test_constant_signal_is_degenerate() {
        let s = hourly(vec![3.0; 100], 10);
        for method in [PeriodogramMethod::ChiSquare, PeriodogramMethod::LombScargle] {
            let err = periodogram(&s, 0, 100, 5..20, method, 0.05).unwrap_err();
            assert!(matches!(err, AnalysisError::DegenerateSignal(_)), "{method:?}");
        }
    }

    #[test]
    fn test_invalid_requests() {
        let s = hourly(sine(100, 10.0), 10);
        let m = PeriodogramMethod::Fourier;
        assert!(matches!(
            periodogram(&s, 0, 100, 20..20, m, 0.05),
            Err(AnalysisError::InvalidParameter(_))
        ));
        assert!(periodogram(&s, 0, 100, 0..20, m, 0.05).is_err());
        assert!(periodogram(&s, 0, 100, 5..20, m, 0.0).is_err());
        assert!(periodogram(&s, 0, 100, 5..20, m, 1.5).is_err());
        assert!(periodogram(&s, 50, 50, 5..20, m, 0.05).is_err());
        assert!(matches!(
            periodogram(&s, 10, 11, 5..20, m, 0.05),
            Err(AnalysisError::InsufficientData { .. })
        ));
        assert!(matches!(
            periodogram(&s, 0, 4, 5..20, m, 0.05),
            Err(AnalysisError::InsufficientData { .. })
        ));
    }

    #[test]
    fn test_method_names() {
        let data = sine(50, 10.0);
        for method in PeriodogramMethod::ALL {
            let pg = method.build(&data, 0.05).unwrap();
            assert_eq!(pg.method(), method);
            assert_eq!(pg.method_name(), method.name());
            assert_eq!(pg.response_name(), method.response_name());
        }
    }

    #[test]
    fn test_compute_periodogram_with_downsampling() {
        // 10 days of 10-minute bins with a 24h rhythm
        let spp = 144;
        let values: Vec<f64> = sine(spp * 10, spp as f64).iter().map(|v| v + 1.0).collect();
        let s = Signal::new(
            "s",
            values,
            spp,
            TimeInterval::new(10.0, TimeUnit::Minutes),
            TimeUnit::Hours,
        )
        .unwrap();
        let config = PeriodogramConfig {
            method: PeriodogramMethod::ChiSquare,
            step_size: 2,
            smoothing_sigma: 0.5,
            ..PeriodogramConfig::default()
        };
        let res = compute_periodogram(&s, 0, s.len(), &config).unwrap();
        // Default range 16h..32h on a 20-minute grid
        assert_eq!(res.periods.first(), Some(&48));
        assert_eq!(res.periods.last(), Some(&95));
        assert_eq!(res.best_period(), Some(72));
        let peaks = res.peaks(1);
        assert!((peaks[0].period_in_unit - 24.0).abs() < 1e-9);
        let minutes = res.periods_in(TimeUnit::Minutes);
        assert!((minutes[0] - 960.0).abs() < 1e-9);
        assert!(peaks[0].significant);
        let first = res.period_time(0).unwrap();
        assert!((first.in_unit(TimeUnit::Hours) - 16.0).abs() < 1e-9);
        assert_eq!(res.period_time(res.periods.len()), None);
    }
}
