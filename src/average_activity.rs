//! Average activity profile over one period.

use crate::config::AverageActivityConfig;
use crate::error::{AnalysisError, Result};
use crate::signal::Signal;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Mean activity per phase bin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityProfile {
    /// Mean of each phase bin; NaN for bins that received no sample
    pub values: Vec<f64>,
    /// Number of samples that fell into each bin
    pub counts: Vec<usize>,
}

impl ActivityProfile {
    pub fn period(&self) -> usize {
        self.values.len()
    }

    /// Whether every bin received at least one sample.
    pub fn is_complete(&self) -> bool {
        self.counts.iter().all(|&c| c > 0)
    }

    /// Phase bin with the highest defined mean.
    pub fn peak_bin(&self) -> Option<usize> {
        self.values
            .iter()
            .enumerate()
            .filter(|(_, v)| !v.is_nan())
            .max_by(|(_, a), (_, b)| a.total_cmp(b))
            .map(|(i, _)| i)
    }

    /// The profile as a one-period signal with the sampling of `source`.
    pub fn to_signal(&self, source: &Signal) -> Result<Signal> {
        Signal::new(
            format!("{}_average", source.name()),
            self.values.clone(),
            self.period(),
            source.interval(),
            source.unit(),
        )
    }
}

/// Average `signal[from..to]` into `period` phase bins.
///
/// Sample `i` goes into bin `i % period`, so bins are aligned with absolute
/// positions in the recording, not with `from`.
pub fn average_activity(
    signal: &Signal,
    from: usize,
    to: usize,
    period: usize,
) -> Result<ActivityProfile> {
    signal.check_range(from, to)?;
    if period == 0 {
        return Err(AnalysisError::invalid("period must be at least one sample"));
    }

    let mut sums = vec![0.0; period];
    let mut counts = vec![0usize; period];
    for (i, &v) in signal.values()[from..to].iter().enumerate() {
        let bin = (from + i) % period;
        sums[bin] += v;
        counts[bin] += 1;
    }
    let values = sums
        .iter()
        .zip(&counts)
        .map(|(&s, &c)| if c == 0 { f64::NAN } else { s / c as f64 })
        .collect();

    debug!(signal = signal.name(), period, from, to, "averaged activity");
    Ok(ActivityProfile { values, counts })
}

/// [`average_activity`] with optional smoothing and period override.
pub fn average_activity_with(
    signal: &Signal,
    from: usize,
    to: usize,
    config: &AverageActivityConfig,
) -> Result<ActivityProfile> {
    config.validate()?;
    let smoothed = signal.smooth(signal.samples_for(config.smoothing_sigma));
    average_activity(&smoothed, from, to, config.period_samples(signal))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::{TimeInterval, TimeUnit};

    fn signal(values: Vec<f64>, spp: usize) -> Signal {
        Signal::new(
            "s",
            values,
            spp,
            TimeInterval::new(1.0, TimeUnit::Hours),
            TimeUnit::Hours,
        )
        .unwrap()
    }

    #[test]
    fn test_average_over_periods() {
        let s = signal(vec![1.0, 2.0, 3.0, 3.0, 4.0, 5.0], 3);
        let p = average_activity(&s, 0, 6, 3).unwrap();
        assert_eq!(p.values, vec![2.0, 3.0, 4.0]);
        assert_eq!(p.counts, vec![2, 2, 2]);
        assert!(p.is_complete());
        assert_eq!(p.peak_bin(), Some(2));
    }

    #[test]
    fn test_bins_follow_absolute_index() {
        let s = signal((0..10).map(|i| i as f64).collect(), 4);
        let p = average_activity(&s, 1, 7, 4).unwrap();
        // bin 0 <- 4, bin 1 <- 1, 5, bin 2 <- 2, 6, bin 3 <- 3
        assert_eq!(p.values, vec![4.0, 3.0, 4.0, 3.0]);
        assert_eq!(p.counts, vec![1, 2, 2, 1]);
    }

    #[test]
    fn test_empty_bins_are_nan() {
        let s = signal(vec![1.0; 10], 5);
        let p = average_activity(&s, 0, 3, 5).unwrap();
        assert!(p.values[3].is_nan() && p.values[4].is_nan());
        assert_eq!(p.values[0], 1.0);
        assert!(!p.is_complete());
        assert!(average_activity(&s, 0, 3, 0).is_err());
    }

    #[test]
    fn test_config_period_override() {
        let s = signal((0..24).map(|i| (i % 6) as f64).collect(), 12);
        let config = AverageActivityConfig {
            period: Some(6.0),
            smoothing_sigma: 0.0,
        };
        let p = average_activity_with(&s, 0, 24, &config).unwrap();
        assert_eq!(p.values, vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0]);
        let curve = p.to_signal(&s).unwrap();
        assert_eq!(curve.name(), "s_average");
        assert_eq!(curve.samples_per_period(), 6);
    }
}
