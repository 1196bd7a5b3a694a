//! Acrophase: the time of peak activity within each period.
//!
//! For every full period the first circular moment of the activity is
//! computed, `s = sum y_i sin(2 pi i / P)` and `c = sum y_i cos(2 pi i / P)`;
//! its angle `atan2(s, c)` maps back to a sample within the period.

use crate::error::{AnalysisError, Result};
use crate::signal::Signal;
use std::f64::consts::PI;
use tracing::debug;

/// Peak position of the first harmonic within one period, in samples.
///
/// # Returns
/// A position in `[0, period.len())`; 0 for an empty period.
pub fn circular_peak(period: &[f64]) -> usize {
    let p = period.len();
    if p == 0 {
        return 0;
    }
    let (mut s, mut c) = (0.0, 0.0);
    for (i, &y) in period.iter().enumerate() {
        let angle = 2.0 * PI * i as f64 / p as f64;
        s += y * angle.sin();
        c += y * angle.cos();
    }
    let phi = s.atan2(c);
    let shift = (phi * p as f64 / (2.0 * PI)).round() as i64;
    shift.rem_euclid(p as i64) as usize
}

/// Acrophase index for each full period of `signal[from..to]`.
///
/// # Arguments
/// * `signal` - Activity signal
/// * `from`, `to` - Half-open sample range
/// * `period` - Period length in samples
///
/// # Returns
/// Absolute sample indices, one per full period; a trailing partial period
/// is not analyzed.
pub fn acrophases(signal: &Signal, from: usize, to: usize, period: usize) -> Result<Vec<usize>> {
    signal.check_range(from, to)?;
    if period == 0 {
        return Err(AnalysisError::invalid("period must be at least one sample"));
    }
    let periods = (to - from) / period;
    if periods == 0 {
        return Err(AnalysisError::insufficient(period, to - from));
    }

    let data = signal.values();
    let positions: Vec<usize> = (0..periods)
        .map(|d| {
            let offs = from + d * period;
            offs + circular_peak(&data[offs..offs + period])
        })
        .collect();
    debug!(signal = signal.name(), periods, period, "computed acrophases");
    Ok(positions)
}

/// [`acrophases`] over the signal's own samples per period.
pub fn acrophases_nominal(signal: &Signal, from: usize, to: usize) -> Result<Vec<usize>> {
    acrophases(signal, from, to, signal.samples_per_period())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::{TimeInterval, TimeUnit};

    fn cosine_bump(period: usize, peak: usize) -> Vec<f64> {
        (0..period)
            .map(|i| {
                let angle = 2.0 * PI * (i as f64 - peak as f64) / period as f64;
                1.0 + angle.cos()
            })
            .collect()
    }

    #[test]
    fn test_circular_peak() {
        assert_eq!(circular_peak(&cosine_bump(24, 0)), 0);
        assert_eq!(circular_peak(&cosine_bump(24, 7)), 7);
        assert_eq!(circular_peak(&cosine_bump(24, 20)), 20);
        assert_eq!(circular_peak(&[]), 0);
    }

    #[test]
    fn test_single_spike() {
        let mut p = vec![0.0; 10];
        p[9] = 4.0;
        assert_eq!(circular_peak(&p), 9);
    }

    #[test]
    fn test_acrophases_per_period() {
        let mut values = Vec::new();
        for peak in [3, 4, 5, 6] {
            values.extend(cosine_bump(24, peak));
        }
        values.extend([1.0; 5]);
        let s = Signal::new(
            "a",
            values,
            24,
            TimeInterval::new(1.0, TimeUnit::Hours),
            TimeUnit::Hours,
        )
        .unwrap();
        let pos = acrophases_nominal(&s, 0, s.len()).unwrap();
        assert_eq!(pos, vec![3, 28, 53, 78]);
        assert!(matches!(
            acrophases(&s, 0, 10, 24),
            Err(AnalysisError::InsufficientData { .. })
        ));
        assert!(acrophases(&s, 0, 10, 0).is_err());
    }
}
