//! Synthetic activity recordings.
//!
//! Generators for the two activity shapes the analyses are built around:
//! a clipped sinusoid (periodograms, sine fit, acrophase) and a
//! rectangular active phase whose onset drifts from period to period
//! (onset/offset detection, drift regression). All noise is drawn from a
//! seeded [`StdRng`] so results are reproducible.

use crate::error::{AnalysisError, Result};
use rand::prelude::*;
use rand_distr::{Normal, Uniform};
use std::f64::consts::PI;

fn make_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_entropy(),
    }
}

fn check_non_negative(name: &str, value: f64) -> Result<()> {
    if !value.is_finite() || value < 0.0 {
        return Err(AnalysisError::invalid(format!(
            "{name} must be finite and non-negative, got {value}"
        )));
    }
    Ok(())
}

/// Clipped sinusoid `max(0, a sin(2 pi i / spp + phase) + offset)` plus
/// uniform noise in `[0, noise)`.
///
/// # Arguments
/// * `n` - Number of samples
/// * `samples_per_period` - Period of the sinusoid in samples
/// * `amplitude` - `a`
/// * `phase` - Phase in radians
/// * `offset` - Vertical offset before clipping
/// * `noise` - Width of the additive uniform noise; 0 for none
/// * `seed` - Optional random seed
pub fn sine_activity(
    n: usize,
    samples_per_period: usize,
    amplitude: f64,
    phase: f64,
    offset: f64,
    noise: f64,
    seed: Option<u64>,
) -> Result<Vec<f64>> {
    if samples_per_period == 0 {
        return Err(AnalysisError::invalid("samples per period must be positive"));
    }
    let omega = 2.0 * PI / samples_per_period as f64;
    let clean: Vec<f64> = (0..n)
        .map(|i| (amplitude * (omega * i as f64 + phase).sin() + offset).max(0.0))
        .collect();
    add_uniform_noise(&clean, noise, seed)
}

/// Rectangular activity: `level` during an active phase of `active_len`
/// samples, 0 elsewhere, over `periods` periods.
///
/// The active phase of period `d` starts at `onset + d * drift` (rounded,
/// wrapped into the period), so a non-zero `drift` makes the onset wander
/// through the day the way free-running rhythms do.
pub fn box_activity(
    periods: usize,
    samples_per_period: usize,
    onset: f64,
    active_len: usize,
    drift: f64,
    level: f64,
) -> Result<Vec<f64>> {
    if samples_per_period == 0 {
        return Err(AnalysisError::invalid("samples per period must be positive"));
    }
    if active_len > samples_per_period {
        return Err(AnalysisError::invalid(format!(
            "active phase of {active_len} samples exceeds the period of {samples_per_period}"
        )));
    }
    if !onset.is_finite() || !drift.is_finite() {
        return Err(AnalysisError::invalid("onset and drift must be finite"));
    }

    let spp = samples_per_period as i64;
    let mut values = vec![0.0; periods * samples_per_period];
    for d in 0..periods {
        let start = (onset + d as f64 * drift).round() as i64;
        for k in 0..active_len as i64 {
            let within = (start + k).rem_euclid(spp);
            let idx = d as i64 * spp + within;
            values[idx as usize] = level;
        }
    }
    Ok(values)
}

/// Add uniform noise in `[0, width)` to every sample.
pub fn add_uniform_noise(values: &[f64], width: f64, seed: Option<u64>) -> Result<Vec<f64>> {
    check_non_negative("noise width", width)?;
    if width == 0.0 {
        return Ok(values.to_vec());
    }
    let mut rng = make_rng(seed);
    let uniform = Uniform::new(0.0, width);
    Ok(values
        .iter()
        .map(|&v| v + rng.sample::<f64, _>(uniform))
        .collect())
}

/// Add independent `N(0, sd^2)` noise to every sample.
///
/// The result is not clipped, so it can go negative.
pub fn add_gaussian_noise(values: &[f64], sd: f64, seed: Option<u64>) -> Result<Vec<f64>> {
    check_non_negative("noise standard deviation", sd)?;
    let normal = Normal::new(0.0, sd).map_err(|e| AnalysisError::invalid(e.to_string()))?;
    let mut rng = make_rng(seed);
    Ok(values
        .iter()
        .map(|&v| v + rng.sample::<f64, _>(normal))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sine_activity_clipped() {
        let v = sine_activity(96, 24, 2.0, 0.0, -1.0, 0.0, None).unwrap();
        assert_eq!(v.len(), 96);
        assert!(v.iter().all(|&x| x >= 0.0));
        assert_eq!(v[0], 0.0);
        assert!((v[6] - 1.0).abs() < 1e-12);
        assert_eq!(v[18], 0.0);
    }

    #[test]
    fn test_sine_activity_reproducible() {
        let a = sine_activity(100, 10, 1.0, 0.3, 0.5, 0.2, Some(7)).unwrap();
        let b = sine_activity(100, 10, 1.0, 0.3, 0.5, 0.2, Some(7)).unwrap();
        assert_eq!(a, b);
        let clean = sine_activity(100, 10, 1.0, 0.3, 0.5, 0.0, None).unwrap();
        for (x, c) in a.iter().zip(&clean) {
            assert!(x - c >= 0.0 && x - c < 0.2);
        }
    }

    #[test]
    fn test_box_activity_drift() {
        let v = box_activity(3, 10, 2.0, 3, 1.0, 5.0).unwrap();
        assert_eq!(v.len(), 30);
        assert_eq!(&v[0..10], &[0.0, 0.0, 5.0, 5.0, 5.0, 0.0, 0.0, 0.0, 0.0, 0.0]);
        assert_eq!(v[13], 5.0);
        assert_eq!(v[12], 0.0);
        // Onset 4 in the third period
        assert_eq!(v[24], 5.0);
        assert_eq!(v[23], 0.0);
        assert_eq!(v.iter().filter(|&&x| x > 0.0).count(), 9);
    }

    #[test]
    fn test_box_activity_wraps() {
        let v = box_activity(1, 10, 8.0, 4, 0.0, 1.0).unwrap();
        assert_eq!(v, vec![1.0, 1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 1.0, 1.0]);
        assert!(box_activity(1, 10, 0.0, 11, 0.0, 1.0).is_err());
    }

    #[test]
    fn test_gaussian_noise() {
        let zeros = vec![0.0; 5000];
        let noisy = add_gaussian_noise(&zeros, 2.0, Some(42)).unwrap();
        let mean = noisy.iter().sum::<f64>() / 5000.0;
        let var = noisy.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / 5000.0;
        assert!(mean.abs() < 0.15);
        assert!((var.sqrt() - 2.0).abs() < 0.15);
        assert!(add_gaussian_noise(&zeros, -1.0, None).is_err());
        assert_eq!(add_uniform_noise(&[1.0, 2.0], 0.0, None).unwrap(), vec![1.0, 2.0]);
    }
}
