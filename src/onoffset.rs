//! Activity onset and offset detection, one pair per period.
//!
//! Each period is binarized against a threshold and explained as a box
//! profile "0 before onset, 1 from onset to offset, 0 after offset". The
//! breakpoints minimizing the total absolute deviation come from a
//! three-state dynamic program over the period's samples, followed by a
//! backtrack along the recorded decisions.

use crate::config::OnsetOffsetConfig;
use crate::error::{AnalysisError, Result};
use crate::helpers::{mean, upper_median};
use crate::signal::Signal;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// How the binarization threshold of a period is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum ThresholdMethod {
    /// Upper median of all samples in the period
    MedianWithZero,
    /// Upper median of the samples with positive activity
    #[default]
    MedianWithoutZero,
    /// Mean of the period
    Mean,
    /// Any positive activity counts as active
    Zero,
    /// A fixed, caller-supplied threshold
    Manual(f64),
}

impl ThresholdMethod {
    pub fn name(&self) -> &'static str {
        match self {
            ThresholdMethod::MedianWithZero => "Median (including zero activity)",
            ThresholdMethod::MedianWithoutZero => "Median (without zero activity)",
            ThresholdMethod::Mean => "Mean",
            ThresholdMethod::Zero => "Zero",
            ThresholdMethod::Manual(_) => "Manual",
        }
    }

    /// Threshold for one period of data.
    ///
    /// A period without positive activity has a `MedianWithoutZero`
    /// threshold of 0.
    pub fn threshold(&self, period: &[f64]) -> f64 {
        match *self {
            ThresholdMethod::MedianWithZero => upper_median(period).unwrap_or(0.0),
            ThresholdMethod::MedianWithoutZero => {
                let active: Vec<f64> = period.iter().copied().filter(|&v| v > 0.0).collect();
                upper_median(&active).unwrap_or(0.0)
            }
            ThresholdMethod::Mean => mean(period).unwrap_or(0.0),
            ThresholdMethod::Zero => 0.0,
            ThresholdMethod::Manual(t) => t,
        }
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if let ThresholdMethod::Manual(t) = *self {
            if !t.is_finite() {
                return Err(AnalysisError::invalid(format!(
                    "manual threshold must be finite, got {t}"
                )));
            }
        }
        Ok(())
    }
}

/// Onset and offset sample indices, one pair per analyzed period.
///
/// Indices are absolute positions in the source signal; an offset is the
/// last active sample of its period.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OnsetOffsetSeries {
    pub onsets: Vec<usize>,
    pub offsets: Vec<usize>,
}

impl OnsetOffsetSeries {
    /// Number of analyzed periods.
    pub fn len(&self) -> usize {
        self.onsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.onsets.is_empty()
    }

    pub fn pairs(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.onsets.iter().copied().zip(self.offsets.iter().copied())
    }
}

/// 1 where `v > threshold`, 0 elsewhere.
pub fn binarize(data: &[f64], threshold: f64) -> Vec<f64> {
    data.iter()
        .map(|&v| if v > threshold { 1.0 } else { 0.0 })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Start,
    Left,
    Diag,
}

/// Cost and decision tables of the box-profile program, reused across periods.
///
/// Row `r` holds the cheapest explanation of positions `[0, c]` after `r`
/// state transitions; row 1 is the active state.
struct BoxProfileTables {
    cost: [Vec<f64>; 3],
    step: [Vec<Step>; 3],
}

impl BoxProfileTables {
    fn new() -> Self {
        Self {
            cost: [Vec::new(), Vec::new(), Vec::new()],
            step: [Vec::new(), Vec::new(), Vec::new()],
        }
    }

    fn reset(&mut self, len: usize) {
        for r in 0..3 {
            self.cost[r].clear();
            self.cost[r].resize(len, 0.0);
            self.step[r].clear();
            self.step[r].resize(len, Step::Start);
        }
    }

    /// Breakpoints `(onset, offset)` within one binarized period.
    fn solve(&mut self, binary: &[f64]) -> (usize, usize) {
        // No transition exists in a constant period.
        if binary.iter().all(|&b| b > 0.0) || binary.iter().all(|&b| b <= 0.0) {
            return (0, 0);
        }
        let len = binary.len();
        self.reset(len);

        self.cost[0][0] = binary[0];
        for c in 1..len {
            self.cost[0][c] = self.cost[0][c - 1] + binary[c];
            self.step[0][c] = Step::Left;
        }
        self.cost[2][0] = self.cost[0][0];
        self.cost[1][0] = (binary[0] - 1.0).abs();

        for r in 1..3 {
            let level = if r == 1 { 1.0 } else { 0.0 };
            for c in 1..len {
                let diff = (binary[c] - level).abs();
                let stay = self.cost[r][c - 1];
                let enter = self.cost[r - 1][c - 1];
                if stay <= enter {
                    self.cost[r][c] = stay + diff;
                    self.step[r][c] = Step::Left;
                } else {
                    self.cost[r][c] = enter + diff;
                    self.step[r][c] = Step::Diag;
                }
            }
        }

        // Walk back from the last position in the final state.
        let mut r = 2;
        let mut end: Option<usize> = None;
        let mut start: Option<usize> = None;
        for c in (1..len).rev() {
            if self.step[r][c] == Step::Diag {
                if end.is_none() {
                    end = Some(c);
                } else {
                    start = Some(c);
                    break;
                }
                r -= 1;
            }
        }
        match end {
            Some(h2) => (start.unwrap_or(0), h2 - 1),
            None => (0, 0),
        }
    }
}

/// Onset/offset breakpoints of one already binarized period.
///
/// Returns `(0, 0)` for an empty, all-inactive or all-active period, and
/// when no transition is found.
pub fn box_profile_breakpoints(binary: &[f64]) -> (usize, usize) {
    BoxProfileTables::new().solve(binary)
}

/// Detect one onset/offset pair for each full period of `signal[from..to]`.
///
/// # Arguments
/// * `signal` - Activity signal
/// * `from`, `to` - Half-open sample range
/// * `period` - Period length in samples
/// * `method` - Per-period threshold rule
///
/// A trailing partial period is not analyzed.
pub fn detect_onsets_offsets(
    signal: &Signal,
    from: usize,
    to: usize,
    period: usize,
    method: ThresholdMethod,
) -> Result<OnsetOffsetSeries> {
    signal.check_range(from, to)?;
    method.validate()?;
    if period == 0 {
        return Err(AnalysisError::invalid("period must be at least one sample"));
    }
    let periods = (to - from) / period;
    if periods == 0 {
        return Err(AnalysisError::insufficient(period, to - from));
    }

    let data = signal.values();
    let mut tables = BoxProfileTables::new();
    let mut series = OnsetOffsetSeries {
        onsets: Vec::with_capacity(periods),
        offsets: Vec::with_capacity(periods),
    };
    for d in 0..periods {
        let offs = from + d * period;
        let window = &data[offs..offs + period];
        let binary = binarize(window, method.threshold(window));
        let (onset, offset) = tables.solve(&binary);
        series.onsets.push(offs + onset);
        series.offsets.push(offs + offset);
    }

    debug!(
        signal = signal.name(),
        periods,
        period,
        threshold = method.name(),
        "detected onsets and offsets"
    );
    Ok(series)
}

/// [`detect_onsets_offsets`] with smoothing and the period taken from `config`.
///
/// The signal is smoothed with `config.smoothing_sigma` (in the signal's
/// unit) first; the period defaults to the signal's samples per period.
pub fn detect_onsets_offsets_with(
    signal: &Signal,
    from: usize,
    to: usize,
    config: &OnsetOffsetConfig,
) -> Result<OnsetOffsetSeries> {
    config.validate()?;
    let smoothed = signal.smooth(signal.samples_for(config.smoothing_sigma));
    let period = config.period_samples(signal);
    detect_onsets_offsets(&smoothed, from, to, period, config.threshold)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::{TimeInterval, TimeUnit};

    fn signal(values: Vec<f64>, spp: usize) -> Signal {
        Signal::new(
            "activity",
            values,
            spp,
            TimeInterval::new(1.0, TimeUnit::Hours),
            TimeUnit::Hours,
        )
        .unwrap()
    }

    #[test]
    fn test_box_profile() {
        assert_eq!(
            box_profile_breakpoints(&[0.0, 0.0, 1.0, 1.0, 1.0, 1.0, 0.0, 0.0]),
            (2, 5)
        );
    }

    #[test]
    fn test_box_profile_picks_longest_block() {
        let b: Vec<f64> = [
            0, 0, 1, 1, 1, 0, 0, 0, 0, 0, 1, 1, 1, 1, 0, 0, 1, 1, 0, 0, 0, 0, 0, 0, 0,
        ]
        .iter()
        .map(|&v| v as f64)
        .collect();
        assert_eq!(box_profile_breakpoints(&b), (10, 13));
    }

    #[test]
    fn test_box_profile_edges() {
        assert_eq!(box_profile_breakpoints(&[0.0; 8]), (0, 0));
        assert_eq!(box_profile_breakpoints(&[]), (0, 0));
        assert_eq!(box_profile_breakpoints(&[1.0]), (0, 0));
        assert_eq!(box_profile_breakpoints(&[1.0; 8]), (0, 0));
        // Active from the first sample
        assert_eq!(
            box_profile_breakpoints(&[1.0, 1.0, 1.0, 0.0, 0.0, 0.0, 0.0, 0.0]),
            (0, 2)
        );
        // Activity wrapping the period boundary keeps the leading block
        assert_eq!(
            box_profile_breakpoints(&[1.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 1.0]),
            (0, 1)
        );
    }

    #[test]
    fn test_thresholds() {
        let d = [0.0, 0.0, 2.0, 4.0, 6.0, 0.0];
        assert_eq!(ThresholdMethod::MedianWithZero.threshold(&d), 2.0);
        assert_eq!(ThresholdMethod::MedianWithoutZero.threshold(&d), 4.0);
        assert_eq!(ThresholdMethod::Mean.threshold(&d), 2.0);
        assert_eq!(ThresholdMethod::Zero.threshold(&d), 0.0);
        assert_eq!(ThresholdMethod::Manual(1.5).threshold(&d), 1.5);
        assert_eq!(ThresholdMethod::MedianWithoutZero.threshold(&[0.0; 4]), 0.0);
    }

    #[test]
    fn test_detect_per_period() {
        // Three periods of 8 samples with the active block moving later
        let mut values = Vec::new();
        for shift in 0..3 {
            for i in 0..8 {
                values.push(if (2 + shift..5 + shift).contains(&i) { 5.0 } else { 0.0 });
            }
        }
        // Partial trailing period is ignored
        values.extend([5.0, 5.0, 0.0]);
        let s = signal(values, 8);
        let res = detect_onsets_offsets(&s, 0, s.len(), 8, ThresholdMethod::Zero).unwrap();
        assert_eq!(res.onsets, vec![2, 11, 20]);
        assert_eq!(res.offsets, vec![4, 13, 22]);
        assert_eq!(res.len(), 3);
        assert_eq!(res.pairs().next(), Some((2, 4)));
    }

    #[test]
    fn test_detect_from_offset_selection() {
        let values: Vec<f64> = (0..40).map(|i| if i % 10 >= 6 { 1.0 } else { 0.0 }).collect();
        let s = signal(values, 10);
        let res = detect_onsets_offsets(&s, 3, 33, 10, ThresholdMethod::Zero).unwrap();
        // Periods start at 3, 13 and 23; activity sits at 6..=9 of each
        assert_eq!(res.onsets, vec![6, 16, 26]);
        assert_eq!(res.offsets, vec![9, 19, 29]);
    }

    #[test]
    fn test_constant_periods_have_no_breakpoints() {
        let s = signal(vec![2.0; 24], 8);
        let res = detect_onsets_offsets(&s, 0, 24, 8, ThresholdMethod::Zero).unwrap();
        assert_eq!(res.onsets, vec![0, 8, 16]);
        assert_eq!(res.offsets, vec![0, 8, 16]);
    }

    #[test]
    fn test_errors() {
        let s = signal(vec![1.0; 10], 8);
        assert!(matches!(
            detect_onsets_offsets(&s, 0, 5, 8, ThresholdMethod::Zero),
            Err(AnalysisError::InsufficientData { .. })
        ));
        assert!(detect_onsets_offsets(&s, 0, 10, 0, ThresholdMethod::Zero).is_err());
        assert!(detect_onsets_offsets(&s, 0, 10, 4, ThresholdMethod::Manual(f64::NAN)).is_err());
    }

    #[test]
    fn test_config_driven_detection() {
        let values: Vec<f64> = (0..48).map(|i| if i % 24 >= 12 { 3.0 } else { 0.0 }).collect();
        let s = signal(values, 24);
        let config = OnsetOffsetConfig {
            smoothing_sigma: 0.0,
            threshold: ThresholdMethod::Mean,
            period: None,
        };
        let res = detect_onsets_offsets_with(&s, 0, 48, &config).unwrap();
        assert_eq!(res.onsets, vec![12, 36]);
        // Last sample of a period is forced into the trailing rest state
        assert_eq!(res.offsets, vec![22, 46]);
    }
}
