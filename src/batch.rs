//! Running one analysis over many selections.
//!
//! Analyses are pure, so independent selections (for example one
//! periodogram per displayed track) can run concurrently. A failing
//! selection is logged and reported in its slot; the others still run.

use crate::config::{OnsetOffsetConfig, PeriodogramConfig};
use crate::error::Result;
use crate::onoffset::{detect_onsets_offsets_with, OnsetOffsetSeries};
use crate::periodogram::{compute_periodogram, PeriodogramResult};
use crate::signal::Signal;
use crate::slice_maybe_parallel;
#[cfg(feature = "parallel")]
use rayon::iter::ParallelIterator;
use tracing::{debug, warn};

/// A half-open sample range of one signal.
#[derive(Debug, Clone, Copy)]
pub struct Selection<'a> {
    pub signal: &'a Signal,
    pub from: usize,
    pub to: usize,
}

impl<'a> Selection<'a> {
    pub fn new(signal: &'a Signal, from: usize, to: usize) -> Self {
        Self { signal, from, to }
    }

    /// The whole signal.
    pub fn whole(signal: &'a Signal) -> Self {
        Self {
            signal,
            from: 0,
            to: signal.len(),
        }
    }
}

/// Run `analysis` on every selection.
///
/// # Returns
/// One result per selection, in input order. Failures are logged with
/// `warn!` and returned in place; they never abort the batch.
pub fn run_batch<'a, T, F>(selections: &[Selection<'a>], analysis: F) -> Vec<Result<T>>
where
    T: Send,
    F: Fn(&Selection<'a>) -> Result<T> + Sync + Send,
{
    let results: Vec<Result<T>> = slice_maybe_parallel!(selections)
        .map(|s| analysis(s))
        .collect();

    let mut failed = 0;
    for (sel, res) in selections.iter().zip(&results) {
        if let Err(e) = res {
            failed += 1;
            warn!(
                signal = sel.signal.name(),
                from = sel.from,
                to = sel.to,
                error = %e,
                "analysis skipped"
            );
        }
    }
    debug!(selections = selections.len(), failed, "batch finished");
    results
}

/// One periodogram per selection.
pub fn periodogram_batch(
    selections: &[Selection<'_>],
    config: &PeriodogramConfig,
) -> Vec<Result<PeriodogramResult>> {
    run_batch(selections, |s| {
        compute_periodogram(s.signal, s.from, s.to, config)
    })
}

/// One onset/offset series per selection.
pub fn onset_offset_batch(
    selections: &[Selection<'_>],
    config: &OnsetOffsetConfig,
) -> Vec<Result<OnsetOffsetSeries>> {
    run_batch(selections, |s| {
        detect_onsets_offsets_with(s.signal, s.from, s.to, config)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AnalysisError;
    use crate::time::{TimeInterval, TimeUnit};

    fn hourly(name: &str, values: Vec<f64>) -> Signal {
        Signal::new(
            name,
            values,
            24,
            TimeInterval::new(1.0, TimeUnit::Hours),
            TimeUnit::Hours,
        )
        .unwrap()
    }

    #[test]
    fn test_failures_do_not_abort() {
        let a = hourly("a", (0..48).map(|i| i as f64).collect());
        let b = hourly("b", vec![1.0; 10]);
        let selections = [
            Selection::whole(&a),
            Selection::new(&b, 0, 10),
            Selection::new(&a, 24, 48),
        ];
        let results = run_batch(&selections, |s| {
            if s.to - s.from < 20 {
                Err(AnalysisError::insufficient(20, s.to - s.from))
            } else {
                Ok(s.signal.values()[s.from..s.to].iter().sum::<f64>())
            }
        });
        assert_eq!(results.len(), 3);
        assert_eq!(results[0], Ok((0..48).sum::<usize>() as f64));
        assert!(results[1].is_err());
        assert_eq!(results[2], Ok((24..48).sum::<usize>() as f64));
    }

    #[test]
    fn test_periodogram_batch_keeps_order() {
        let sine = |p: f64| -> Vec<f64> {
            (0..240)
                .map(|i| 1.0 + (2.0 * std::f64::consts::PI * i as f64 / p).sin())
                .collect()
        };
        let a = hourly("a", sine(24.0));
        let b = hourly("flat", vec![2.0; 240]);
        let c = hourly("c", sine(20.0));
        let config = PeriodogramConfig {
            method: crate::periodogram::PeriodogramMethod::ChiSquare,
            ..PeriodogramConfig::default()
        };
        let results = periodogram_batch(
            &[Selection::whole(&a), Selection::whole(&b), Selection::whole(&c)],
            &config,
        );
        assert_eq!(results[0].as_ref().unwrap().best_period(), Some(24));
        assert!(matches!(results[1], Err(AnalysisError::DegenerateSignal(_))));
        assert_eq!(results[2].as_ref().unwrap().best_period(), Some(20));
    }
}
