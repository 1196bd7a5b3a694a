//! Demo 01: Periodograms
//!
//! Runs the three periodogram methods on a synthetic ten-day recording with
//! a 23.5h rhythm and prints the highest ranked peaks with their
//! significance.

use actogram_core::simulation::sine_activity;
use actogram_core::{
    compute_periodogram, PeriodogramConfig, PeriodogramMethod, PeriodogramResult, Signal,
    TimeInterval, TimeUnit,
};

fn print_peaks(result: &PeriodogramResult, n: usize) {
    for (rank, peak) in result.peaks(n).iter().enumerate() {
        println!(
            "    #{}: period={:.2}h, {}={:.4}, threshold={:.4}{}",
            rank + 1,
            peak.period_in_unit,
            result.response_name(),
            peak.statistic,
            peak.threshold,
            if peak.significant { " *" } else { "" }
        );
    }
}

fn main() {
    println!("=== Demo 01: Periodograms ===\n");

    // Ten days of one-minute bins; the rhythm runs at 23.5h (1410 minutes)
    let values = sine_activity(14_400, 1410, 20.0, 0.0, 5.0, 4.0, Some(7)).unwrap();
    let signal = Signal::new(
        "mouse_01",
        values,
        1440,
        TimeInterval::new(1.0, TimeUnit::Minutes),
        TimeUnit::Hours,
    )
    .unwrap();
    println!(
        "Signal '{}': {} samples, sampled every {}, nominal period {}",
        signal.name(),
        signal.len(),
        signal.interval(),
        signal.period()
    );

    for method in PeriodogramMethod::ALL {
        let config = PeriodogramConfig {
            method,
            n_peaks: 3,
            smoothing_sigma: 0.25,
            step_size: 10,
            ..PeriodogramConfig::default()
        };
        println!("\n--- {} ---", method.name());
        match compute_periodogram(&signal, 0, signal.len(), &config) {
            Ok(result) => {
                if let (Some(first), Some(last)) = (
                    result.period_time(0),
                    result.period_time(result.periods.len().saturating_sub(1)),
                ) {
                    println!(
                        "  {} candidates from {first} to {last}",
                        result.periods.len()
                    );
                }
                print_peaks(&result, config.n_peaks);
            }
            Err(e) => println!("  failed: {e}"),
        }
    }

    // --- A selection that is too short for chi-square ---
    println!("\n--- Short selection ---");
    let config = PeriodogramConfig {
        method: PeriodogramMethod::ChiSquare,
        step_size: 10,
        ..PeriodogramConfig::default()
    };
    match compute_periodogram(&signal, 0, 1500, &config) {
        Ok(_) => println!("  unexpectedly succeeded"),
        Err(e) => println!("  rejected: {e}"),
    }
}
