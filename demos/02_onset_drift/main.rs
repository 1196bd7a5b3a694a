//! Demo 02: Onset drift
//!
//! Detects activity onsets and offsets in a free-running recording, fits
//! their drift across days on the wrapped 24h axis, and compares it with
//! the acrophase drift.

use actogram_core::simulation::{add_uniform_noise, box_activity};
use actogram_core::{
    acrophases_nominal, detect_onsets_offsets_with, MarkerSeries, OnsetOffsetConfig, Signal,
    ThresholdMethod, TimeInterval, TimeUnit,
};

fn main() {
    println!("=== Demo 02: Onset Drift ===\n");

    // Three weeks; activity starts at 8h and moves 20 minutes later every day
    let clean = box_activity(21, 1440, 480.0, 480, 20.0, 40.0).unwrap();
    let values = add_uniform_noise(&clean, 8.0, Some(3)).unwrap();
    let signal = Signal::new(
        "hamster_07",
        values,
        1440,
        TimeInterval::new(1.0, TimeUnit::Minutes),
        TimeUnit::Hours,
    )
    .unwrap();

    let config = OnsetOffsetConfig {
        smoothing_sigma: 0.1,
        threshold: ThresholdMethod::Mean,
        period: None,
    };
    let series = detect_onsets_offsets_with(&signal, 0, signal.len(), &config).unwrap();
    let (onsets, offsets) = MarkerSeries::from_onsets_offsets(&series, &signal);

    println!("--- Detected markers ({}) ---", series.len());
    for d in 0..5 {
        if let (Some(on), Some(off)) = (onsets.time_at(d), offsets.time_at(d)) {
            println!("  day {d:2}: onset {on}, offset {off}");
        }
    }

    println!("\n--- Drift regression ---");
    let day = signal.period();
    for markers in [&onsets, &offsets] {
        match markers.regression(day) {
            Ok(line) => println!(
                "  {}: {} per day, starting at {} (days {}..={})",
                markers.name(),
                TimeInterval::from_millis(line.slope),
                TimeInterval::from_millis(line.wrapped_phase_at(0.0, day.millis)),
                line.first_period,
                line.last_period
            ),
            Err(e) => println!("  {}: {e}", markers.name()),
        }
    }

    let peaks = acrophases_nominal(&signal, 0, signal.len()).unwrap();
    let acrophase = MarkerSeries::from_signal("acrophase", peaks, &signal);
    if let Ok(line) = acrophase.regression(day) {
        println!(
            "  acrophase: {} per day",
            TimeInterval::from_millis(line.slope)
        );
    }
}
