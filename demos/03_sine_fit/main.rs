//! Demo 03: Sine fit
//!
//! Fits a clipped sinusoid to noisy activity at several resolutions and
//! prints the recovered period next to the average daily profile.

use actogram_core::simulation::{add_gaussian_noise, sine_activity};
use actogram_core::{
    average_activity_with, fit_sine, AverageActivityConfig, Signal, SineFitConfig, TimeInterval,
    TimeUnit,
};

fn main() {
    println!("=== Demo 03: Sine Fit ===\n");

    // A 24.6h rhythm sampled every 2 minutes for two weeks
    let spp = 738;
    let clean = sine_activity(14 * 720, spp, 12.0, 1.2, 3.0, 0.0, None).unwrap();
    let values: Vec<f64> = add_gaussian_noise(&clean, 1.5, Some(21))
        .unwrap()
        .into_iter()
        .map(|v| v.max(0.0))
        .collect();
    let signal = Signal::new(
        "rat_12",
        values,
        720,
        TimeInterval::new(2.0, TimeUnit::Minutes),
        TimeUnit::Hours,
    )
    .unwrap();

    for max_level_length in [20_000, 2000, 500] {
        let config = SineFitConfig {
            max_level_length,
            ..SineFitConfig::default()
        };
        match fit_sine(&signal, 0, signal.len(), &config) {
            Ok(fit) => println!(
                "  levels={}: period={}, amplitude={:.2}, offset={:.2}, L1 cost={:.1}",
                fit.levels,
                fit.period,
                fit.parameters.amplitude,
                fit.parameters.offset,
                fit.cost
            ),
            Err(e) => println!("  max level {max_level_length}: {e}"),
        }
    }

    println!("\n--- Average daily profile (hourly means) ---");
    let profile =
        average_activity_with(&signal, 0, signal.len(), &AverageActivityConfig::default()).unwrap();
    for hour in (0..24).step_by(3) {
        let bins = &profile.values[hour * 30..(hour + 1) * 30];
        let mean = bins.iter().sum::<f64>() / bins.len() as f64;
        println!("  {hour:02}h: {mean:6.2}");
    }
}
