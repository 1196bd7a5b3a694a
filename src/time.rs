//! Time units and durations used to calibrate sample indices.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Display unit of a signal's time axis.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimeUnit {
    Milliseconds,
    Seconds,
    Minutes,
    Hours,
    Days,
    /// 365 days.
    Years,
}

impl TimeUnit {
    /// All units, from the longest to the shortest.
    pub const DESCENDING: [TimeUnit; 6] = [
        TimeUnit::Years,
        TimeUnit::Days,
        TimeUnit::Hours,
        TimeUnit::Minutes,
        TimeUnit::Seconds,
        TimeUnit::Milliseconds,
    ];

    /// Number of milliseconds in one unit.
    pub fn millis(self) -> f64 {
        match self {
            TimeUnit::Milliseconds => 1.0,
            TimeUnit::Seconds => 1_000.0,
            TimeUnit::Minutes => 60_000.0,
            TimeUnit::Hours => 3_600_000.0,
            TimeUnit::Days => 86_400_000.0,
            TimeUnit::Years => 31_536_000_000.0,
        }
    }

    /// Short label used when rendering durations.
    pub fn abbreviation(self) -> &'static str {
        match self {
            TimeUnit::Milliseconds => "ms",
            TimeUnit::Seconds => "s",
            TimeUnit::Minutes => "m",
            TimeUnit::Hours => "h",
            TimeUnit::Days => "d",
            TimeUnit::Years => "y",
        }
    }
}

impl fmt::Display for TimeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.abbreviation())
    }
}

/// A duration stored in milliseconds.
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
pub struct TimeInterval {
    pub millis: f64,
}

impl TimeInterval {
    pub fn from_millis(millis: f64) -> Self {
        Self { millis }
    }

    /// `value` expressed in `unit`, e.g. `TimeInterval::new(24.0, TimeUnit::Hours)`.
    pub fn new(value: f64, unit: TimeUnit) -> Self {
        Self {
            millis: value * unit.millis(),
        }
    }

    /// This interval scaled by `factor`.
    pub fn mul(self, factor: f64) -> Self {
        Self {
            millis: self.millis * factor,
        }
    }

    /// Length of this interval measured in `unit`.
    pub fn in_unit(self, unit: TimeUnit) -> f64 {
        self.millis / unit.millis()
    }
}

impl fmt::Display for TimeInterval {
    /// Renders as `"2d 3h 15m"`, omitting empty components and printing the
    /// millisecond remainder with at most two decimals. Negative intervals
    /// get a leading `-`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut rest = self.millis.abs();
        let mut parts: Vec<String> = Vec::new();
        for unit in TimeUnit::DESCENDING.iter().take(5) {
            let count = (rest / unit.millis()).floor();
            if count >= 1.0 {
                parts.push(format!("{}{}", count as u64, unit.abbreviation()));
                rest -= count * unit.millis();
            }
        }
        if rest > 0.0 {
            let rounded = (rest * 100.0).round() / 100.0;
            parts.push(format!("{}ms", rounded));
        }
        if parts.is_empty() {
            return f.write_str("0");
        }
        if self.millis < 0.0 {
            f.write_str("-")?;
        }
        f.write_str(&parts.join(" "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unit_conversion() {
        let day = TimeInterval::new(1.0, TimeUnit::Days);
        assert_eq!(day.in_unit(TimeUnit::Hours), 24.0);
        assert_eq!(day.in_unit(TimeUnit::Minutes), 1440.0);
        assert_eq!(TimeInterval::new(1.0, TimeUnit::Minutes).mul(1440.0), day);
    }

    #[test]
    fn test_display() {
        let t = TimeInterval::new(26.5, TimeUnit::Hours);
        assert_eq!(t.to_string(), "1d 2h 30m");
        assert_eq!(TimeInterval::from_millis(0.0).to_string(), "0");
        assert_eq!(TimeInterval::from_millis(1500.25).to_string(), "1s 500.25ms");
        assert_eq!(TimeInterval::new(366.0, TimeUnit::Days).to_string(), "1y 1d");
    }

    #[test]
    fn test_display_negative() {
        assert_eq!(TimeInterval::new(-30.0, TimeUnit::Minutes).to_string(), "-30m");
        assert_eq!(TimeInterval::new(-26.5, TimeUnit::Hours).to_string(), "-1d 2h 30m");
        assert_eq!(TimeInterval::from_millis(-0.0).to_string(), "0");
    }
}
