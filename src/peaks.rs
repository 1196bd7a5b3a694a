//! Local maxima of a response curve, ranked by height.

use std::cmp::Ordering;

/// Find local maxima (including flat-topped plateaus) of `response`.
///
/// A peak is a run that is entered by a strict increase and left by a strict
/// decrease; the representative index of a plateau is the (floor) midpoint
/// of its flat span. Index 0 can only start a peak candidate, it is never a
/// peak on its own unless the values after it descend.
///
/// # Returns
/// Peak indices sorted by descending response value. Equal values are
/// ordered by descending index, so the ordering is total and deterministic.
pub fn find_peaks(response: &[f64]) -> Vec<usize> {
    if response.len() < 2 {
        return Vec::new();
    }

    let mut peaks: Vec<usize> = Vec::new();
    // Start of the current run at the running maximum; None while descending.
    let mut plateau_start: Option<usize> = Some(0);
    let mut last = response[0];

    for (i, &v) in response.iter().enumerate().skip(1) {
        if v > last {
            plateau_start = Some(i);
        } else if v < last {
            if let Some(start) = plateau_start.take() {
                peaks.push((start + i - 1) / 2);
            }
        }
        last = v;
    }

    peaks.sort_by(|&a, &b| compare_peaks(response, a, b));
    peaks
}

/// Descending by value, then descending by index.
fn compare_peaks(response: &[f64], a: usize, b: usize) -> Ordering {
    response[b]
        .total_cmp(&response[a])
        .then_with(|| b.cmp(&a))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_peak() {
        assert_eq!(find_peaks(&[0.0, 1.0, 3.0, 1.0, 0.0]), vec![2]);
    }

    #[test]
    fn test_peaks_sorted_by_height() {
        let r = [0.0, 2.0, 0.0, 5.0, 0.0, 3.0, 0.0];
        assert_eq!(find_peaks(&r), vec![3, 5, 1]);
    }

    #[test]
    fn test_plateau_midpoint() {
        // Plateau spans indices 2..=5 -> midpoint (2 + 5) / 2 = 3
        let r = [0.0, 1.0, 4.0, 4.0, 4.0, 4.0, 1.0];
        assert_eq!(find_peaks(&r), vec![3]);
    }

    #[test]
    fn test_boundaries() {
        // Descending from index 0 counts as a peak at 0
        assert_eq!(find_peaks(&[5.0, 3.0, 1.0]), vec![0]);
        // Rising to the last sample is not a peak
        assert!(find_peaks(&[1.0, 2.0, 3.0]).is_empty());
        assert!(find_peaks(&[1.0]).is_empty());
        assert!(find_peaks(&[]).is_empty());
    }

    #[test]
    fn test_equal_heights_ordered_by_index() {
        let r = [0.0, 2.0, 0.0, 2.0, 0.0];
        assert_eq!(find_peaks(&r), vec![3, 1]);
    }

    #[test]
    fn test_sine_response() {
        let r: Vec<f64> = (0..200)
            .map(|i| (2.0 * std::f64::consts::PI * i as f64 / 40.0).sin())
            .collect();
        let peaks = find_peaks(&r);
        assert_eq!(peaks.len(), 5);
        for p in peaks {
            assert_eq!(p % 40, 10);
        }
    }
}
