//! Detection of abrupt changes in the trajectory of a series.
//!
//! A straight line is fitted over a sliding window and the absolute
//! difference between consecutive window slopes is compared against twice
//! the sample standard deviation of all those differences. Positions whose
//! difference is strictly greater are change points; the last one marks the
//! start of the current regime.

use crate::trend::TrendLine;
use chrono::NaiveDate;
use log::debug;
use ltk_core::error::{AnalysisError, Result};
use ltk_utils::dates::to_ordinal;
use serde::Serialize;

/// Smallest sliding window, in samples.
pub const MIN_WINDOW: usize = 10;

/// Multiple of the standard deviation a slope jump must exceed.
pub const THRESHOLD_SIGMAS: f64 = 2.0;

/// Slope differences below this fraction of the largest slope magnitude are
/// floating-point noise and count as zero.
pub const RELATIVE_SLOPE_TOLERANCE: f64 = 1e-9;

/// Rounding error of a window slope, in ulps of the largest |y| per window
/// sample, spread over the x extent of one window.
pub const Y_ROUNDING_ULPS: f64 = 4.0;

/// Window size for a series of `n` samples: `max(10, n / 10)`.
pub fn window_size(n: usize) -> usize {
    MIN_WINDOW.max(n / 10)
}

/// Result of a change-point scan.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChangePoints {
    /// Window width used for the rolling slopes.
    pub window: usize,
    /// Slope of the window starting at each position.
    pub slopes: Vec<f64>,
    /// `|slopes[i] - slopes[i - 1]|`, stored at `i - 1`.
    pub differences: Vec<f64>,
    /// `2 x std(differences)`, absent when fewer than two differences exist.
    pub threshold: Option<f64>,
    /// Flagged window positions, ascending.
    pub positions: Vec<usize>,
}

impl ChangePoints {
    /// Start index of the most recent regime, if any change was found.
    pub fn last(&self) -> Option<usize> {
        self.positions.last().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

/// Slope of every full window of `window` samples.
pub fn rolling_slopes(xs: &[f64], ys: &[f64], window: usize) -> Result<Vec<f64>> {
    if xs.len() != ys.len() {
        return Err(AnalysisError::InsufficientData(format!(
            "rolling slopes need paired samples, got {} x and {} y values",
            xs.len(),
            ys.len()
        )));
    }
    if window == 0 || xs.len() < window {
        return Ok(Vec::new());
    }
    xs.windows(window)
        .zip(ys.windows(window))
        .map(|(wx, wy)| TrendLine::fit(wx, wy).map(|t| t.slope()))
        .collect()
}

/// Largest slope difference that can come from rounding alone.
///
/// Two floors: one relative to the slopes themselves, one from the rounding
/// of y values, which dominates for nearly flat series far from zero.
fn noise_floor(xs: &[f64], ys: &[f64], window: usize, slopes: &[f64]) -> f64 {
    let slope_scale = slopes.iter().fold(0.0_f64, |acc, s| acc.max(s.abs()));
    let relative = RELATIVE_SLOPE_TOLERANCE * slope_scale;
    let n = xs.len();
    if n < 2 || window < 2 {
        return relative;
    }
    let window_span = (xs[n - 1] - xs[0]) * (window - 1) as f64 / (n - 1) as f64;
    if window_span <= 0.0 || !window_span.is_finite() {
        return relative;
    }
    let y_scale = ys.iter().fold(0.0_f64, |acc, y| acc.max(y.abs()));
    let rounding = Y_ROUNDING_ULPS * f64::EPSILON * y_scale * window as f64 / window_span;
    relative.max(rounding)
}

fn sample_std(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
    Some(variance.sqrt())
}

/// Scan `(x, y)` samples, sorted by x, for change points.
pub fn detect(xs: &[f64], ys: &[f64]) -> Result<ChangePoints> {
    let window = window_size(xs.len());
    let slopes = rolling_slopes(xs, ys, window)?;

    let tolerance = noise_floor(xs, ys, window, &slopes);
    let differences: Vec<f64> = slopes
        .windows(2)
        .map(|pair| {
            let d = (pair[1] - pair[0]).abs();
            if d <= tolerance {
                0.0
            } else {
                d
            }
        })
        .collect();

    let threshold = sample_std(&differences).map(|std| THRESHOLD_SIGMAS * std);
    let positions: Vec<usize> = match threshold {
        Some(threshold) => differences
            .iter()
            .enumerate()
            .filter(|(_, d)| **d > threshold)
            .map(|(i, _)| i + 1)
            .collect(),
        None => Vec::new(),
    };
    debug!(
        "changepoint: {} samples, window {}, {} slopes, threshold {:?}, {} change points",
        xs.len(),
        window,
        slopes.len(),
        threshold,
        positions.len()
    );
    Ok(ChangePoints {
        window,
        slopes,
        differences,
        threshold,
        positions,
    })
}

/// Scan dated observations (x = days since 1970-01-01) for change points.
pub fn detect_dated(observations: &[(NaiveDate, f64)]) -> Result<ChangePoints> {
    let (xs, ys): (Vec<f64>, Vec<f64>) = observations
        .iter()
        .map(|(d, v)| (to_ordinal(d), *v))
        .unzip();
    detect(&xs, &ys)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn dated(start: NaiveDate, values: &[f64]) -> Vec<(NaiveDate, f64)> {
        values
            .iter()
            .enumerate()
            .map(|(i, v)| (start + Duration::days(i as i64), *v))
            .collect()
    }

    #[test]
    fn test_window_size_grows_with_length() {
        assert_eq!(window_size(0), 10);
        assert_eq!(window_size(99), 10);
        assert_eq!(window_size(200), 20);
        assert_eq!(window_size(1234), 123);
    }

    #[test]
    fn test_linear_series_has_no_change_points() {
        let start = NaiveDate::from_ymd_opt(2001, 3, 1).unwrap();
        for (slope, intercept) in [
            (0.37, 12.0),
            (-0.004, 50.0),
            (0.0, 50.0),
            (1e-6, -3.0),
            (1e-8, 50.0),
            (-1e-6, 95.3),
            (1e-5, 1000.0),
            (-3e-4, 2.5),
        ] {
            let values: Vec<f64> = (0..500).map(|t| slope * t as f64 + intercept).collect();
            let result = detect_dated(&dated(start, &values)).unwrap();
            assert_eq!(result.window, 50);
            assert_eq!(result.slopes.len(), 451);
            assert!(result.is_empty(), "slope {slope}: {:?}", result.positions);
        }
    }

    #[test]
    fn test_slope_reversal_is_found_near_the_break() {
        let k = 120usize;
        let values: Vec<f64> = (0..200usize)
            .map(|t| {
                if t <= k {
                    10.0 + 0.1 * t as f64
                } else {
                    10.0 + 0.1 * k as f64 - 0.1 * (t - k) as f64
                }
            })
            .collect();
        let start = NaiveDate::from_ymd_opt(2010, 1, 1).unwrap();
        let result = detect_dated(&dated(start, &values)).unwrap();
        let w = result.window;
        assert_eq!(w, 20);
        assert!(!result.is_empty());
        for position in &result.positions {
            assert!(position.abs_diff(k) <= w, "position {position} far from {k}");
        }
        assert!(result.last().unwrap().abs_diff(k) <= w);
    }

    #[test]
    fn test_short_series_does_not_fail() {
        let xs: Vec<f64> = (0..5).map(|i| i as f64).collect();
        let ys = vec![1.0, 5.0, 2.0, 8.0, 3.0];
        let result = detect(&xs, &ys).unwrap();
        assert!(result.slopes.is_empty());
        assert!(result.is_empty());
        assert_eq!(result.threshold, None);
    }

    #[test]
    fn test_single_window_has_no_change_points() {
        let xs: Vec<f64> = (0..10).map(|i| i as f64).collect();
        let ys: Vec<f64> = xs.iter().map(|x| x * x).collect();
        let result = detect(&xs, &ys).unwrap();
        assert_eq!(result.slopes.len(), 1);
        assert!(result.differences.is_empty());
        assert!(result.is_empty());
    }

    #[test]
    fn test_comparison_is_strict() {
        // two equal jumps: each sits exactly at mean + 1 std, never above 2 std
        let slopes = [0.0_f64, 1.0, 1.0, 2.0];
        let differences: Vec<f64> = slopes.windows(2).map(|p| (p[1] - p[0]).abs()).collect();
        let threshold = THRESHOLD_SIGMAS * sample_std(&differences).unwrap();
        assert!(differences.iter().all(|d| *d <= threshold));
        assert_eq!(sample_std(&[0.0, 0.0, 0.0]), Some(0.0));
        assert_eq!(sample_std(&[1.0]), None);
    }

    #[test]
    fn test_difference_equal_to_threshold_is_not_flagged() {
        // 14 samples give 5 windows of 10; only the last window sees the step,
        // and its slope is exactly 1: differences [0, 0, 0, 1] have 2 std == 1
        let xs: Vec<f64> = (0..14).map(|i| 3.0 * i as f64).collect();
        let mut ys = vec![0.0; 14];
        ys[13] = 55.0;
        let result = detect(&xs, &ys).unwrap();
        assert_eq!(result.window, 10);
        assert_eq!(result.slopes, vec![0.0, 0.0, 0.0, 0.0, 1.0]);
        assert_eq!(result.differences, vec![0.0, 0.0, 0.0, 1.0]);
        assert_eq!(result.threshold, Some(1.0));
        assert!(result.is_empty());
        assert_eq!(result.last(), None);
    }

    #[test]
    fn test_noise_floor_tracks_level_of_flat_series() {
        let xs: Vec<f64> = (0..500).map(|i| 11_000.0 + i as f64).collect();
        let ys: Vec<f64> = (0..500).map(|t| 50.0 + 1e-8 * t as f64).collect();
        let floor = noise_floor(&xs, &ys, 50, &[1e-8]);
        assert!(floor > 1e-15 && floor < 1e-12, "floor {floor}");
        // steep series keep the relative floor
        assert_eq!(noise_floor(&xs, &[0.0; 500], 50, &[2.0]), 2e-9);
    }
}
