//! Ordinary least squares fit of a straight line.

use chrono::NaiveDate;
use ltk_core::error::{AnalysisError, Result};
use ltk_utils::dates::to_ordinal;
use serde::Serialize;

/// An immutable line `y = slope * x + intercept`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TrendLine {
    slope: f64,
    intercept: f64,
}

impl TrendLine {
    pub fn new(slope: f64, intercept: f64) -> Self {
        TrendLine { slope, intercept }
    }

    /// Fit a degree-1 polynomial to paired samples.
    ///
    /// Fails with `InsufficientData` when the sample is empty, the lengths
    /// differ, or every x is the same (including a single sample).
    pub fn fit(xs: &[f64], ys: &[f64]) -> Result<Self> {
        if xs.len() != ys.len() {
            return Err(AnalysisError::InsufficientData(format!(
                "trend fit needs paired samples, got {} x and {} y values",
                xs.len(),
                ys.len()
            )));
        }
        if xs.is_empty() {
            return Err(AnalysisError::InsufficientData(String::from(
                "trend fit on an empty sample",
            )));
        }
        let n = xs.len() as f64;
        let x_mean = xs.iter().sum::<f64>() / n;
        let y_mean = ys.iter().sum::<f64>() / n;

        // centred sums keep ordinal-date magnitudes from swamping the slope
        let mut sxy = 0.0;
        let mut sxx = 0.0;
        for (x, y) in xs.iter().zip(ys) {
            let dx = x - x_mean;
            sxy += dx * (y - y_mean);
            sxx += dx * dx;
        }
        if sxx == 0.0 || !sxx.is_finite() || !sxy.is_finite() {
            return Err(AnalysisError::InsufficientData(format!(
                "trend fit on {} samples with no spread in x",
                xs.len()
            )));
        }
        let slope = sxy / sxx;
        Ok(TrendLine {
            slope,
            intercept: y_mean - slope * x_mean,
        })
    }

    /// Fit against ordinal dates (days since 1970-01-01).
    pub fn fit_dated(observations: &[(NaiveDate, f64)]) -> Result<Self> {
        let (xs, ys): (Vec<f64>, Vec<f64>) = observations
            .iter()
            .map(|(d, v)| (to_ordinal(d), *v))
            .unzip();
        TrendLine::fit(&xs, &ys)
    }

    pub fn slope(&self) -> f64 {
        self.slope
    }

    pub fn intercept(&self) -> f64 {
        self.intercept
    }

    pub fn evaluate(&self, x: f64) -> f64 {
        self.slope * x + self.intercept
    }

    /// The x at which the line reaches `level`, `None` for a flat line.
    pub fn crossing(&self, level: f64) -> Option<f64> {
        if self.slope == 0.0 {
            return None;
        }
        Some((level - self.intercept) / self.slope)
    }
}
