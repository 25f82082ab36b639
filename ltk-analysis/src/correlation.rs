//! Cross-variable pairing and the calendar-month seasonal profile.

use crate::{
    resample::{resample, Bucket},
    scale::AggregationScale,
    trend::TrendLine,
};
use chrono::{Datelike, NaiveDate};
use log::debug;
use ltk_core::{
    error::{AnalysisError, Result},
    TimeSeries,
};
use serde::Serialize;
use std::collections::BTreeMap;

pub const MONTH_NAMES: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// Values of two variables for the same period.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PairedSample {
    pub period_start: NaiveDate,
    pub x: f64,
    pub y: f64,
}

/// Pair buckets of an independent variable with target buckets by period.
///
/// Periods present on only one side are dropped.
pub fn align_buckets(x: &[Bucket], y: &[Bucket]) -> Vec<PairedSample> {
    let targets: BTreeMap<NaiveDate, f64> =
        y.iter().map(|b| (b.period_start, b.mean_value)).collect();
    x.iter()
        .filter_map(|b| {
            targets.get(&b.period_start).map(|y| PairedSample {
                period_start: b.period_start,
                x: b.mean_value,
                y: *y,
            })
        })
        .collect()
}

/// Trend of a target variable against an independent variable.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Correlation {
    pub variable: String,
    pub target: String,
    pub scale: AggregationScale,
    pub pairs: Vec<PairedSample>,
    pub trend: TrendLine,
}

/// Resample `variable` and `target` at `scale`, pair them and fit a line.
///
/// Pairs whose independent value is exactly zero are removed before fitting;
/// zero readings mark missing sensor data in the source tables.
pub fn correlate(
    series: &TimeSeries,
    variable: &str,
    target: &str,
    scale: AggregationScale,
) -> Result<Correlation> {
    let x = resample(series, variable, scale)?;
    let y = resample(series, target, scale)?;
    let aligned = align_buckets(&x, &y);
    let before = aligned.len();
    let pairs: Vec<PairedSample> = aligned.into_iter().filter(|p| p.x != 0.0).collect();
    debug!(
        "correlation: '{}' vs '{}' at {} scale, {} pairs ({} zero values removed)",
        variable,
        target,
        scale,
        pairs.len(),
        before - pairs.len()
    );
    if pairs.is_empty() {
        return Err(AnalysisError::InsufficientData(format!(
            "no overlapping {scale} periods between '{variable}' and '{target}'"
        )));
    }
    let xs: Vec<f64> = pairs.iter().map(|p| p.x).collect();
    let ys: Vec<f64> = pairs.iter().map(|p| p.y).collect();
    let trend = TrendLine::fit(&xs, &ys)?;
    Ok(Correlation {
        variable: variable.to_string(),
        target: target.to_string(),
        scale,
        pairs,
        trend,
    })
}

/// Mean of a variable per calendar month, across all years.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeasonalProfile {
    pub variable: String,
    /// Index 0 is January; `None` for months without data.
    pub monthly_means: [Option<f64>; 12],
}

impl SeasonalProfile {
    /// `(month, mean)` for the months that have data, month numbered 1-12.
    pub fn points(&self) -> Vec<(u32, f64)> {
        self.monthly_means
            .iter()
            .enumerate()
            .filter_map(|(i, mean)| mean.map(|m| (i as u32 + 1, m)))
            .collect()
    }

    pub fn mean_for(&self, month: u32) -> Option<f64> {
        let index = month.checked_sub(1)? as usize;
        self.monthly_means.get(index).copied().flatten()
    }
}

/// Group the raw observations of `variable` by calendar month.
pub fn seasonal_profile(series: &TimeSeries, variable: &str) -> Result<SeasonalProfile> {
    let mut sums = [(0.0_f64, 0usize); 12];
    for (date, value) in series.observations(variable)? {
        let slot = &mut sums[date.month0() as usize];
        slot.0 += value;
        slot.1 += 1;
    }
    let mut monthly_means = [None; 12];
    for (mean, (sum, count)) in monthly_means.iter_mut().zip(sums) {
        if count > 0 {
            *mean = Some(sum / count as f64);
        }
    }
    Ok(SeasonalProfile {
        variable: variable.to_string(),
        monthly_means,
    })
}
