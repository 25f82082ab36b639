//! Bucketing of a variable into daily, monthly or yearly means.

use crate::scale::AggregationScale;
use chrono::{Datelike, NaiveDate};
use log::debug;
use ltk_core::{
    date_range::{DateRange, MonthRange},
    error::Result,
    interpolation::fill_interior_gaps,
    TimeSeries,
};
use serde::Serialize;
use std::collections::BTreeMap;

/// Minimum number of daily samples for a yearly bucket to be kept.
pub const MIN_YEARLY_SAMPLES: usize = 365;

/// One aggregated period of a variable.
///
/// `sample_count` is the number of observations averaged into the bucket;
/// it is 0 for a bucket whose value was interpolated from its neighbours.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Bucket {
    pub period_start: NaiveDate,
    pub mean_value: f64,
    pub sample_count: usize,
}

fn period_starts(scale: AggregationScale, first: NaiveDate, last: NaiveDate) -> Vec<NaiveDate> {
    match scale {
        AggregationScale::Daily => DateRange(first, last).collect(),
        AggregationScale::Monthly => MonthRange::new(first, last).collect(),
        AggregationScale::Yearly => (first.year()..=last.year())
            .filter_map(|year| NaiveDate::from_ymd_opt(year, 1, 1))
            .collect(),
    }
}

/// Aggregate `variable` of `series` into buckets at `scale`.
///
/// Buckets cover every period from the first to the last date of the
/// series. Yearly buckets with fewer than [`MIN_YEARLY_SAMPLES`] samples are
/// dropped. Empty buckets are interpolated against their index when valued
/// buckets exist on both sides, and dropped otherwise.
pub fn resample(
    series: &TimeSeries,
    variable: &str,
    scale: AggregationScale,
) -> Result<Vec<Bucket>> {
    let observations = series.observations(variable)?;
    let (first, last) = match (series.first_date(), series.last_date()) {
        (Some(first), Some(last)) => (first, last),
        _ => return Ok(Vec::new()),
    };

    let mut sums: BTreeMap<NaiveDate, (f64, usize)> = BTreeMap::new();
    for (date, value) in &observations {
        let entry = sums.entry(scale.period_start(date)).or_insert((0.0, 0));
        entry.0 += value;
        entry.1 += 1;
    }

    let mut periods: Vec<(NaiveDate, Option<f64>, usize)> = period_starts(scale, first, last)
        .into_iter()
        .map(|start| match sums.get(&start) {
            Some((sum, count)) => (start, Some(sum / *count as f64), *count),
            None => (start, None, 0),
        })
        .collect();

    if scale == AggregationScale::Yearly {
        let before = periods.len();
        periods.retain(|(_, _, count)| *count >= MIN_YEARLY_SAMPLES);
        debug!(
            "resample: dropped {} incomplete years of '{}'",
            before - periods.len(),
            variable
        );
    }

    let positions: Vec<f64> = (0..periods.len()).map(|i| i as f64).collect();
    let means: Vec<Option<f64>> = periods.iter().map(|(_, mean, _)| *mean).collect();
    let filled = fill_interior_gaps(&positions, &means);

    let buckets: Vec<Bucket> = periods
        .iter()
        .zip(filled)
        .filter_map(|((start, _, count), mean)| {
            mean.map(|mean_value| Bucket {
                period_start: *start,
                mean_value,
                sample_count: *count,
            })
        })
        .collect();
    debug!(
        "resample: '{}' at {} scale -> {} buckets from {} samples",
        variable,
        scale,
        buckets.len(),
        observations.len()
    );
    Ok(buckets)
}

/// `(period_start, mean_value)` pairs, the form consumed by charts and CSV output.
pub fn points(buckets: &[Bucket]) -> Vec<(NaiveDate, f64)> {
    buckets
        .iter()
        .map(|b| (b.period_start, b.mean_value))
        .collect()
}

/// A single-variable series holding one row per bucket.
pub fn buckets_to_series(variable: &str, buckets: &[Bucket]) -> Result<TimeSeries> {
    TimeSeries::from_observations(variable, &points(buckets))
}
