//! Choice of the aggregation scale from the span of a series.

use chrono::NaiveDate;
use ltk_core::{
    error::{AnalysisError, Result},
    TimeSeries,
};
use ltk_utils::dates::{month_start, span_in_years, year_start};
use serde::Serialize;
use std::fmt;

/// Spans strictly longer than this many years are aggregated yearly.
pub const YEARLY_SPAN_YEARS: f64 = 10.0;

/// Spans strictly longer than this many years (and not yearly) are
/// aggregated monthly.
pub const MONTHLY_SPAN_YEARS: f64 = 2.0;

/// Period length used for every variable in one analysis run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum AggregationScale {
    Daily,
    Monthly,
    Yearly,
}

impl AggregationScale {
    /// Select the scale for a series spanning `date_min` to `date_max`.
    pub fn select(date_min: NaiveDate, date_max: NaiveDate) -> Result<Self> {
        if date_max < date_min {
            return Err(AnalysisError::InvalidScaleSelection {
                start: date_min,
                end: date_max,
            });
        }
        let years = span_in_years(&date_min, &date_max);
        let scale = if years > YEARLY_SPAN_YEARS {
            AggregationScale::Yearly
        } else if years > MONTHLY_SPAN_YEARS {
            AggregationScale::Monthly
        } else {
            AggregationScale::Daily
        };
        log::debug!("scale: {:.2} years spanned, using {}", years, scale);
        Ok(scale)
    }

    /// Select the scale from the first and last date of a series.
    pub fn for_series(series: &TimeSeries) -> Result<Self> {
        match (series.first_date(), series.last_date()) {
            (Some(first), Some(last)) => AggregationScale::select(first, last),
            _ => Err(AnalysisError::InsufficientData(String::from(
                "cannot select a time scale for an empty series",
            ))),
        }
    }

    /// Scale for pairing covariates with the target: yearly buckets leave
    /// too few pairs, so long series are correlated monthly.
    pub fn correlation_scale(self) -> Self {
        match self {
            AggregationScale::Yearly => AggregationScale::Monthly,
            other => other,
        }
    }

    /// First day of the period containing `date`.
    pub fn period_start(self, date: &NaiveDate) -> NaiveDate {
        match self {
            AggregationScale::Daily => *date,
            AggregationScale::Monthly => month_start(date),
            AggregationScale::Yearly => year_start(date),
        }
    }
}

impl fmt::Display for AggregationScale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AggregationScale::Daily => "daily",
            AggregationScale::Monthly => "monthly",
            AggregationScale::Yearly => "yearly",
        };
        write!(f, "{name}")
    }
}
