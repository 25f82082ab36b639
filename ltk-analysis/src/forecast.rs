//! Lake level forecast from the trend of the most recent regime.

use crate::{
    changepoint::{self, ChangePoints},
    trend::TrendLine,
};
use chrono::NaiveDate;
use log::{debug, info};
use ltk_core::{
    error::{AnalysisError, Result},
    TimeSeries,
};
use ltk_utils::dates::{format_date, from_ordinal, to_ordinal, DAYS_PER_YEAR};
use serde::Serialize;
use std::fmt;

/// Forecast horizons, in years after the last observation.
pub const HORIZON_YEARS: [u32; 4] = [1, 10, 50, 100];

/// Level at which the lake counts as dry in the normalized reference frame.
pub const CRITICAL_LEVEL: f64 = 0.0;

pub const REPORT_HEADER: &str =
    "Forecast based on recent trend after major trajectory change detection:";

pub const REPORT_DISCLAIMER: &str = "This forecast is based on the most recent trend segment after detecting major changes.\nThe forecast is subject to uncertainty and may not reflect actual future conditions.";

/// Predicted value at one horizon.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HorizonForecast {
    pub years: u32,
    pub date: NaiveDate,
    pub value: f64,
}

/// Outcome of a declining trend against the critical level.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DryOut {
    /// The trend reaches the critical level after the last observation.
    Projected {
        days_until_dry: f64,
        years_until_dry: f64,
        /// `None` when the crossing lies beyond the supported calendar.
        date: Option<NaiveDate>,
    },
    /// The fitted trend is already below the critical level.
    AlreadyDry,
}

/// Per-horizon forecasts and the dry-out outlook of one variable.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Forecast {
    pub variable: String,
    pub unit: String,
    pub trend: TrendLine,
    /// First date of the segment the trend was fitted on.
    pub regime_start: NaiveDate,
    /// Number of observations in that segment.
    pub regime_len: usize,
    pub last_date: NaiveDate,
    pub horizons: Vec<HorizonForecast>,
    pub dry_out: Option<DryOut>,
}

impl Forecast {
    /// Horizon forecast for `years`, if it is one of [`HORIZON_YEARS`].
    pub fn horizon(&self, years: u32) -> Option<&HorizonForecast> {
        self.horizons.iter().find(|h| h.years == years)
    }
}

fn out_of_range(x: f64) -> AnalysisError {
    AnalysisError::InvalidFormat(format!("forecast position {x} is outside the calendar"))
}

/// Forecast from observations sorted by date and the change points found in
/// them.
///
/// The trend is fitted on the observations from the last change point on,
/// or on all of them when there is none or that segment has fewer than two
/// samples.
pub fn forecast(
    variable: &str,
    unit: &str,
    observations: &[(NaiveDate, f64)],
    change_points: &ChangePoints,
) -> Result<Forecast> {
    if observations.len() < 2 {
        return Err(AnalysisError::InsufficientData(format!(
            "forecast of '{}' needs at least 2 observations, found {}",
            variable,
            observations.len()
        )));
    }
    let start = match change_points.last() {
        Some(index) if observations.len().saturating_sub(index) >= 2 => index,
        Some(index) => {
            debug!(
                "forecast: regime after change point {} is degenerate, using full series",
                index
            );
            0
        }
        None => 0,
    };
    let regime = &observations[start..];
    let trend = TrendLine::fit_dated(regime)?;

    let last_date = observations[observations.len() - 1].0;
    let last_x = to_ordinal(&last_date);
    let horizons = HORIZON_YEARS
        .iter()
        .map(|&years| {
            let x = last_x + years as f64 * DAYS_PER_YEAR;
            let date = from_ordinal(x).ok_or_else(|| out_of_range(x))?;
            Ok(HorizonForecast {
                years,
                date,
                value: trend.evaluate(x),
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let dry_out = if trend.slope() < 0.0 {
        trend.crossing(CRITICAL_LEVEL).map(|zero_x| {
            let days_until_dry = zero_x - last_x;
            if days_until_dry > 0.0 {
                DryOut::Projected {
                    days_until_dry,
                    years_until_dry: days_until_dry / DAYS_PER_YEAR,
                    date: from_ordinal(zero_x),
                }
            } else {
                DryOut::AlreadyDry
            }
        })
    } else {
        None
    };

    info!(
        "forecast: '{}' fitted on {} of {} observations from {}, slope {:.6}/day",
        variable,
        regime.len(),
        observations.len(),
        regime[0].0,
        trend.slope()
    );
    Ok(Forecast {
        variable: variable.to_string(),
        unit: unit.to_string(),
        trend,
        regime_start: regime[0].0,
        regime_len: regime.len(),
        last_date,
        horizons,
        dry_out,
    })
}

/// Detect change points in `variable` of `series` and forecast it.
pub fn forecast_series(series: &TimeSeries, variable: &str, unit: &str) -> Result<Forecast> {
    let observations = series.observations(variable)?;
    let change_points = changepoint::detect_dated(&observations)?;
    forecast(variable, unit, &observations, &change_points)
}

impl fmt::Display for DryOut {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DryOut::Projected {
                days_until_dry,
                years_until_dry,
                date,
            } => {
                write!(
                    f,
                    "Warning: Lake is projected to dry out in {} days ({:.2} years), ",
                    days_until_dry.trunc() as i64,
                    years_until_dry
                )?;
                match date {
                    Some(date) => write!(f, "around {}.", format_date(date)),
                    None => write!(f, "beyond the supported calendar range."),
                }
            }
            DryOut::AlreadyDry => write!(
                f,
                "Warning: Trend suggests lake would already be dry based on current data."
            ),
        }
    }
}

impl fmt::Display for Forecast {
    /// The plain-text forecast report.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{REPORT_HEADER}")?;
        writeln!(f)?;
        for horizon in &self.horizons {
            write!(
                f,
                "Forecast for {} years ({}): {:.2}",
                horizon.years,
                format_date(&horizon.date),
                horizon.value
            )?;
            if self.unit.is_empty() {
                writeln!(f)?;
            } else {
                writeln!(f, " {}", self.unit)?;
            }
        }
        if let Some(dry_out) = &self.dry_out {
            writeln!(f)?;
            writeln!(f, "{dry_out}")?;
        }
        writeln!(f)?;
        write!(f, "{REPORT_DISCLAIMER}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn dated(start: NaiveDate, days: usize, f: impl Fn(f64) -> f64) -> Vec<(NaiveDate, f64)> {
        (0..days)
            .map(|i| (start + Duration::days(i as i64), f(i as f64)))
            .collect()
    }

    fn found(positions: &[usize]) -> ChangePoints {
        ChangePoints {
            window: 10,
            slopes: Vec::new(),
            differences: Vec::new(),
            threshold: None,
            positions: positions.to_vec(),
        }
    }

    fn epoch() -> NaiveDate {
        NaiveDate::from_ymd_opt(1970, 1, 1).unwrap()
    }

    #[test]
    fn test_dry_out_of_a_declining_line() {
        let observations = dated(epoch(), 100, |t| 50.0 - 0.01 * t);
        let result = forecast("lakelevel", "m", &observations, &found(&[])).unwrap();
        assert!((result.trend.crossing(0.0).unwrap() - 5000.0).abs() < 1e-6);
        match result.dry_out {
            Some(DryOut::Projected {
                days_until_dry,
                years_until_dry,
                date,
            }) => {
                assert!((days_until_dry - 4901.0).abs() < 1e-6);
                assert!((years_until_dry - 4901.0 / 365.25).abs() < 1e-6);
                assert_eq!(date, NaiveDate::from_ymd_opt(1983, 9, 10));
            }
            other => panic!("unexpected dry out {other:?}"),
        }
        let report = result.to_string();
        assert!(report.contains("Warning: Lake is projected to dry out in"));
        assert!(report.contains("(13.42 years), around 1983-09-10."));
    }

    #[test]
    fn test_constant_level_has_flat_forecast() {
        let start = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        let observations = dated(start, 100, |_| 50.0);
        let result = forecast("lakelevel", "m", &observations, &found(&[])).unwrap();
        assert_eq!(result.horizons.len(), 4);
        for horizon in &result.horizons {
            assert!((horizon.value - 50.0).abs() < 1e-9);
        }
        assert_eq!(result.dry_out, None);
        let report = result.to_string();
        assert!(report.contains("Forecast for 100 years"));
        assert!(report.contains(": 50.00 m\n"));
        assert!(!report.contains("Warning"));
    }

    #[test]
    fn test_horizons_follow_slope_sign() {
        let start = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        for slope in [-0.05, 0.05] {
            let observations = dated(start, 100, |t| 50.0 + slope * t);
            let result = forecast("lakelevel", "m", &observations, &found(&[])).unwrap();
            let one = result.horizon(1).unwrap().value;
            let hundred = result.horizon(100).unwrap().value;
            if slope < 0.0 {
                assert!(hundred < one);
            } else {
                assert!(hundred > one);
                assert_eq!(result.dry_out, None);
            }
        }
    }

    #[test]
    fn test_horizon_dates_use_average_years() {
        let start = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        let observations = dated(start, 100, |t| 50.0 + 0.01 * t);
        let result = forecast("lakelevel", "m", &observations, &found(&[])).unwrap();
        // last date 2020-04-09; a century holds 24 leap days, so 36525 days overshoot by one
        assert_eq!(result.last_date, NaiveDate::from_ymd_opt(2020, 4, 9).unwrap());
        assert_eq!(
            result.horizon(1).unwrap().date,
            NaiveDate::from_ymd_opt(2021, 4, 9).unwrap()
        );
        assert_eq!(
            result.horizon(100).unwrap().date,
            NaiveDate::from_ymd_opt(2120, 4, 10).unwrap()
        );
    }

    #[test]
    fn test_already_dry_when_crossing_is_in_the_past() {
        let start = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        let observations = dated(start, 50, |t| -1.0 - 0.1 * t);
        let result = forecast("lakelevel", "m", &observations, &found(&[])).unwrap();
        assert_eq!(result.dry_out, Some(DryOut::AlreadyDry));
        assert!(result
            .to_string()
            .contains("Trend suggests lake would already be dry based on current data."));
    }

    #[test]
    fn test_fits_only_the_last_regime() {
        let start = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        // rising for 60 days, then falling
        let observations = dated(start, 100, |t| {
            if t < 60.0 {
                10.0 + t
            } else {
                70.0 - 0.5 * (t - 60.0)
            }
        });
        let result = forecast("lakelevel", "m", &observations, &found(&[60])).unwrap();
        assert_eq!(result.regime_start, start + Duration::days(60));
        assert_eq!(result.regime_len, 40);
        assert!((result.trend.slope() + 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_degenerate_regime_falls_back_to_full_series() {
        let start = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        let observations = dated(start, 30, |t| 5.0 + 0.2 * t);
        let result = forecast("lakelevel", "m", &observations, &found(&[3, 29])).unwrap();
        assert_eq!(result.regime_len, 30);
        assert_eq!(result.regime_start, start);
    }

    #[test]
    fn test_too_few_observations_fail() {
        let start = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        let observations = dated(start, 1, |_| 5.0);
        assert!(matches!(
            forecast("lakelevel", "m", &observations, &found(&[])),
            Err(AnalysisError::InsufficientData(_))
        ));
    }

    #[test]
    fn test_report_layout() {
        let start = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        let observations = dated(start, 100, |_| 50.0);
        let report = forecast("lakelevel", "m", &observations, &found(&[]))
            .unwrap()
            .to_string();
        let lines: Vec<&str> = report.lines().collect();
        assert_eq!(lines[0], REPORT_HEADER);
        assert_eq!(lines[1], "");
        assert_eq!(lines[2], "Forecast for 1 years (2021-04-09): 50.00 m");
        assert_eq!(lines[6], "");
        assert!(report.ends_with("may not reflect actual future conditions."));
    }

    #[test]
    fn test_forecast_series_runs_detection() {
        let start = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        let observations = dated(start, 100, |t| 50.0 - 0.01 * t);
        let series = TimeSeries::from_observations("lakelevel", &observations).unwrap();
        let result = forecast_series(&series, "lakelevel", "m").unwrap();
        assert_eq!(result.regime_len, 100);
        assert!(forecast_series(&series, "lake", "m").is_err());
    }
}
