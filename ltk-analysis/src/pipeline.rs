//! One analysis run over an ingested table.
//!
//! Each stage returns a new value: the prepared series, the scale chosen for
//! the run, per-variable buckets with their trends and correlations, the
//! target forecast and its seasonal profile. A failure in one variable is
//! recorded in its [`VariableOutcome`] and does not stop the others.

use crate::{
    correlation::{correlate, seasonal_profile, Correlation, SeasonalProfile},
    forecast::{forecast_series, Forecast},
    resample::{points, resample, Bucket},
    scale::AggregationScale,
    trend::TrendLine,
};
use log::{info, warn};
use ltk_core::{column::normalize_name, error::Result, variable::LAKE_LEVEL, TimeSeries};

/// Settings of an analysis run.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisConfig {
    /// Variable that is forecast and correlated against.
    pub target: String,
    /// Unit printed after forecast values.
    pub unit: String,
    /// Reference elevation subtracted from the target before analysis.
    pub datum_offset: Option<f64>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        AnalysisConfig {
            target: LAKE_LEVEL.to_string(),
            unit: String::from("m"),
            datum_offset: None,
        }
    }
}

/// Everything computed for one variable.
#[derive(Debug)]
pub struct VariableAnalysis {
    pub variable: String,
    pub buckets: Vec<Bucket>,
    /// Trend over the resampled series, `None` when it cannot be fitted.
    pub trend: Option<TrendLine>,
    /// Trend of the target against this variable, `None` for the target
    /// itself or when no usable pairs exist.
    pub correlation: Option<Correlation>,
}

#[derive(Debug)]
pub struct VariableOutcome {
    pub variable: String,
    pub result: Result<VariableAnalysis>,
}

/// Result of [`run`].
#[derive(Debug)]
pub struct AnalysisRun {
    pub scale: AggregationScale,
    pub series: TimeSeries,
    pub variables: Vec<VariableOutcome>,
    /// `None` when the table has no target column.
    pub forecast: Option<Result<Forecast>>,
    pub seasonal: Option<SeasonalProfile>,
}

impl AnalysisRun {
    pub fn succeeded(&self) -> impl Iterator<Item = &VariableAnalysis> {
        self.variables.iter().filter_map(|o| o.result.as_ref().ok())
    }
}

/// Check that every requested variable is a column of `series`.
///
/// Fails on the first unknown name, with the closest column as suggestion.
pub fn validate_variables(series: &TimeSeries, variables: &[String]) -> Result<()> {
    match variables.iter().find(|v| !series.has_column(v)) {
        Some(missing) => Err(series.missing_column(missing)),
        None => Ok(()),
    }
}

/// Apply the datum offset of `config` to the target column.
pub fn prepare(series: &TimeSeries, config: &AnalysisConfig) -> Result<TimeSeries> {
    match config.datum_offset {
        Some(offset) if series.has_column(&config.target) => {
            info!(
                "pipeline: subtracting datum {} from '{}'",
                offset, config.target
            );
            series.map_column(&config.target, |v| v - offset)
        }
        _ => Ok(series.clone()),
    }
}

fn analyze_variable(
    series: &TimeSeries,
    variable: &str,
    scale: AggregationScale,
    config: &AnalysisConfig,
) -> Result<VariableAnalysis> {
    let buckets = resample(series, variable, scale)?;
    let trend = match TrendLine::fit_dated(&points(&buckets)) {
        Ok(trend) => Some(trend),
        Err(e) => {
            warn!("pipeline: no trend for '{}': {}", variable, e);
            None
        }
    };
    let correlation = if variable != normalize_name(&config.target)
        && series.has_column(&config.target)
    {
        match correlate(series, variable, &config.target, scale.correlation_scale()) {
            Ok(correlation) => Some(correlation),
            Err(e) => {
                warn!("pipeline: no correlation for '{}': {}", variable, e);
                None
            }
        }
    } else {
        None
    };
    Ok(VariableAnalysis {
        variable: variable.to_string(),
        buckets,
        trend,
        correlation,
    })
}

/// Run the full analysis over `variables` of `series`, or over every column
/// when `variables` is empty. Requested names are matched and reported in
/// their normalized form.
pub fn run(
    series: &TimeSeries,
    variables: &[String],
    config: &AnalysisConfig,
) -> Result<AnalysisRun> {
    validate_variables(series, variables)?;
    let series = prepare(series, config)?;
    let scale = AggregationScale::for_series(&series)?;
    let variables: Vec<String> = if variables.is_empty() {
        series.column_names().map(String::from).collect()
    } else {
        variables.iter().map(|v| normalize_name(v)).collect()
    };
    info!(
        "pipeline: {} rows, {} variables, {} scale",
        series.len(),
        variables.len(),
        scale
    );

    let outcomes: Vec<VariableOutcome> = variables
        .iter()
        .map(|variable| {
            let result = analyze_variable(&series, variable, scale, config);
            if let Err(e) = &result {
                warn!("pipeline: skipping '{}': {}", variable, e);
            }
            VariableOutcome {
                variable: variable.clone(),
                result,
            }
        })
        .collect();

    let (forecast, seasonal) = if series.has_column(&config.target) {
        let forecast = forecast_series(&series, &config.target, &config.unit);
        if let Err(e) = &forecast {
            warn!("pipeline: no forecast for '{}': {}", config.target, e);
        }
        let seasonal = seasonal_profile(&series, &config.target).ok();
        (Some(forecast), seasonal)
    } else {
        info!("pipeline: no '{}' column, skipping forecast", config.target);
        (None, None)
    };

    Ok(AnalysisRun {
        scale,
        series,
        variables: outcomes,
        forecast,
        seasonal,
    })
}
