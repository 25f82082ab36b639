//! Time-series analysis engine for lake level data.
//!
//! Stages, leaf first: [`trend`] fits straight lines, [`scale`] picks the
//! aggregation period from the span of the data, [`resample`] buckets a
//! variable at that period, [`changepoint`] finds where the trajectory
//! changed, [`forecast`] extrapolates the latest regime, and [`correlation`]
//! pairs covariates with the target. [`pipeline`] runs them in order.

pub mod changepoint;
pub mod correlation;
pub mod forecast;
pub mod pipeline;
pub mod resample;
pub mod scale;
pub mod trend;

pub use forecast::Forecast;
pub use pipeline::{run, AnalysisConfig, AnalysisRun};
pub use scale::AggregationScale;
pub use trend::TrendLine;
