//! Core types for lake trend analysis: the date-indexed [`series::TimeSeries`],
//! CSV ingestion, column lookup with name suggestions, variable metadata,
//! and the Open-Meteo weather client.

pub mod column;
pub mod date_range;
pub mod error;
pub mod ingest;
pub mod interpolation;
pub mod series;
pub mod variable;
pub mod weather;

pub use error::{AnalysisError, Result};
pub use series::TimeSeries;
