//! Forecast-only command.

use crate::{load_table, AnalysisSettings};
use anyhow::Context;
use ltk_analysis::{forecast::forecast_series, pipeline::prepare};
use log::info;
use std::path::Path;

/// Forecast the target of `input` and print the report, or write it to `output`.
///
/// Unlike `analyze`, a target that cannot be forecast fails the command.
pub fn run_forecast(
    input: &str,
    output: Option<&Path>,
    settings: &AnalysisSettings,
) -> anyhow::Result<()> {
    let series = load_table(input, None, &settings.ingest_options())?;
    let config = settings.config();
    let series = prepare(&series, &config)?;
    let forecast = forecast_series(&series, &config.target, &config.unit)
        .with_context(|| format!("Cannot forecast '{}' from {}", config.target, input))?;
    let report = forecast.to_string();
    match output {
        Some(path) => {
            std::fs::write(path, &report)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            info!("Forecast written to {}", path.display());
        }
        None => println!("{report}"),
    }
    Ok(())
}
