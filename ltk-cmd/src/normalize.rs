//! Datum normalization of raw level readings.
//!
//! Gauge readings are stored as elevations; subtracting the elevation of the
//! deepest point of the lake moves them into the frame where 0 means empty.

use crate::raw_options;
use anyhow::Context;
use log::info;
use ltk_core::{error::Result, TimeSeries};

/// Elevation of the deepest point of the lake, in meters.
pub const DEEPEST_POINT: f64 = 45.3;

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

/// Subtract `deepest_point` from every value of `column`, rounded to millimeters.
pub fn normalize_datum(series: &TimeSeries, column: &str, deepest_point: f64) -> Result<TimeSeries> {
    series.map_column(column, |v| round3(v - deepest_point))
}

/// Rewrite `input` to `output` with ISO dates and the level column shifted.
pub fn run_normalize(
    input: &str,
    output: &str,
    column: &str,
    deepest_point: f64,
) -> anyhow::Result<()> {
    let series = TimeSeries::from_csv_path(input, &raw_options())
        .with_context(|| format!("Failed to load {input}"))?;
    let normalized = normalize_datum(&series, column, deepest_point)?;
    normalized
        .write_csv(output)
        .with_context(|| format!("Failed to write {output}"))?;
    info!(
        "Normalized {} rows of '{}' by {} m into {}",
        normalized.len(),
        column,
        deepest_point,
        output
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shifts_level_and_rewrites_dates() {
        let dir = std::env::temp_dir().join("ltk_cmd_normalize");
        std::fs::create_dir_all(&dir).unwrap();
        let input = dir.join("waterlevel.csv");
        let output = dir.join("formatted_waterlevel.csv");
        std::fs::write(
            &input,
            "Date,LakeLevel,Temperature\n01.05.2023,47.512,12\n02.05.2023,,13\n",
        )
        .unwrap();

        run_normalize(
            input.to_str().unwrap(),
            output.to_str().unwrap(),
            "lakelevel",
            DEEPEST_POINT,
        )
        .unwrap();
        let written = std::fs::read_to_string(&output).unwrap();
        assert_eq!(
            written,
            "date,lakelevel,temperature\n2023-05-01,2.212,12\n2023-05-02,,13\n"
        );
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_unknown_column_is_reported() {
        let series = TimeSeries::default();
        assert!(normalize_datum(&series, "lakelevel", DEEPEST_POINT).is_err());
    }
}
