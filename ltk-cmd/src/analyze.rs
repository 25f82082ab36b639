//! Full analysis run: forecast report, resampled series and charts.

use crate::{load_table, AnalysisSettings};
use anyhow::Context;
use ltk_analysis::{pipeline, resample};
use ltk_chart::{render_correlation_chart, render_seasonal_chart, render_trend_chart, write_svg};
use log::{info, warn};
use std::path::Path;

pub const REPORT_FILE: &str = "lake_level_forecast.txt";
pub const FORECAST_JSON_FILE: &str = "forecast.json";
pub const TREND_DIR: &str = "timeseries_graphs";
pub const CORRELATION_DIR: &str = "correlation_graphs";
pub const RESAMPLED_DIR: &str = "resampled";
pub const SEASONAL_FILE: &str = "seasonal.svg";

/// Write a chart, logging instead of failing when it cannot be rendered.
fn save_chart(path: &Path, rendered: ltk_chart::Result<String>) -> anyhow::Result<()> {
    match rendered {
        Ok(svg) => {
            write_svg(path, &svg).with_context(|| format!("Failed to write {}", path.display()))
        }
        Err(e) => {
            warn!("Skipping chart {}: {}", path.display(), e);
            Ok(())
        }
    }
}

/// Run the analysis over `input` and write every artifact under `output_dir`.
pub fn run_analyze(
    input: &str,
    variables: &[String],
    lakelevel_csv: Option<&str>,
    output_dir: &Path,
    settings: &AnalysisSettings,
) -> anyhow::Result<()> {
    let series = load_table(input, lakelevel_csv, &settings.ingest_options())?;
    let config = settings.config();
    let run = pipeline::run(&series, variables, &config)?;

    let trend_dir = output_dir.join(TREND_DIR);
    let correlation_dir = output_dir.join(CORRELATION_DIR);
    let resampled_dir = output_dir.join(RESAMPLED_DIR);
    for dir in [&trend_dir, &correlation_dir, &resampled_dir] {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;
    }

    match &run.forecast {
        Some(Ok(forecast)) => {
            let report = forecast.to_string();
            println!("{report}");
            let report_path = output_dir.join(REPORT_FILE);
            std::fs::write(&report_path, &report)
                .with_context(|| format!("Failed to write {}", report_path.display()))?;
            let json_path = output_dir.join(FORECAST_JSON_FILE);
            std::fs::write(&json_path, serde_json::to_string_pretty(forecast)?)
                .with_context(|| format!("Failed to write {}", json_path.display()))?;
        }
        Some(Err(e)) => println!("Skipping forecast of '{}': {}", config.target, e),
        None => info!("No '{}' column, no forecast written", config.target),
    }

    for outcome in &run.variables {
        let analysis = match &outcome.result {
            Ok(analysis) => analysis,
            Err(e) => {
                println!("Skipping '{}': {}", outcome.variable, e);
                continue;
            }
        };
        let name = &analysis.variable;
        if !analysis.buckets.is_empty() {
            let csv_path = resampled_dir.join(format!("{name}.csv"));
            resample::buckets_to_series(name, &analysis.buckets)?
                .write_csv(&csv_path)
                .with_context(|| format!("Failed to write {}", csv_path.display()))?;
        }
        save_chart(
            &trend_dir.join(format!("{name}.svg")),
            render_trend_chart(
                name,
                &resample::points(&analysis.buckets),
                analysis.trend.as_ref(),
            ),
        )?;
        if let Some(correlation) = &analysis.correlation {
            save_chart(
                &correlation_dir.join(format!("{name}.svg")),
                render_correlation_chart(correlation),
            )?;
        }
    }

    if let Some(profile) = &run.seasonal {
        save_chart(
            &correlation_dir.join(SEASONAL_FILE),
            render_seasonal_chart(profile),
        )?;
    }

    info!(
        "Analysis complete: {} of {} variables at {} scale",
        run.succeeded().count(),
        run.variables.len(),
        run.scale
    );
    println!(
        "\nGraphs saved to {} and {}",
        trend_dir.display(),
        correlation_dir.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};

    fn settings() -> AnalysisSettings {
        AnalysisSettings {
            target: String::from("lakelevel"),
            unit: String::from("m"),
            datum_offset: None,
            exclude_years: Vec::new(),
            no_interpolate: false,
        }
    }

    #[test]
    fn test_writes_all_artifacts() {
        let dir = std::env::temp_dir().join("ltk_cmd_analyze");
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        let input = dir.join("lake.csv");
        let start = NaiveDate::from_ymd_opt(2022, 1, 1).unwrap();
        let mut csv_data = String::from("Date,LakeLevel,Temperature\n");
        for i in 0..200 {
            let d = start + Duration::days(i);
            csv_data.push_str(&format!(
                "{},{},{}\n",
                d.format("%Y-%m-%d"),
                50.0 - 0.01 * i as f64,
                5.0 + (i % 40) as f64 * 0.5
            ));
        }
        std::fs::write(&input, csv_data).unwrap();
        let output_dir = dir.join("output");

        run_analyze(input.to_str().unwrap(), &[], None, &output_dir, &settings()).unwrap();

        let report = std::fs::read_to_string(output_dir.join(REPORT_FILE)).unwrap();
        assert!(report.starts_with("Forecast based on recent trend"));
        assert!(report.contains("Warning: Lake is projected to dry out"));
        let json = std::fs::read_to_string(output_dir.join(FORECAST_JSON_FILE)).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["variable"], "lakelevel");
        assert_eq!(value["horizons"].as_array().unwrap().len(), 4);

        for file in [
            output_dir.join(TREND_DIR).join("lakelevel.svg"),
            output_dir.join(TREND_DIR).join("temperature.svg"),
            output_dir.join(CORRELATION_DIR).join("temperature.svg"),
            output_dir.join(CORRELATION_DIR).join(SEASONAL_FILE),
            output_dir.join(RESAMPLED_DIR).join("temperature.csv"),
        ] {
            assert!(file.exists(), "missing {}", file.display());
        }
        assert!(!output_dir.join(CORRELATION_DIR).join("lakelevel.svg").exists());
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_unknown_variable_fails_with_suggestion() {
        let dir = std::env::temp_dir().join("ltk_cmd_analyze_unknown");
        std::fs::create_dir_all(&dir).unwrap();
        let input = dir.join("lake.csv");
        std::fs::write(&input, "date,lakelevel\n2022-01-01,1\n2022-01-02,2\n").unwrap();
        let err = run_analyze(
            input.to_str().unwrap(),
            &[String::from("lakelevl")],
            None,
            &dir.join("output"),
            &settings(),
        )
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            "No variable 'lakelevl' found in data. Did you mean 'lakelevel'?"
        );
        let _ = std::fs::remove_dir_all(&dir);
    }
}
