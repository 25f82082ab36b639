//! Command implementations for the lake trend CLI.
//!
//! Provides subcommands for the full analysis run, a forecast-only report,
//! datum normalization of level readings, and incremental weather enrichment.

use anyhow::Context;
use chrono::NaiveDate;
use clap::Subcommand;
use ltk_analysis::AnalysisConfig;
use ltk_core::{ingest::IngestOptions, variable::LAKE_LEVEL, weather::WeatherStation, TimeSeries};
use std::path::PathBuf;

pub mod analyze;
pub mod forecast;
pub mod normalize;
pub mod weather;

#[derive(Subcommand)]
pub enum Command {
    /// Run the full analysis: forecast report, resampled series and charts
    Analyze {
        /// Input CSV with a date column and measurement columns
        input: String,

        /// Variables to analyze (default: every column)
        #[arg(long, num_args = 1..)]
        variables: Vec<String>,

        /// Separate lake level CSV joined onto the input by date
        #[arg(long)]
        lakelevel_csv: Option<String>,

        /// Directory receiving the report, charts and resampled series
        #[arg(short = 'o', long, default_value = "output")]
        output_dir: PathBuf,

        #[command(flatten)]
        settings: AnalysisSettings,
    },

    /// Print the lake level forecast report only
    Forecast {
        /// Input CSV with a date column and the target column
        input: String,

        /// Write the report to this file instead of stdout
        #[arg(short = 'o', long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        settings: AnalysisSettings,
    },

    /// Shift lake level readings to the deepest point and rewrite dates as ISO
    Normalize {
        /// CSV with raw level readings
        input: String,

        /// Output CSV
        output: String,

        /// Column holding the level readings
        #[arg(long, default_value = LAKE_LEVEL)]
        column: String,

        /// Elevation of the deepest point of the lake, in meters
        #[arg(long, default_value_t = normalize::DEEPEST_POINT)]
        deepest_point: f64,
    },

    /// Add daily weather from the Open-Meteo archive (only fetch dates after the last entry)
    Weather {
        /// CSV to enrich; created if missing
        input: String,

        /// Output path (default: update the input in place)
        #[arg(short = 'o', long)]
        output: Option<String>,

        #[arg(long)]
        latitude: Option<f64>,

        #[arg(long)]
        longitude: Option<f64>,

        /// First day to fetch, YYYY-MM-DD (default: day after the last temperature)
        #[arg(long)]
        start: Option<NaiveDate>,

        /// Last day to fetch, YYYY-MM-DD (default: today)
        #[arg(long)]
        end: Option<NaiveDate>,
    },
}

/// Options shared by the analysis commands.
#[derive(clap::Args, Debug, Clone)]
pub struct AnalysisSettings {
    /// Variable to forecast and correlate against
    #[arg(long, default_value = LAKE_LEVEL)]
    pub target: String,

    /// Unit printed after forecast values
    #[arg(long, default_value = "m")]
    pub unit: String,

    /// Reference elevation subtracted from the target before analysis
    #[arg(long)]
    pub datum_offset: Option<f64>,

    /// Drop every row of this calendar year (repeatable)
    #[arg(long = "exclude-year")]
    pub exclude_years: Vec<i32>,

    /// Keep gaps instead of interpolating them
    #[arg(long)]
    pub no_interpolate: bool,
}

impl AnalysisSettings {
    pub fn config(&self) -> AnalysisConfig {
        AnalysisConfig {
            target: self.target.clone(),
            unit: self.unit.clone(),
            datum_offset: self.datum_offset,
        }
    }

    pub fn ingest_options(&self) -> IngestOptions {
        IngestOptions {
            interpolate: !self.no_interpolate,
            excluded_years: self.exclude_years.clone(),
        }
    }
}

/// Options for reading a table exactly as stored.
pub fn raw_options() -> IngestOptions {
    IngestOptions {
        interpolate: false,
        excluded_years: Vec::new(),
    }
}

/// Load the measurement table, join an optional lake level table onto it,
/// then interpolate and drop excluded years.
pub fn load_table(
    input: &str,
    lakelevel_csv: Option<&str>,
    options: &IngestOptions,
) -> anyhow::Result<TimeSeries> {
    let mut series = TimeSeries::from_csv_path(input, &raw_options())
        .with_context(|| format!("Failed to load {input}"))?;
    if let Some(path) = lakelevel_csv {
        let levels = TimeSeries::from_csv_path(path, &raw_options())
            .with_context(|| format!("Failed to load {path}"))?;
        series = series.left_join(&levels);
    }
    if options.interpolate {
        series = series.interpolate_gaps();
    }
    Ok(series.without_years(&options.excluded_years))
}

pub async fn run(command: Command) -> anyhow::Result<()> {
    match command {
        Command::Analyze {
            input,
            variables,
            lakelevel_csv,
            output_dir,
            settings,
        } => analyze::run_analyze(
            &input,
            &variables,
            lakelevel_csv.as_deref(),
            &output_dir,
            &settings,
        ),
        Command::Forecast {
            input,
            output,
            settings,
        } => forecast::run_forecast(&input, output.as_deref(), &settings),
        Command::Normalize {
            input,
            output,
            column,
            deepest_point,
        } => normalize::run_normalize(&input, &output, &column, deepest_point),
        Command::Weather {
            input,
            output,
            latitude,
            longitude,
            start,
            end,
        } => {
            let defaults = WeatherStation::default();
            let station = WeatherStation {
                latitude: latitude.unwrap_or(defaults.latitude),
                longitude: longitude.unwrap_or(defaults.longitude),
                timezone: defaults.timezone,
            };
            let output = output.unwrap_or_else(|| input.clone());
            weather::run_weather(&input, &output, &station, start, end).await
        }
    }
}
