//! Incremental weather enrichment - only fetch days newer than the last
//! temperature already in the CSV.
//!
//! Requests go to the archive one calendar year at a time so a failed year
//! only loses that year.

use crate::raw_options;
use anyhow::Context;
use chrono::{Datelike, Duration, Local, NaiveDate};
use log::{info, warn};
use ltk_core::{weather::WeatherStation, TimeSeries};
use std::path::Path;

/// Column whose last value marks how far the table is already enriched.
pub const RESUME_COLUMN: &str = "temperature";

/// Pause between yearly requests.
pub const REQUEST_PAUSE_MILLIS: u64 = 500;

/// First day to fetch when none is given: the day after the last
/// temperature, else the first day of the table's first year.
pub fn resume_date(series: &TimeSeries) -> Option<NaiveDate> {
    match series.last_present_date(RESUME_COLUMN).ok().flatten() {
        Some(last) => Some(last + Duration::days(1)),
        None => series
            .first_date()
            .and_then(|d| NaiveDate::from_ymd_opt(d.year(), 1, 1)),
    }
}

/// Split `start..=end` into calendar-year pieces.
pub fn year_chunks(start: NaiveDate, end: NaiveDate) -> Vec<(NaiveDate, NaiveDate)> {
    (start.year()..=end.year())
        .filter_map(|year| {
            let first = NaiveDate::from_ymd_opt(year, 1, 1)?.max(start);
            let last = NaiveDate::from_ymd_opt(year, 12, 31)?.min(end);
            (first <= last).then_some((first, last))
        })
        .collect()
}

/// Fetch daily weather for the missing days of `input` and write the merged
/// table to `output`.
pub async fn run_weather(
    input: &str,
    output: &str,
    station: &WeatherStation,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
) -> anyhow::Result<()> {
    let existing = if Path::new(input).exists() {
        TimeSeries::from_csv_path(input, &raw_options())
            .with_context(|| format!("Failed to load {input}"))?
    } else {
        TimeSeries::default()
    };
    let end_date = end.unwrap_or_else(|| Local::now().naive_local().date());
    let start_date = match start.or_else(|| resume_date(&existing)) {
        Some(date) => date,
        None => anyhow::bail!("{input} has no dates; pass --start to choose the first day"),
    };

    if start_date > end_date {
        info!("{} is up to date through {}", input, end_date);
        return Ok(());
    }

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(60))
        .build()?;

    let chunks = year_chunks(start_date, end_date);
    info!(
        "Fetching weather for ({}, {}) from {} to {} in {} requests",
        station.latitude,
        station.longitude,
        start_date,
        end_date,
        chunks.len()
    );

    let mut merged = existing;
    let mut fetched_days = 0usize;
    for (i, (first, last)) in chunks.iter().enumerate() {
        match station.get_daily_weather(&client, first, last).await {
            Some(daily) => {
                info!("  {} days from {} to {}", daily.len(), first, last);
                fetched_days += daily.len();
                merged = merged.upsert(&daily);
            }
            None => warn!("No weather for {} to {}, continuing", first, last),
        }
        if i + 1 < chunks.len() {
            tokio::time::sleep(std::time::Duration::from_millis(REQUEST_PAUSE_MILLIS)).await;
        }
    }

    merged
        .write_csv(output)
        .with_context(|| format!("Failed to write {output}"))?;
    info!(
        "Weather update complete. {} days fetched, {} rows written to {}",
        fetched_days,
        merged.len(),
        output
    );
    Ok(())
}
