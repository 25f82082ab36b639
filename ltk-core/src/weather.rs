//! Daily weather covariates from the Open-Meteo historical archive.
//!
//! The archive returns hourly readings; each calendar day is reduced to the
//! mean of its non-null hours and rounded to two decimals.
//!
//! URL pattern:
//! `https://archive-api.open-meteo.com/v1/archive?latitude={}&longitude={}&start_date={}&end_date={}&hourly=temperature_2m,relative_humidity_2m,precipitation,windspeed_10m&timezone={}`

use crate::{
    error::{AnalysisError, Result},
    series::TimeSeries,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[cfg(feature = "api")]
use log::{info, warn};
#[cfg(feature = "api")]
use ltk_utils::dates::ISO_FORMAT;
#[cfg(feature = "api")]
use reqwest::{Client, StatusCode};
#[cfg(feature = "api")]
use std::time::Duration;

/// Open-Meteo historical archive endpoint.
pub const ARCHIVE_URL: &str = "https://archive-api.open-meteo.com/v1/archive";

/// Hourly archive fields and the column each one becomes.
pub const HOURLY_FIELDS: [(&str, &str); 4] = [
    ("temperature_2m", "temperature"),
    ("relative_humidity_2m", "humidity"),
    ("precipitation", "precipitation"),
    ("windspeed_10m", "windspeed"),
];

/// Location the weather covariates are fetched for.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct WeatherStation {
    pub latitude: f64,
    pub longitude: f64,
    pub timezone: String,
}

impl Default for WeatherStation {
    fn default() -> Self {
        WeatherStation {
            latitude: 52.5786,
            longitude: 13.8872,
            timezone: String::from("Europe/Berlin"),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ArchiveResponse {
    hourly: HourlyBlock,
}

#[derive(Debug, Default, Deserialize)]
struct HourlyBlock {
    #[serde(default)]
    time: Vec<String>,
    #[serde(default)]
    temperature_2m: Vec<Option<f64>>,
    #[serde(default)]
    relative_humidity_2m: Vec<Option<f64>>,
    #[serde(default)]
    precipitation: Vec<Option<f64>>,
    #[serde(default)]
    windspeed_10m: Vec<Option<f64>>,
}

impl HourlyBlock {
    fn field(&self, name: &str) -> &[Option<f64>] {
        match name {
            "temperature_2m" => &self.temperature_2m,
            "relative_humidity_2m" => &self.relative_humidity_2m,
            "precipitation" => &self.precipitation,
            "windspeed_10m" => &self.windspeed_10m,
            _ => &[],
        }
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Reduce an archive JSON response to one row per calendar day.
pub fn daily_means_from_json(body: &str) -> Result<TimeSeries> {
    let response: ArchiveResponse = serde_json::from_str(body)
        .map_err(|e| AnalysisError::InvalidFormat(format!("weather response: {e}")))?;
    let hourly = response.hourly;

    // date -> per-field (sum, count)
    let mut days: BTreeMap<NaiveDate, [(f64, u32); 4]> = BTreeMap::new();
    for (i, stamp) in hourly.time.iter().enumerate() {
        let date = stamp
            .get(..10)
            .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
            .ok_or_else(|| AnalysisError::DateParse(stamp.clone()))?;
        let sums = days.entry(date).or_insert([(0.0, 0); 4]);
        for (slot, (field, _)) in sums.iter_mut().zip(HOURLY_FIELDS) {
            if let Some(Some(v)) = hourly.field(field).get(i) {
                slot.0 += v;
                slot.1 += 1;
            }
        }
    }

    let dates: Vec<NaiveDate> = days.keys().copied().collect();
    let columns = HOURLY_FIELDS
        .iter()
        .enumerate()
        .map(|(k, (_, column))| {
            let values = days
                .values()
                .map(|sums| {
                    let (sum, count) = sums[k];
                    (count > 0).then(|| round2(sum / count as f64))
                })
                .collect();
            (column.to_string(), values)
        })
        .collect();
    TimeSeries::new(dates, columns)
}

impl WeatherStation {
    /// Fetch daily weather means between two dates (inclusive), with retry
    /// and exponential backoff.
    #[cfg(feature = "api")]
    pub async fn get_daily_weather(
        &self,
        client: &Client,
        start_date: &NaiveDate,
        end_date: &NaiveDate,
    ) -> Option<TimeSeries> {
        let max_tries = 3;
        let mut sleep_millis: u64 = 1000;
        let hourly = HOURLY_FIELDS
            .iter()
            .map(|(field, _)| *field)
            .collect::<Vec<_>>()
            .join(",");
        let url = format!(
            "{}?latitude={}&longitude={}&start_date={}&end_date={}&hourly={}&timezone={}",
            ARCHIVE_URL,
            self.latitude,
            self.longitude,
            start_date.format(ISO_FORMAT),
            end_date.format(ISO_FORMAT),
            hourly,
            self.timezone
        );

        for attempt in 1..=max_tries {
            match client.get(&url).send().await {
                Ok(response) => {
                    if response.status() != StatusCode::OK {
                        warn!(
                            "Attempt {}/{}: Bad response status for {} to {}: {}",
                            attempt,
                            max_tries,
                            start_date,
                            end_date,
                            response.status()
                        );
                    } else {
                        match response.text().await {
                            Ok(body) => match daily_means_from_json(&body) {
                                Ok(series) => return Some(series),
                                Err(e) => warn!(
                                    "Attempt {}/{}: Unusable weather response: {}",
                                    attempt, max_tries, e
                                ),
                            },
                            Err(e) => warn!(
                                "Attempt {}/{}: Failed to read response body: {}",
                                attempt, max_tries, e
                            ),
                        }
                    }
                }
                Err(e) => {
                    warn!("Attempt {}/{}: Request failed: {}", attempt, max_tries, e);
                }
            }

            if attempt < max_tries {
                info!("Sleeping for {} milliseconds before retry", sleep_millis);
                tokio::time::sleep(Duration::from_millis(sleep_millis)).await;
                sleep_millis *= 2;
            }
        }

        warn!("All attempts failed for {} to {}", start_date, end_date);
        None
    }
}
