//! CSV ingestion and writing for measurement tables.
//!
//! # CSV Format
//!
//! A header row with a `date` column (any letter case) and any number of
//! numeric variable columns:
//!
//! ```text
//! Date,LakeLevel,Temperature
//! 2024-01-01,50.2,15.1
//! 02.01.2024,"1,050.4",
//! ```
//!
//! Cells are trimmed, thousands separators are removed, and empty or
//! non-numeric cells become absent values.

use crate::{
    column::normalize_name,
    error::{AnalysisError, Result},
    series::{TimeSeries, DATE_COLUMN},
};
use chrono::NaiveDate;
use csv::{ReaderBuilder, Trim, WriterBuilder};
use log::{debug, info, warn};
use ltk_utils::dates::{format_date, parse_date};
use std::collections::BTreeMap;
use std::path::Path;

/// Options controlling how a raw table is cleaned into a [`TimeSeries`].
#[derive(Debug, Clone, PartialEq)]
pub struct IngestOptions {
    /// Fill interior gaps by linear interpolation against the date.
    pub interpolate: bool,
    /// Calendar years whose rows are dropped after cleaning.
    pub excluded_years: Vec<i32>,
}

impl Default for IngestOptions {
    fn default() -> Self {
        IngestOptions {
            interpolate: true,
            excluded_years: Vec::new(),
        }
    }
}

/// Parse a numeric cell, `None` for empty or non-numeric content.
pub fn parse_value(cell: &str) -> Option<f64> {
    let cleaned: String = cell.trim().chars().filter(|c| *c != ',').collect();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

impl TimeSeries {
    /// Load a measurement table from a CSV string.
    pub fn from_csv_str(csv_data: &str, options: &IngestOptions) -> Result<Self> {
        let mut rdr = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(Trim::All)
            .from_reader(csv_data.as_bytes());

        let headers: Vec<String> = rdr.headers()?.iter().map(normalize_name).collect();
        let date_index = headers
            .iter()
            .position(|h| h == DATE_COLUMN)
            .ok_or_else(|| {
                AnalysisError::InvalidFormat(format!(
                    "missing '{DATE_COLUMN}' column in headers {headers:?}"
                ))
            })?;
        let variable_indices: Vec<usize> = (0..headers.len())
            .filter(|&i| i != date_index && !headers[i].is_empty())
            .collect();

        // duplicate dates keep the first present value of each column
        let mut rows: BTreeMap<NaiveDate, Vec<Option<f64>>> = BTreeMap::new();
        let mut skipped = 0u32;
        let mut duplicates = 0u32;
        for result in rdr.records() {
            let r = result?;
            let date = match parse_date(r.get(date_index).unwrap_or("")) {
                Ok(d) => d,
                Err(e) => {
                    debug!("ingest: skipping row: {}", e);
                    skipped += 1;
                    continue;
                }
            };
            let values: Vec<Option<f64>> = variable_indices
                .iter()
                .map(|&i| r.get(i).and_then(parse_value))
                .collect();
            match rows.get_mut(&date) {
                Some(existing) => {
                    duplicates += 1;
                    for (slot, value) in existing.iter_mut().zip(values) {
                        if slot.is_none() {
                            *slot = value;
                        }
                    }
                }
                None => {
                    rows.insert(date, values);
                }
            }
        }
        if skipped > 0 {
            warn!("ingest: skipped {} rows with unparseable dates", skipped);
        }
        if duplicates > 0 {
            warn!("ingest: merged {} rows with duplicate dates", duplicates);
        }

        let dates: Vec<NaiveDate> = rows.keys().copied().collect();
        let columns = variable_indices
            .iter()
            .enumerate()
            .map(|(position, &i)| {
                let values = rows.values().map(|row| row[position]).collect();
                (headers[i].clone(), values)
            })
            .collect();
        let mut series = TimeSeries::new(dates, columns)?;
        if options.interpolate {
            series = series.interpolate_gaps();
        }
        let series = series.without_years(&options.excluded_years);
        info!(
            "ingest: loaded {} rows with {} variables",
            series.len(),
            variable_indices.len()
        );
        Ok(series)
    }

    /// Load a measurement table from a CSV file.
    pub fn from_csv_path<P: AsRef<Path>>(path: P, options: &IngestOptions) -> Result<Self> {
        let csv_data = std::fs::read_to_string(path)?;
        TimeSeries::from_csv_str(&csv_data, options)
    }

    /// Render the series as CSV with ISO dates and empty cells for absent values.
    pub fn to_csv_string(&self) -> Result<String> {
        let mut wtr = WriterBuilder::new().from_writer(Vec::new());
        let mut header = vec![DATE_COLUMN.to_string()];
        header.extend(self.column_names().map(String::from));
        wtr.write_record(&header)?;

        let columns: Vec<&[Option<f64>]> = self
            .column_names()
            .map(|name| self.column(name))
            .collect::<Result<_>>()?;
        for (i, date) in self.dates().iter().enumerate() {
            let mut record = vec![format_date(date)];
            record.extend(
                columns
                    .iter()
                    .map(|values| values[i].map_or(String::new(), |v| v.to_string())),
            );
            wtr.write_record(&record)?;
        }
        let bytes = wtr
            .into_inner()
            .map_err(|e| AnalysisError::InvalidFormat(e.to_string()))?;
        String::from_utf8(bytes).map_err(|e| AnalysisError::InvalidFormat(e.to_string()))
    }

    /// Write the series as CSV to `path`.
    pub fn write_csv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        std::fs::write(path, self.to_csv_string()?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_CSV: &str = r#"Date,LakeLevel,Temperature
2024-01-01,50.2,15.1
2024-01-02,50.4,15.3
2024-01-03,50.1,14.9
"#;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_csv_parsing() {
        let series = TimeSeries::from_csv_str(SAMPLE_CSV, &IngestOptions::default()).unwrap();
        assert_eq!(
            series.column_names().collect::<Vec<_>>(),
            vec!["lakelevel", "temperature"]
        );
        assert_eq!(series.len(), 3);
        assert_eq!(series.column("lakelevel").unwrap()[0], Some(50.2));
        assert_eq!(series.column("temperature").unwrap()[2], Some(14.9));
    }

    #[test]
    fn test_cleaning_rules() {
        let csv_data = "date, Level ,note\n\
            2024-01-03,\"1,002.5\",x\n\
            not a date,1,2\n\
            01.01.2024,1000.5,\n\
            2024-01-01,,\n\
            2024-01-02,,\n";
        let options = IngestOptions {
            interpolate: false,
            excluded_years: Vec::new(),
        };
        let series = TimeSeries::from_csv_str(csv_data, &options).unwrap();
        assert_eq!(series.dates(), &[date(2024, 1, 1), date(2024, 1, 2), date(2024, 1, 3)]);
        // duplicate 2024-01-01 keeps the first present value
        assert_eq!(
            series.column("level").unwrap(),
            &[Some(1000.5), None, Some(1002.5)]
        );
        assert_eq!(series.column("note").unwrap(), &[None, None, None]);
    }

    #[test]
    fn test_interpolation_and_year_exclusion() {
        let csv_data = "date,level\n\
            1970-06-01,1\n\
            2020-01-01,10\n\
            2020-01-03,\n\
            2020-01-05,20\n";
        let options = IngestOptions {
            interpolate: true,
            excluded_years: vec![1970],
        };
        let series = TimeSeries::from_csv_str(csv_data, &options).unwrap();
        assert_eq!(series.len(), 3);
        assert_eq!(
            series.column("level").unwrap(),
            &[Some(10.0), Some(15.0), Some(20.0)]
        );
    }

    #[test]
    fn test_missing_date_column() {
        let result = TimeSeries::from_csv_str("day,level\n1,2\n", &IngestOptions::default());
        assert!(matches!(result, Err(AnalysisError::InvalidFormat(_))));
    }

    #[test]
    fn test_parse_value() {
        assert_eq!(parse_value(" 12.5 "), Some(12.5));
        assert_eq!(parse_value("1,234"), Some(1234.0));
        assert_eq!(parse_value(""), None);
        assert_eq!(parse_value("---"), None);
        assert_eq!(parse_value("NaN"), None);
    }

    #[test]
    fn test_write_csv() {
        let series = TimeSeries::new(
            vec![date(2024, 1, 1), date(2024, 1, 2)],
            vec![(String::from("level"), vec![Some(4.9), None])],
        )
        .unwrap();
        let csv_string = series.to_csv_string().unwrap();
        assert_eq!(csv_string, "date,level\n2024-01-01,4.9\n2024-01-02,\n");

        let path = std::env::temp_dir().join("ltk_core_write_csv_test.csv");
        series.write_csv(&path).unwrap();
        let reread = TimeSeries::from_csv_path(&path, &IngestOptions::default()).unwrap();
        assert_eq!(reread, series);
        let _ = std::fs::remove_file(&path);
    }
}
