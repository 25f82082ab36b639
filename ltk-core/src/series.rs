//! Column-oriented, date-indexed table of optional measurements.

use crate::{
    column::{closest_match, normalize_name},
    error::{AnalysisError, Result},
    interpolation::fill_interior_gaps,
};
use chrono::{Datelike, NaiveDate};
use ltk_utils::dates::to_ordinal;
use std::collections::BTreeMap;

/// Name of the date column in every table the toolkit reads or writes.
pub const DATE_COLUMN: &str = "date";

/// A named column of optional values, one per date of its series.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub values: Vec<Option<f64>>,
}

/// An ordered sequence of dates, each with a value (or an explicit absence)
/// for every variable column.
///
/// Dates are strictly increasing and unique. Values are always finite: NaN
/// and infinities are stored as `None`. Column names are lower case.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TimeSeries {
    dates: Vec<NaiveDate>,
    columns: Vec<Column>,
}

fn finite(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite())
}

impl TimeSeries {
    /// Build a series, validating date order and column lengths.
    pub fn new(dates: Vec<NaiveDate>, columns: Vec<(String, Vec<Option<f64>>)>) -> Result<Self> {
        for pair in dates.windows(2) {
            if pair[0] >= pair[1] {
                return Err(AnalysisError::UnsortedDates {
                    previous: pair[0],
                    next: pair[1],
                });
            }
        }
        let mut normalized: Vec<Column> = Vec::with_capacity(columns.len());
        for (name, values) in columns {
            let name = normalize_name(&name);
            if name.is_empty() || name == DATE_COLUMN {
                return Err(AnalysisError::InvalidFormat(format!(
                    "invalid variable column name '{name}'"
                )));
            }
            if values.len() != dates.len() {
                return Err(AnalysisError::InvalidFormat(format!(
                    "column '{}' has {} values for {} dates",
                    name,
                    values.len(),
                    dates.len()
                )));
            }
            if normalized.iter().any(|c| c.name == name) {
                return Err(AnalysisError::InvalidFormat(format!(
                    "duplicate column '{name}'"
                )));
            }
            normalized.push(Column {
                name,
                values: values.into_iter().map(finite).collect(),
            });
        }
        Ok(TimeSeries {
            dates,
            columns: normalized,
        })
    }

    /// Build a single-variable series from sorted `(date, value)` pairs.
    pub fn from_observations(name: &str, observations: &[(NaiveDate, f64)]) -> Result<Self> {
        let dates = observations.iter().map(|(d, _)| *d).collect();
        let values = observations.iter().map(|(_, v)| Some(*v)).collect();
        TimeSeries::new(dates, vec![(name.to_string(), values)])
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.dates.first().copied()
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.dates.last().copied()
    }

    /// Variable column names in table order.
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    pub fn has_column(&self, name: &str) -> bool {
        let name = normalize_name(name);
        self.columns.iter().any(|c| c.name == name)
    }

    /// Error for an unknown variable, carrying the closest known column name.
    pub fn missing_column(&self, name: &str) -> AnalysisError {
        AnalysisError::MissingColumn {
            name: name.to_string(),
            suggestion: closest_match(name, self.column_names()),
        }
    }

    /// Values of a variable, aligned with [`TimeSeries::dates`].
    pub fn column(&self, name: &str) -> Result<&[Option<f64>]> {
        let normalized = normalize_name(name);
        self.columns
            .iter()
            .find(|c| c.name == normalized)
            .map(|c| c.values.as_slice())
            .ok_or_else(|| self.missing_column(name))
    }

    /// `(date, value)` pairs of a variable with absent values skipped.
    pub fn observations(&self, name: &str) -> Result<Vec<(NaiveDate, f64)>> {
        let values = self.column(name)?;
        Ok(self
            .dates
            .iter()
            .zip(values)
            .filter_map(|(d, v)| v.map(|v| (*d, v)))
            .collect())
    }

    /// Most recent date on which the variable has a value.
    pub fn last_present_date(&self, name: &str) -> Result<Option<NaiveDate>> {
        Ok(self.observations(name)?.last().map(|(d, _)| *d))
    }

    /// A new series with `name` added, or replaced if it already exists.
    pub fn with_column(&self, name: &str, values: Vec<Option<f64>>) -> Result<Self> {
        let name = normalize_name(name);
        let mut columns: Vec<(String, Vec<Option<f64>>)> = self
            .columns
            .iter()
            .map(|c| (c.name.clone(), c.values.clone()))
            .collect();
        match columns.iter_mut().find(|(n, _)| *n == name) {
            Some(existing) => existing.1 = values,
            None => columns.push((name, values)),
        }
        TimeSeries::new(self.dates.clone(), columns)
    }

    /// A new series with `f` applied to every present value of `name`.
    pub fn map_column<F>(&self, name: &str, f: F) -> Result<Self>
    where
        F: Fn(f64) -> f64,
    {
        let values = self.column(name)?.iter().map(|v| v.map(&f)).collect();
        self.with_column(name, values)
    }

    /// A new series without rows whose calendar year is listed.
    pub fn without_years(&self, years: &[i32]) -> Self {
        if years.is_empty() {
            return self.clone();
        }
        let keep: Vec<bool> = self
            .dates
            .iter()
            .map(|d| !years.contains(&d.year()))
            .collect();
        self.filter_rows(&keep)
    }

    fn filter_rows(&self, keep: &[bool]) -> Self {
        let dates = self
            .dates
            .iter()
            .zip(keep)
            .filter_map(|(d, k)| k.then_some(*d))
            .collect();
        let columns = self
            .columns
            .iter()
            .map(|c| Column {
                name: c.name.clone(),
                values: c
                    .values
                    .iter()
                    .zip(keep)
                    .filter_map(|(v, k)| k.then_some(*v))
                    .collect(),
            })
            .collect();
        TimeSeries { dates, columns }
    }

    /// A new series with interior gaps of every column filled by linear
    /// interpolation against the calendar date.
    pub fn interpolate_gaps(&self) -> Self {
        let xs: Vec<f64> = self.dates.iter().map(to_ordinal).collect();
        let columns = self
            .columns
            .iter()
            .map(|c| Column {
                name: c.name.clone(),
                values: fill_interior_gaps(&xs, &c.values),
            })
            .collect();
        TimeSeries {
            dates: self.dates.clone(),
            columns,
        }
    }

    /// Left join on date: keeps this series' dates and takes every column of
    /// `other`, replacing columns with the same name.
    pub fn left_join(&self, other: &TimeSeries) -> Self {
        let index: BTreeMap<NaiveDate, usize> = other
            .dates
            .iter()
            .enumerate()
            .map(|(i, d)| (*d, i))
            .collect();
        let mut columns: Vec<Column> = self
            .columns
            .iter()
            .filter(|c| !other.columns.iter().any(|o| o.name == c.name))
            .cloned()
            .collect();
        for other_column in &other.columns {
            let values = self
                .dates
                .iter()
                .map(|d| index.get(d).and_then(|&i| other_column.values[i]))
                .collect();
            columns.push(Column {
                name: other_column.name.clone(),
                values,
            });
        }
        TimeSeries {
            dates: self.dates.clone(),
            columns,
        }
    }

    /// Outer join on date where present values of `other` override this
    /// series' values. New columns are appended in `other`'s order.
    pub fn upsert(&self, other: &TimeSeries) -> Self {
        let mut rows: BTreeMap<NaiveDate, BTreeMap<String, f64>> = BTreeMap::new();
        let mut names: Vec<String> = self.column_names().map(String::from).collect();
        for name in other.column_names() {
            if !names.iter().any(|n| n == name) {
                names.push(name.to_string());
            }
        }
        for source in [self, other] {
            for (i, date) in source.dates.iter().enumerate() {
                let row = rows.entry(*date).or_default();
                for column in &source.columns {
                    if let Some(v) = column.values[i] {
                        row.insert(column.name.clone(), v);
                    }
                }
            }
        }
        let dates: Vec<NaiveDate> = rows.keys().copied().collect();
        let columns = names
            .into_iter()
            .map(|name| {
                let values = rows.values().map(|row| row.get(&name).copied()).collect();
                Column { name, values }
            })
            .collect();
        TimeSeries { dates, columns }
    }
}
