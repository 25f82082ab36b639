//! Shared utility functions for LTK crates.

/// Date utility functions
pub mod dates {
    use crate::error::DateError;
    use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime};

    /// ISO calendar date format used for every file the toolkit writes.
    pub const ISO_FORMAT: &str = "%Y-%m-%d";

    /// Average number of days in a year, accounting for leap years.
    pub const DAYS_PER_YEAR: f64 = 365.25;

    /// Calendar date formats accepted on input, tried in order.
    const DATE_FORMATS: [&str; 5] = ["%Y-%m-%d", "%d.%m.%Y", "%Y/%m/%d", "%m/%d/%Y", "%Y%m%d"];

    /// Date-time formats accepted on input; only the date part is kept.
    const DATE_TIME_FORMATS: [&str; 4] = [
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M",
        "%Y-%m-%dT%H:%M",
    ];

    /// Origin of the ordinal-date axis used for regression (1970-01-01).
    pub fn epoch() -> NaiveDate {
        NaiveDate::from_ymd_opt(1970, 1, 1).unwrap_or_default()
    }

    /// Format a NaiveDate as "YYYY-MM-DD"
    pub fn format_date(date: &NaiveDate) -> String {
        date.format(ISO_FORMAT).to_string()
    }

    /// Parse a date string in any of the common textual formats.
    ///
    /// Day-first dotted dates (`31.12.2020`) are the format used by German
    /// gauge exports; slash dates are read year-first, then month-first.
    pub fn parse_date(s: &str) -> Result<NaiveDate, DateError> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(DateError(String::from("empty date")));
        }
        for format in DATE_FORMATS {
            if let Ok(date) = NaiveDate::parse_from_str(trimmed, format) {
                return Ok(date);
            }
        }
        for format in DATE_TIME_FORMATS {
            if let Ok(date_time) = NaiveDateTime::parse_from_str(trimmed, format) {
                return Ok(date_time.date());
            }
        }
        Err(DateError(format!("unrecognized date '{trimmed}'")))
    }

    /// Days since 1970-01-01 as a float, the x-axis of every date regression.
    pub fn to_ordinal(date: &NaiveDate) -> f64 {
        (*date - epoch()).num_days() as f64
    }

    /// Calendar day containing the ordinal value `x` (fractional days are floored).
    pub fn from_ordinal(x: f64) -> Option<NaiveDate> {
        if !x.is_finite() {
            return None;
        }
        let days = x.floor();
        if days.abs() > i32::MAX as f64 {
            return None;
        }
        epoch().checked_add_signed(Duration::try_days(days as i64)?)
    }

    /// Length of the span between two dates in average years.
    pub fn span_in_years(start: &NaiveDate, end: &NaiveDate) -> f64 {
        (*end - *start).num_days() as f64 / DAYS_PER_YEAR
    }

    /// First day of the month containing `date`.
    pub fn month_start(date: &NaiveDate) -> NaiveDate {
        date.with_day(1).unwrap_or(*date)
    }

    /// First day of the calendar year containing `date`.
    pub fn year_start(date: &NaiveDate) -> NaiveDate {
        NaiveDate::from_ymd_opt(date.year(), 1, 1).unwrap_or(*date)
    }

    /// First day of the month following the month containing `date`.
    pub fn next_month_start(date: &NaiveDate) -> Option<NaiveDate> {
        let (year, month) = match date.month() {
            12 => (date.year() + 1, 1),
            m => (date.year(), m + 1),
        };
        NaiveDate::from_ymd_opt(year, month, 1)
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use chrono::NaiveDate;

        #[test]
        fn test_format_and_parse() {
            let date = NaiveDate::from_ymd_opt(2023, 6, 15).unwrap();
            let formatted = format_date(&date);
            assert_eq!(formatted, "2023-06-15");
            let parsed = parse_date(&formatted).unwrap();
            assert_eq!(parsed, date);
        }

        #[test]
        fn test_parse_common_formats() {
            let expected = NaiveDate::from_ymd_opt(2021, 3, 4).unwrap();
            for s in [
                "2021-03-04",
                "04.03.2021",
                "2021/03/04",
                "03/04/2021",
                "20210304",
                "2021-03-04 12:30:00",
                "2021-03-04T00:00",
                "  2021-03-04  ",
            ] {
                assert_eq!(parse_date(s).unwrap(), expected, "format {s}");
            }
            assert!(parse_date("").is_err());
            assert!(parse_date("yesterday").is_err());
        }

        #[test]
        fn test_ordinal_conversion() {
            assert_eq!(to_ordinal(&epoch()), 0.0);
            let date = NaiveDate::from_ymd_opt(1983, 9, 10).unwrap();
            let x = to_ordinal(&date);
            assert_eq!(x, 5000.0);
            assert_eq!(from_ordinal(x), Some(date));
            // fractional days stay on the same calendar day
            assert_eq!(from_ordinal(x + 0.75), Some(date));
            assert_eq!(from_ordinal(f64::NAN), None);
        }

        #[test]
        fn test_period_starts() {
            let date = NaiveDate::from_ymd_opt(2022, 12, 17).unwrap();
            assert_eq!(month_start(&date), NaiveDate::from_ymd_opt(2022, 12, 1).unwrap());
            assert_eq!(year_start(&date), NaiveDate::from_ymd_opt(2022, 1, 1).unwrap());
            assert_eq!(
                next_month_start(&date),
                NaiveDate::from_ymd_opt(2023, 1, 1)
            );
        }

        #[test]
        fn test_span_in_years() {
            let start = NaiveDate::from_ymd_opt(2000, 1, 1).unwrap();
            let end = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
            assert!((span_in_years(&start, &end) - 24.0).abs() < 1e-9);
        }
    }
}

/// Error types
pub mod error {
    use std::fmt;

    #[derive(Debug, Clone, PartialEq)]
    pub struct DateError(pub String);

    impl fmt::Display for DateError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "Date error: {}", self.0)
        }
    }

    impl std::error::Error for DateError {}
}
