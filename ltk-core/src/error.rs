/// Error types for the lake trend toolkit
use chrono::NaiveDate;
use thiserror::Error;

/// Main error type for ingestion and analysis
#[derive(Error, Debug)]
pub enum AnalysisError {
    /// A fit was attempted on an empty or degenerate sample
    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    /// A requested variable is not a column of the table
    #[error("No variable '{name}' found in data.{}", suggestion_text(.suggestion))]
    MissingColumn {
        name: String,
        suggestion: Option<String>,
    },

    /// The span of the series is negative
    #[error("Cannot select a time scale for reversed span {start} to {end}")]
    InvalidScaleSelection { start: NaiveDate, end: NaiveDate },

    /// Failed to read or parse CSV data
    #[error("Failed to parse CSV: {0}")]
    Csv(#[from] csv::Error),

    /// Failed to read or write a file
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Date parsing failed
    #[error("Failed to parse date: {0}")]
    DateParse(String),

    /// Invalid data format
    #[error("Invalid data format: {0}")]
    InvalidFormat(String),

    /// Dates are not strictly increasing
    #[error("Dates must be strictly increasing: {previous} is followed by {next}")]
    UnsortedDates { previous: NaiveDate, next: NaiveDate },
}

fn suggestion_text(suggestion: &Option<String>) -> String {
    match suggestion {
        Some(s) => format!(" Did you mean '{s}'?"),
        None => String::new(),
    }
}

impl From<ltk_utils::error::DateError> for AnalysisError {
    fn from(value: ltk_utils::error::DateError) -> Self {
        AnalysisError::DateParse(value.0)
    }
}

/// Type alias for Results using AnalysisError
pub type Result<T> = std::result::Result<T, AnalysisError>;

#[cfg(test)]
mod tests {
    use super::AnalysisError;

    #[test]
    fn test_missing_column_message_includes_suggestion() {
        let err = AnalysisError::MissingColumn {
            name: String::from("temprature"),
            suggestion: Some(String::from("temperature")),
        };
        assert_eq!(
            err.to_string(),
            "No variable 'temprature' found in data. Did you mean 'temperature'?"
        );
    }

    #[test]
    fn test_missing_column_message_without_suggestion() {
        let err = AnalysisError::MissingColumn {
            name: String::from("ozone"),
            suggestion: None,
        };
        assert_eq!(err.to_string(), "No variable 'ozone' found in data.");
    }
}
