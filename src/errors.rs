//! Centralized error handling for the gap-filling toolkit
//!
//! This module provides structured error types for settings, table I/O,
//! gap-filling runs and chart rendering.

use std::fmt;

/// Main error type for gap-filling operations
#[derive(Debug)]
pub enum MgfError {
    /// I/O operation errors
    IoError(std::io::Error),

    /// CSV parsing or writing errors
    CsvError(csv::Error),

    /// Chart rendering errors
    PlotError(String),

    /// Array shape or dimension error
    ArrayError(ndarray::ShapeError),

    /// Thread pool configuration error
    ThreadPoolError(String),

    /// Required key missing in the settings file
    MissingSetting { key: String },

    /// Settings value that cannot be interpreted
    InvalidSetting { key: String, value: String },

    /// Column not found in a flux table
    ColumnNotFound { column: String },

    /// Column inserted twice into a flux table
    DuplicateColumn { column: String },

    /// Timestamp that cannot be parsed
    TimestampError { value: String },

    /// Two tables whose timestamp indices differ
    IndexMismatch { message: String },

    /// At least one of the series checks of a run failed
    ValidationFailed { failed: Vec<String> },

    /// Generic error for everything else
    Generic(String),
}

impl fmt::Display for MgfError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MgfError::IoError(e) => write!(f, "I/O error: {}", e),
            MgfError::CsvError(e) => write!(f, "CSV error: {}", e),
            MgfError::PlotError(msg) => write!(f, "Plot error: {}", msg),
            MgfError::ArrayError(e) => write!(f, "Array error: {}", e),
            MgfError::ThreadPoolError(msg) => write!(f, "Thread pool error: {}", msg),
            MgfError::MissingSetting { key } => {
                write!(f, "Setting '{}' not found in ini file", key)
            }
            MgfError::InvalidSetting { key, value } => {
                write!(f, "Invalid value '{}' for setting '{}'", value, key)
            }
            MgfError::ColumnNotFound { column } => write!(f, "Column '{}' not found in table", column),
            MgfError::DuplicateColumn { column } => {
                write!(f, "Column '{}' already exists in table", column)
            }
            MgfError::TimestampError { value } => write!(f, "Cannot parse timestamp '{}'", value),
            MgfError::IndexMismatch { message } => write!(f, "Timestamp index mismatch: {}", message),
            MgfError::ValidationFailed { failed } => write!(
                f,
                "At least one of the file checks failed: {}",
                failed.join(", ")
            ),
            MgfError::Generic(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for MgfError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            MgfError::IoError(e) => Some(e),
            MgfError::CsvError(e) => Some(e),
            MgfError::ArrayError(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for MgfError {
    fn from(error: std::io::Error) -> Self {
        MgfError::IoError(error)
    }
}

impl From<csv::Error> for MgfError {
    fn from(error: csv::Error) -> Self {
        MgfError::CsvError(error)
    }
}

impl From<ndarray::ShapeError> for MgfError {
    fn from(error: ndarray::ShapeError) -> Self {
        MgfError::ArrayError(error)
    }
}

impl From<String> for MgfError {
    fn from(error: String) -> Self {
        MgfError::Generic(error)
    }
}

impl From<&str> for MgfError {
    fn from(error: &str) -> Self {
        MgfError::Generic(error.to_string())
    }
}

/// Result type alias for gap-filling operations
pub type Result<T> = std::result::Result<T, MgfError>;
