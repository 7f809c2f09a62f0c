use std::num::ParseIntError;

use chrono::NaiveDate;
use indicatif::style::TemplateError;
use thiserror::Error;

pub type AcfoResult<T> = Result<T, AcfoError>;

#[derive(Debug, Error)]
pub enum AcfoError {
    #[error(transparent)]
    Data(#[from] DataError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Io(#[from] IoError),
}

/// Errors related to data loading, parsing, domain types and data integrity.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("Ambiguous settlement join for contract '{contract}' on {date}: more than one row")]
    AmbiguousJoin { contract: String, date: NaiveDate },

    #[error("Invalid symbol string: '{0}'")]
    InvalidSymbol(String),

    #[error("Missing column '{column}' in table '{table}'")]
    MissingColumn { table: String, column: String },

    #[error("Missing value in column '{column}' at row {row}")]
    MissingValue { column: String, row: usize },

    #[error("Data frame error: {0}")]
    DataFrame(String),

    #[error("Failed timestamp conversion: {0}")]
    TimestampConversion(String),

    #[error("Failed to parse integer: {0}")]
    ParseInt(#[from] ParseIntError),

    #[error("Failed to parse enum: {0}")]
    ParseEnum(#[from] strum::ParseError),
}

/// Errors raised while validating pipeline configuration, before any data is processed.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Unsupported {kind} '{value}' (expected one of: {expected})")]
    Unsupported {
        kind: &'static str,
        value: String,
        expected: String,
    },

    #[error("Invalid open window width: {0} minutes")]
    InvalidWindowWidth(i64),

    #[error("Invalid DTE filter range [{low}, {high}]")]
    InvalidDteRange { low: i64, high: i64 },

    #[error("Invalid trajectory minute {minute} for window of {width} minutes")]
    InvalidTrajectoryMinute { minute: usize, width: usize },

    #[error("Invalid pipeline configuration: {0}")]
    Invalid(String),

    #[error("Progress bar error")]
    ProgressBar(#[from] TemplateError),
}

/// Errors related to file I/O and serialization.
#[derive(Debug, Error)]
pub enum IoError {
    #[error("IO operation failed")]
    Io(#[from] std::io::Error),

    #[error("Serialization failed")]
    Json(#[from] serde_json::Error),

    #[error("File system error: {0}")]
    FileSystem(String),

    #[error("Invalid file name: {0}")]
    InvalidFileName(String),

    #[error("Failed to read table '{path}': {msg}")]
    ReaderCreation { path: String, msg: String },
}
