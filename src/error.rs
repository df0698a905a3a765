//! Error types for the dashboard pipeline.
//!
//! Fatal conditions (input missing, timestamps unreadable) surface as
//! [`DashboardError`]. A missing column is also an error value, but callers
//! treat it as degraded: a KPI or panel shows a placeholder and the rest of
//! the cycle continues.

use crate::types::Field;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DashboardError {
    /// Input file could not be opened
    #[error("Data file not found or unreadable: {path}")]
    DataUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// A field required by an aggregation was not in the input header
    #[error("Missing column: '{0}'")]
    MissingColumn(Field),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl DashboardError {
    /// Fatal errors halt the cycle; everything else degrades one panel.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, DashboardError::MissingColumn(_))
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("Missing required column: '{0}'")]
    MissingTimestampColumn(String),

    #[error("Invalid timestamp on line {line}: '{value}'")]
    InvalidTimestamp { line: u64, value: String },

    #[error("Invalid number in column '{column}' on line {line}: '{value}'")]
    InvalidNumber {
        line: u64,
        column: String,
        value: String,
    },
}

pub type DashboardResult<T> = Result<T, DashboardError>;
