//! Error type for the cleaning and analysis core.
//!
//! The core only fails on caller mistakes (unknown columns, misaligned
//! columns, unknown strategy names, invalid thresholds). Data problems such as unresolvable
//! indicator names or failed coercions are logged and handled in place.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("Column '{0}' not found")]
    ColumnNotFound(String),
    #[error("Column '{column}' has {actual} value(s) but the table has {expected} row(s)")]
    LengthMismatch {
        column: String,
        expected: usize,
        actual: usize,
    },
    #[error("Column '{0}' is not numeric")]
    NotNumeric(String),
    #[error(
        "Unknown imputation strategy '{0}' (expected drop, mean, median, interpolate, forward_fill)"
    )]
    UnknownStrategy(String),
    #[error("Unknown outlier method '{0}' (expected iqr or zscore)")]
    UnknownOutlierMethod(String),
    #[error("Unknown column type '{0}' (expected numeric, text or temporal)")]
    UnknownColumnType(String),
    #[error("Outlier threshold must be a non-negative number, got {0}")]
    InvalidThreshold(String),
}

pub type EngineResult<T> = std::result::Result<T, EngineError>;
