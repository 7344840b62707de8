//! Error types for the chart engine
//!
//! Layout, scaling and hit-testing never fail: degenerate inputs resolve to
//! safe defaults. Errors only surface from the builder and configuration APIs.

use thiserror::Error;

/// Errors that can occur when building a chart or loading options
#[derive(Error, Debug)]
pub enum ChartError {
    /// An axis with this name is already registered on the chart
    #[error("Duplicate axis name: {0}")]
    DuplicateAxis(String),

    /// A series id that does not belong to the chart
    #[error("Unknown series: {0}")]
    UnknownSeries(u32),

    /// Layout options failed validation
    #[error("Invalid layout options: {0}")]
    InvalidOptions(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for ChartError {
    fn from(err: serde_json::Error) -> Self {
        ChartError::Serialization(err.to_string())
    }
}

/// Result type for chart operations
pub type ChartResult<T> = Result<T, ChartError>;
