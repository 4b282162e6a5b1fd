//! Error types for health-trends
//!
//! Only faults live here. Expected data sparsity (too few days, a missing
//! component series, non-overlapping periods) is reported through
//! [`crate::derived::DerivationFailure`] and [`crate::pipeline::HaltReason`].

use thiserror::Error;

/// Errors that can occur while loading, analyzing or rendering
#[derive(Debug, Error)]
pub enum ComputeError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to read CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Missing required column: {0}")]
    MissingColumn(String),

    #[error("Unknown metric: {0}")]
    UnknownMetric(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Rendering error: {0}")]
    RenderError(String),
}
