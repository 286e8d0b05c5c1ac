//! Error types for the anofox-periods library.

use std::fmt;
use thiserror::Error;

/// Result type alias for clustering pipeline operations.
pub type Result<T> = std::result::Result<T, PeriodError>;

/// Errors that can occur while segmenting, clustering or exporting profiles.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PeriodError {
    /// Invalid parameter value (cluster count, period duration, horizon length).
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Malformed input data (non-finite values, bad profile names, gaps).
    #[error("data error: {0}")]
    Data(String),

    /// Input data is empty.
    #[error("empty input data")]
    EmptyData,

    /// Dimension mismatch between data structures.
    #[error("dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },
}

impl PeriodError {
    pub(crate) fn config(msg: impl Into<String>) -> Self {
        PeriodError::Configuration(msg.into())
    }

    pub(crate) fn data(msg: impl Into<String>) -> Self {
        PeriodError::Data(msg.into())
    }
}

/// Raised when the clustering loop hits its iteration bound before the
/// assignment stabilized. The best assignment found is still returned.
#[derive(Debug, Clone, PartialEq)]
pub struct ConvergenceWarning {
    /// Iterations performed.
    pub iterations: usize,
    /// Configured iteration bound.
    pub max_iterations: usize,
    /// Inertia of the returned assignment.
    pub inertia: f64,
}

impl fmt::Display for ConvergenceWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "clustering did not converge within {} iterations (ran {}, inertia {:.6})",
            self.max_iterations, self.iterations, self.inertia
        )
    }
}
