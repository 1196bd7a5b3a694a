//! Error types shared by every analysis in this crate.

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, AnalysisError>;

/// Errors raised by signal transforms and analyses.
///
/// All variants are raised synchronously; no analysis returns a partially
/// computed result alongside an error.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalysisError {
    /// A caller-supplied parameter violates a precondition.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Cross-signal operation on signals with different sampling.
    #[error("incompatible signals: {0}")]
    IncompatibleSignals(String),

    /// The data cannot produce a meaningful numeric result
    /// (zero variance, constant data, no activity, ...).
    #[error("degenerate signal: {0}")]
    DegenerateSignal(String),

    /// The selected range is too short for the requested analysis.
    #[error("insufficient data: need at least {required} samples, got {available}")]
    InsufficientData { required: usize, available: usize },
}

impl AnalysisError {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        AnalysisError::InvalidParameter(msg.into())
    }

    pub(crate) fn degenerate(msg: impl Into<String>) -> Self {
        AnalysisError::DegenerateSignal(msg.into())
    }

    pub(crate) fn insufficient(required: usize, available: usize) -> Self {
        AnalysisError::InsufficientData {
            required,
            available,
        }
    }
}
