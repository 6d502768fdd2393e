//! Error types for the longevity estimator

use thiserror::Error;

/// Errors raised while estimating lifetime moments
#[derive(Debug, Error)]
pub enum LongevityError {
    /// The mortality classifier could not be trained
    #[error("mortality fit failed: {0}")]
    Fit(String),

    /// A matrix or coefficient vector does not have the expected shape
    #[error("dimension mismatch for {what}: expected {expected:?}, found {found:?}")]
    Dimension {
        what: &'static str,
        expected: (usize, usize),
        found: (usize, usize),
    },

    /// The fundamental matrix (I - U)^-1 is undefined
    #[error("numerical failure: {0}")]
    Numerical(String),

    /// Input tables or vectors violate a structural requirement
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, LongevityError>;

impl LongevityError {
    pub(crate) fn dimension(
        what: &'static str,
        expected: (usize, usize),
        found: (usize, usize),
    ) -> Self {
        LongevityError::Dimension { what, expected, found }
    }
}
