//! # AQI Math
//!
//! Numeric building blocks for air-quality forecasting.
//! This crate provides min-max normalization, dispersion statistics and the
//! sliding-window construction used to turn a series into training examples.

use thiserror::Error;

pub mod normalization;
pub mod statistics;
pub mod windowing;

pub use normalization::MinMaxRange;
pub use statistics::{coefficient_of_variation, dispersion_confidence};
pub use windowing::{sliding_windows, WindowedExamples};

/// Errors that can occur in series calculations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MathError {
    #[error("Insufficient data for calculation: {0}")]
    InsufficientData(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Calculation error: {0}")]
    CalculationError(String),
}

/// Result type for series math operations
pub type Result<T> = std::result::Result<T, MathError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = MathError::InsufficientData("need 24 values".to_string());
        assert_eq!(
            err.to_string(),
            "Insufficient data for calculation: need 24 values"
        );
    }
}
