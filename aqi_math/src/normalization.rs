//! Min-max normalization
//!
//! Linear rescaling of a series into `[0, 1]` using its observed minimum and
//! maximum, and the inverse mapping back into the original units.

use crate::{MathError, Result};
use serde::{Deserialize, Serialize};

/// Observed value range of a series
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MinMaxRange {
    min: f64,
    max: f64,
}

impl MinMaxRange {
    /// Create a range from explicit bounds
    pub fn new(min: f64, max: f64) -> Result<Self> {
        if !min.is_finite() || !max.is_finite() {
            return Err(MathError::InvalidInput(
                "Range bounds must be finite".to_string(),
            ));
        }
        if min > max {
            return Err(MathError::InvalidInput(format!(
                "Range minimum ({}) exceeds maximum ({})",
                min, max
            )));
        }

        Ok(Self { min, max })
    }

    /// Compute the range covered by a series
    pub fn from_values(values: &[f64]) -> Result<Self> {
        if values.is_empty() {
            return Err(MathError::InsufficientData(
                "Cannot compute the range of an empty series".to_string(),
            ));
        }
        if values.iter().any(|v| !v.is_finite()) {
            return Err(MathError::InvalidInput(
                "Series contains non-finite values".to_string(),
            ));
        }

        let (min, max) = values
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
                (lo.min(v), hi.max(v))
            });

        Ok(Self { min, max })
    }

    /// Lower bound
    pub fn min(&self) -> f64 {
        self.min
    }

    /// Upper bound
    pub fn max(&self) -> f64 {
        self.max
    }

    /// Width of the range
    pub fn span(&self) -> f64 {
        self.max - self.min
    }

    /// True when every value in the series was identical
    pub fn is_degenerate(&self) -> bool {
        self.span() == 0.0
    }

    /// Map a value into `[0, 1]`. A degenerate range maps everything to 0.
    pub fn normalize(&self, value: f64) -> f64 {
        if self.is_degenerate() {
            return 0.0;
        }
        (value - self.min) / self.span()
    }

    /// Map a normalized value back into the original units
    pub fn denormalize(&self, normalized: f64) -> f64 {
        normalized * self.span() + self.min
    }

    /// Normalize a whole series
    pub fn normalize_all(&self, values: &[f64]) -> Vec<f64> {
        values.iter().map(|&v| self.normalize(v)).collect()
    }

    /// Check whether a value lies inside the range
    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

/// Normalize a series over its own range, returning the scaled values and
/// the range that was used.
pub fn normalize_series(values: &[f64]) -> Result<(Vec<f64>, MinMaxRange)> {
    let range = MinMaxRange::from_values(values)?;
    Ok((range.normalize_all(values), range))
}
