//! Dispersion statistics
//!
//! The confidence attached to a forecast is a heuristic derived from the
//! coefficient of variation of the most recent samples. It is not a
//! calibrated probability.

use crate::{MathError, Result};
use statrs::statistics::Statistics;

/// Arithmetic mean of a series
pub fn mean(values: &[f64]) -> Result<f64> {
    if values.is_empty() {
        return Err(MathError::InsufficientData(
            "Cannot compute the mean of an empty series".to_string(),
        ));
    }
    Ok(values.iter().mean())
}

/// Population standard deviation (divides by `n`)
pub fn population_std_dev(values: &[f64]) -> Result<f64> {
    if values.is_empty() {
        return Err(MathError::InsufficientData(
            "Cannot compute the standard deviation of an empty series".to_string(),
        ));
    }
    Ok(values.iter().population_std_dev())
}

/// Coefficient of variation, capped at 1.
///
/// Fewer than two samples, or zero spread, yields 0. A non-positive mean
/// with non-zero spread yields the cap.
pub fn coefficient_of_variation(values: &[f64]) -> Result<f64> {
    if values.len() < 2 {
        return Ok(0.0);
    }
    if values.iter().any(|v| !v.is_finite()) {
        return Err(MathError::InvalidInput(
            "Series contains non-finite values".to_string(),
        ));
    }

    let std_dev = population_std_dev(values)?;
    if std_dev == 0.0 {
        return Ok(0.0);
    }

    let mean = mean(values)?;
    if mean <= 0.0 {
        return Ok(1.0);
    }

    Ok((std_dev / mean).min(1.0))
}

/// Confidence heuristic: `max(floor, 1 - cv)` where `cv` is the capped
/// coefficient of variation of the given samples.
pub fn dispersion_confidence(values: &[f64], floor: f64) -> Result<f64> {
    if !(0.0..=1.0).contains(&floor) {
        return Err(MathError::InvalidInput(format!(
            "Confidence floor must be within [0, 1], got {}",
            floor
        )));
    }

    let variability = coefficient_of_variation(values)?;
    Ok((1.0 - variability).max(floor))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rstest::rstest;

    #[test]
    fn test_mean_and_std_dev() {
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert_relative_eq!(mean(&values).unwrap(), 5.0);
        assert_relative_eq!(population_std_dev(&values).unwrap(), 2.0);
    }

    #[test]
    fn test_constant_series_has_full_confidence() {
        let values = [120.0; 6];
        assert_eq!(coefficient_of_variation(&values).unwrap(), 0.0);
        assert_eq!(dispersion_confidence(&values, 0.5).unwrap(), 1.0);
    }

    #[test]
    fn test_single_sample_has_no_variability() {
        assert_eq!(coefficient_of_variation(&[80.0]).unwrap(), 0.0);
    }

    #[test]
    fn test_variability_is_capped() {
        // mean 1, population std dev sqrt(3)
        let values = [0.0, 0.0, 0.0, 4.0];
        assert_eq!(coefficient_of_variation(&values).unwrap(), 1.0);
        assert_eq!(dispersion_confidence(&values, 0.5).unwrap(), 0.5);
    }

    #[rstest]
    #[case(&[100.0, 110.0, 90.0, 105.0, 95.0, 100.0])]
    #[case(&[10.0, 300.0, 15.0, 250.0, 5.0, 400.0])]
    #[case(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0])]
    fn test_confidence_bounds(#[case] values: &[f64]) {
        let confidence = dispersion_confidence(values, 0.5).unwrap();
        assert!((0.5..=1.0).contains(&confidence));
    }

    #[test]
    fn test_confidence_matches_formula() {
        let values = [100.0, 110.0, 90.0, 105.0, 95.0, 100.0];
        let expected = 1.0 - population_std_dev(&values).unwrap() / 100.0;
        assert_relative_eq!(dispersion_confidence(&values, 0.5).unwrap(), expected);
    }

    #[test]
    fn test_invalid_floor() {
        assert!(dispersion_confidence(&[1.0, 2.0], 1.5).is_err());
    }
}
