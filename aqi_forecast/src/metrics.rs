//! Scoring forecasts against observed readings

use crate::error::{ForecastError, Result};
use crate::prediction::AqiCategory;
use serde::Serialize;
use std::fmt;

/// Split a series into its head and a trailing holdout of roughly
/// `holdout` (a fraction in `(0, 1)`) of the readings. Out-of-range
/// fractions hold nothing out.
pub fn holdout_split(series: &[f64], holdout: f64) -> (&[f64], &[f64]) {
    if !(holdout > 0.0 && holdout < 1.0) {
        return (series, &[]);
    }
    let held = (series.len() as f64 * holdout).round() as usize;
    series.split_at(series.len() - held)
}

/// Error summary of paired forecasts and observations
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ForecastAccuracy {
    /// Number of scored pairs
    pub samples: usize,
    /// Mean absolute error, in AQI points
    pub mae: f64,
    /// Root mean squared error, in AQI points
    pub rmse: f64,
    /// Mean of `forecast - actual`; positive means over-forecasting
    pub bias: f64,
    /// Largest absolute miss
    pub max_error: f64,
    /// Mean absolute percentage error over non-zero observations, `None`
    /// when every observation is zero
    pub mape: Option<f64>,
    /// Share of forecasts that land in the observed health category
    pub category_hit_rate: f64,
}

/// Score `forecast` against `actual`, pairwise
pub fn forecast_accuracy(forecast: &[f64], actual: &[f64]) -> Result<ForecastAccuracy> {
    if forecast.is_empty() {
        return Err(ForecastError::DataError("Nothing to score".to_string()));
    }
    if forecast.len() != actual.len() {
        return Err(ForecastError::DataError(format!(
            "Got {} forecasts for {} observations",
            forecast.len(),
            actual.len()
        )));
    }

    let mut abs_sum = 0.0;
    let mut sq_sum = 0.0;
    let mut signed_sum = 0.0;
    let mut max_error: f64 = 0.0;
    let mut pct_sum = 0.0;
    let mut pct_count = 0usize;
    let mut hits = 0usize;

    for (&predicted, &observed) in forecast.iter().zip(actual) {
        let miss = predicted - observed;
        abs_sum += miss.abs();
        sq_sum += miss * miss;
        signed_sum += miss;
        max_error = max_error.max(miss.abs());

        if observed != 0.0 {
            pct_sum += (miss / observed).abs() * 100.0;
            pct_count += 1;
        }
        if AqiCategory::from_value(predicted) == AqiCategory::from_value(observed) {
            hits += 1;
        }
    }

    let n = forecast.len() as f64;
    Ok(ForecastAccuracy {
        samples: forecast.len(),
        mae: abs_sum / n,
        rmse: (sq_sum / n).sqrt(),
        bias: signed_sum / n,
        max_error,
        mape: (pct_count > 0).then(|| pct_sum / pct_count as f64),
        category_hit_rate: hits as f64 / n,
    })
}

impl fmt::Display for ForecastAccuracy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Scored {} forecasts", self.samples)?;
        writeln!(f, "  MAE        {:>8.2}", self.mae)?;
        writeln!(f, "  RMSE       {:>8.2}", self.rmse)?;
        writeln!(f, "  Bias       {:>+8.2}", self.bias)?;
        writeln!(f, "  Max error  {:>8.2}", self.max_error)?;
        match self.mape {
            Some(mape) => writeln!(f, "  MAPE       {:>7.2}%", mape)?,
            None => writeln!(f, "  MAPE            n/a")?,
        }
        write!(f, "  Category   {:>7.1}%", self.category_hit_rate * 100.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_accuracy_summary() {
        let accuracy = forecast_accuracy(&[105.0, 96.0, 160.0], &[100.0, 100.0, 150.0]).unwrap();

        assert_eq!(accuracy.samples, 3);
        assert_relative_eq!(accuracy.mae, 19.0 / 3.0);
        assert_relative_eq!(accuracy.rmse, (141.0_f64 / 3.0).sqrt());
        assert_relative_eq!(accuracy.bias, 11.0 / 3.0);
        assert_eq!(accuracy.max_error, 10.0);
        // only 96 vs 100 shares a band
        assert_relative_eq!(accuracy.category_hit_rate, 1.0 / 3.0);
    }

    #[test]
    fn test_zero_observations_skip_percentage() {
        let accuracy = forecast_accuracy(&[2.0, 110.0], &[0.0, 100.0]).unwrap();
        assert_relative_eq!(accuracy.mape.unwrap(), 10.0);

        let accuracy = forecast_accuracy(&[1.0], &[0.0]).unwrap();
        assert_eq!(accuracy.mape, None);
    }

    #[test]
    fn test_mismatched_lengths() {
        assert!(forecast_accuracy(&[1.0], &[1.0, 2.0]).is_err());
        assert!(forecast_accuracy(&[], &[]).is_err());
    }

    #[test]
    fn test_holdout_split() {
        let data: Vec<f64> = (0..10).map(f64::from).collect();
        let (head, tail) = holdout_split(&data, 0.2);
        assert_eq!(head.len(), 8);
        assert_eq!(tail, &[8.0, 9.0]);

        let (head, tail) = holdout_split(&data, 1.0);
        assert_eq!(head.len(), 10);
        assert!(tail.is_empty());
    }
}
