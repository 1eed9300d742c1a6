//! Forecaster configuration
//!
//! Every field has a default matching the reference network: a 24-sample
//! lookback, 50 LSTM units, a 25-unit dense layer, Adam at 0.001, 50 epochs
//! of 32-sample batches with a 20% validation split. Configurations can be
//! built in code or read from TOML.

use crate::error::{ForecastError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Which range is used to scale the recent window at prediction time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NormalizationMode {
    /// Scale with the min/max of the supplied recent samples. Training uses
    /// the full historical range, so the two scales differ.
    #[default]
    RecentWindow,
    /// Scale with the min/max captured while training
    TrainingRange,
}

/// Configuration for an [`AqiForecaster`](crate::predictor::AqiForecaster)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecasterConfig {
    /// Samples per input window
    pub lookback: usize,
    /// Steps between the end of the window and the target
    pub horizon: usize,
    /// Hidden units of the recurrent layer
    pub lstm_units: usize,
    /// Units of the dense layer after the recurrent layer
    pub dense_units: usize,
    /// Adam learning rate
    pub learning_rate: f64,
    /// Passes over the training examples
    pub epochs: usize,
    /// Examples per gradient step
    pub batch_size: usize,
    /// Fraction of examples (taken from the end) held out for validation
    pub validation_split: f64,
    /// Shuffle training examples every epoch
    pub shuffle: bool,
    /// Seed for weight initialization and shuffling
    pub seed: Option<u64>,
    /// Trailing samples used for the confidence heuristic
    pub confidence_window: usize,
    /// Lowest confidence ever reported
    pub confidence_floor: f64,
    /// Prediction-time scaling
    pub normalization: NormalizationMode,
}

impl Default for ForecasterConfig {
    fn default() -> Self {
        Self {
            lookback: 24,
            horizon: 1,
            lstm_units: 50,
            dense_units: 25,
            learning_rate: 0.001,
            epochs: 50,
            batch_size: 32,
            validation_split: 0.2,
            shuffle: true,
            seed: None,
            confidence_window: 6,
            confidence_floor: 0.5,
            normalization: NormalizationMode::RecentWindow,
        }
    }
}

impl ForecasterConfig {
    /// Parse a configuration from TOML and validate it
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Read a TOML configuration file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let source = std::fs::read_to_string(path)?;
        Self::from_toml_str(&source)
    }

    /// Builder-style seed setter
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Builder-style epoch setter
    pub fn with_epochs(mut self, epochs: usize) -> Self {
        self.epochs = epochs;
        self
    }

    /// Builder-style normalization setter
    pub fn with_normalization(mut self, normalization: NormalizationMode) -> Self {
        self.normalization = normalization;
        self
    }

    /// Check that every parameter is usable
    pub fn validate(&self) -> Result<()> {
        if self.lookback == 0 {
            return Err(ForecastError::InvalidParameter(
                "Lookback must be greater than zero".to_string(),
            ));
        }
        if self.horizon == 0 {
            return Err(ForecastError::InvalidParameter(
                "Horizon must be greater than zero".to_string(),
            ));
        }
        if self.lstm_units == 0 || self.dense_units == 0 {
            return Err(ForecastError::InvalidParameter(
                "Layer sizes must be greater than zero".to_string(),
            ));
        }
        if !(self.learning_rate > 0.0 && self.learning_rate.is_finite()) {
            return Err(ForecastError::InvalidParameter(format!(
                "Learning rate must be positive, got {}",
                self.learning_rate
            )));
        }
        if self.epochs == 0 {
            return Err(ForecastError::InvalidParameter(
                "Epochs must be greater than zero".to_string(),
            ));
        }
        if self.batch_size == 0 {
            return Err(ForecastError::InvalidParameter(
                "Batch size must be greater than zero".to_string(),
            ));
        }
        if !(0.0..1.0).contains(&self.validation_split) {
            return Err(ForecastError::InvalidParameter(format!(
                "Validation split must be within [0, 1), got {}",
                self.validation_split
            )));
        }
        if self.confidence_window == 0 {
            return Err(ForecastError::InvalidParameter(
                "Confidence window must be greater than zero".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.confidence_floor) {
            return Err(ForecastError::InvalidParameter(format!(
                "Confidence floor must be within [0, 1], got {}",
                self.confidence_floor
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_is_valid() {
        let config = ForecasterConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.lookback, 24);
        assert_eq!(config.normalization, NormalizationMode::RecentWindow);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = ForecasterConfig::from_toml_str(
            r#"
            epochs = 10
            seed = 7
            normalization = "training_range"
            "#,
        )
        .unwrap();

        assert_eq!(
            config,
            ForecasterConfig {
                epochs: 10,
                seed: Some(7),
                normalization: NormalizationMode::TrainingRange,
                ..ForecasterConfig::default()
            }
        );
    }

    #[test]
    fn test_invalid_toml_values() {
        assert!(ForecasterConfig::from_toml_str("validation_split = 1.0").is_err());
        assert!(ForecasterConfig::from_toml_str("lookback = 0").is_err());
        assert!(ForecasterConfig::from_toml_str("normalization = \"sideways\"").is_err());
    }
}
