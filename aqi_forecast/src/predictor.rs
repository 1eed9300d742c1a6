//! AQI forecaster
//!
//! Owns one recurrent network and moves through
//! `Uninitialized -> Initialized -> Trained`. Training scales the full
//! history into `[0, 1]`; prediction scales the recent window according to
//! [`NormalizationMode`], runs one forward pass, maps the clamped output back
//! into that range and rounds it.
//!
//! Mutating operations take `&mut self`, so a single instance can never be
//! trained and queried at the same time. Use
//! [`ForecasterRegistry`](crate::registry::ForecasterRegistry) to share
//! instances between tasks.

use crate::config::{ForecasterConfig, NormalizationMode};
use crate::error::{ForecastError, Result};
use crate::metrics::{forecast_accuracy, ForecastAccuracy};
use crate::models::{FitOptions, LstmRegressor, SequenceModel, TrainingHistory};
use crate::prediction::AqiPrediction;
use crate::store::{ModelSnapshot, ModelStore};
use aqi_math::{dispersion_confidence, sliding_windows, MinMaxRange};
use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{info, warn};

/// Lifecycle stage of a forecaster
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForecasterState {
    /// No network has been built
    Uninitialized,
    /// A network exists but has not been fitted
    Initialized,
    /// The network has been fitted at least once
    Trained,
}

/// One-step-ahead AQI forecaster backed by an LSTM regressor
#[derive(Debug)]
pub struct AqiForecaster {
    config: ForecasterConfig,
    model: Option<LstmRegressor>,
    training_range: Option<MinMaxRange>,
    rng: StdRng,
}

impl AqiForecaster {
    /// Create an uninitialized forecaster
    pub fn new(config: ForecasterConfig) -> Result<Self> {
        config.validate()?;
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Ok(Self {
            config,
            model: None,
            training_range: None,
            rng,
        })
    }

    /// Rebuild a forecaster from a stored snapshot
    pub fn from_snapshot(snapshot: ModelSnapshot) -> Result<Self> {
        if snapshot.network.lookback() != snapshot.config.lookback {
            return Err(ForecastError::Persistence(format!(
                "Snapshot network expects {} samples but its config says {}",
                snapshot.network.lookback(),
                snapshot.config.lookback
            )));
        }

        snapshot.network.validate().map_err(|e| {
            ForecastError::Persistence(format!("Snapshot network is inconsistent: {}", e))
        })?;

        let mut forecaster = Self::new(snapshot.config)?;
        forecaster.model = Some(snapshot.network);
        forecaster.training_range = snapshot.training_range;
        Ok(forecaster)
    }

    /// Load the snapshot stored under `key`
    pub fn restore(store: &dyn ModelStore, key: &str) -> Result<Self> {
        let forecaster = Self::from_snapshot(store.load(key)?)?;
        info!(key, state = ?forecaster.state(), "restored forecaster");
        Ok(forecaster)
    }

    pub fn config(&self) -> &ForecasterConfig {
        &self.config
    }

    /// Current lifecycle stage
    pub fn state(&self) -> ForecasterState {
        match (&self.model, &self.training_range) {
            (None, _) => ForecasterState::Uninitialized,
            (Some(_), None) => ForecasterState::Initialized,
            (Some(_), Some(_)) => ForecasterState::Trained,
        }
    }

    /// Range of the series the model was last trained on
    pub fn training_range(&self) -> Option<MinMaxRange> {
        self.training_range
    }

    /// The underlying network, if built
    pub fn model(&self) -> Option<&LstmRegressor> {
        self.model.as_ref()
    }

    /// Build a fresh network, discarding any previous weights
    pub fn init_model(&mut self) -> Result<()> {
        let model = LstmRegressor::from_config(&self.config, &mut self.rng)?;
        info!(model = model.name(), lookback = self.config.lookback, "initialized forecaster");
        self.model = Some(model);
        self.training_range = None;
        Ok(())
    }

    /// Fit the network on a full historical series, building it first if
    /// necessary
    pub fn train(&mut self, historical: &[f64]) -> Result<TrainingHistory> {
        if self.model.is_none() {
            self.init_model()?;
        }

        let range = MinMaxRange::from_values(historical)
            .map_err(|e| ForecastError::TrainingFailure(e.to_string()))?;
        if range.is_degenerate() {
            warn!(value = range.min(), "training series is constant");
        }

        let normalized = range.normalize_all(historical);
        let examples = sliding_windows(&normalized, self.config.lookback, self.config.horizon)
            .map_err(|e| ForecastError::TrainingFailure(e.to_string()))?;

        let options = FitOptions {
            epochs: self.config.epochs,
            batch_size: self.config.batch_size,
            validation_split: self.config.validation_split,
            shuffle: self.config.shuffle,
        };

        info!(
            samples = historical.len(),
            examples = examples.len(),
            epochs = options.epochs,
            "training forecaster"
        );

        // Fit a copy so a failed run leaves the current weights untouched
        let mut model = self.model.clone().ok_or(ForecastError::UninitializedModel)?;
        let history = model.fit(&examples.inputs, &examples.targets, &options, &mut self.rng)?;
        self.model = Some(model);
        self.training_range = Some(range);

        info!(
            loss = ?history.final_loss(),
            val_loss = ?history.final_val_loss(),
            "training finished"
        );
        Ok(history)
    }

    /// Forecast the value following `recent`, stamped with the current time
    pub fn predict(&self, recent: &[f64]) -> Result<AqiPrediction> {
        self.predict_at(recent, Utc::now())
    }

    /// Forecast the value following `recent` with an explicit timestamp
    pub fn predict_at(&self, recent: &[f64], timestamp: DateTime<Utc>) -> Result<AqiPrediction> {
        let model = self.model.as_ref().ok_or(ForecastError::UninitializedModel)?;

        let lookback = self.config.lookback;
        if recent.len() < lookback {
            return Err(ForecastError::InsufficientHistory {
                required: lookback,
                actual: recent.len(),
            });
        }

        let range = match self.config.normalization {
            NormalizationMode::RecentWindow => MinMaxRange::from_values(recent)?,
            NormalizationMode::TrainingRange => self.training_range.ok_or_else(|| {
                ForecastError::NotTrained(
                    "training-range normalization needs a trained model".to_string(),
                )
            })?,
        };

        let window = range.normalize_all(&recent[recent.len() - lookback..]);
        let output = model.predict(&window)?;
        if !output.is_finite() {
            return Err(ForecastError::DataError(
                "Model produced a non-finite output".to_string(),
            ));
        }
        let predicted_value = range.denormalize(output.clamp(0.0, 1.0)).round() as i64;

        let tail = &recent[recent.len().saturating_sub(self.config.confidence_window)..];
        let confidence = dispersion_confidence(tail, self.config.confidence_floor)?;

        Ok(AqiPrediction {
            predicted_value,
            confidence,
            timestamp,
        })
    }

    /// Walk-forward evaluation: predict each of the last `steps` samples of
    /// `series` from the `lookback` samples preceding it
    pub fn backtest(&self, series: &[f64], steps: usize) -> Result<ForecastAccuracy> {
        if steps == 0 {
            return Err(ForecastError::InvalidParameter(
                "Backtest needs at least one step".to_string(),
            ));
        }

        let lookback = self.config.lookback;
        let horizon = self.config.horizon;
        let required = lookback + horizon - 1 + steps;
        if series.len() < required {
            return Err(ForecastError::InsufficientHistory {
                required,
                actual: series.len(),
            });
        }

        let now = Utc::now();
        let mut forecasts = Vec::with_capacity(steps);
        let mut actuals = Vec::with_capacity(steps);
        for target in series.len() - steps..series.len() {
            let end = target + 1 - horizon;
            let prediction = self.predict_at(&series[end - lookback..end], now)?;
            forecasts.push(prediction.predicted_value as f64);
            actuals.push(series[target]);
        }

        forecast_accuracy(&forecasts, &actuals)
    }

    /// Capture the current weights and training range
    pub fn snapshot(&self) -> Result<ModelSnapshot> {
        let network = self.model.clone().ok_or(ForecastError::UninitializedModel)?;
        Ok(ModelSnapshot {
            config: self.config.clone(),
            network,
            training_range: self.training_range,
            saved_at: Utc::now(),
        })
    }

    /// Store the current model under `key`
    pub fn save(&self, store: &dyn ModelStore, key: &str) -> Result<()> {
        store.save(key, &self.snapshot()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryModelStore;
    use chrono::TimeZone;

    fn small_config() -> ForecasterConfig {
        ForecasterConfig {
            lookback: 6,
            lstm_units: 6,
            dense_units: 4,
            epochs: 3,
            batch_size: 8,
            seed: Some(17),
            ..ForecasterConfig::default()
        }
    }

    fn wave(len: usize) -> Vec<f64> {
        (0..len)
            .map(|i| 120.0 + 30.0 * (i as f64 * std::f64::consts::PI / 6.0).sin())
            .collect()
    }

    #[test]
    fn test_lifecycle_states() {
        let mut forecaster = AqiForecaster::new(small_config()).unwrap();
        assert_eq!(forecaster.state(), ForecasterState::Uninitialized);

        forecaster.init_model().unwrap();
        assert_eq!(forecaster.state(), ForecasterState::Initialized);

        forecaster.train(&wave(40)).unwrap();
        assert_eq!(forecaster.state(), ForecasterState::Trained);
        let range = forecaster.training_range().unwrap();
        assert!((range.min() - 90.0).abs() < 1e-9);
        assert!((range.max() - 150.0).abs() < 1e-9);
    }

    #[test]
    fn test_train_initializes_implicitly() {
        let mut forecaster = AqiForecaster::new(small_config()).unwrap();
        let history = forecaster.train(&wave(40)).unwrap();

        assert_eq!(history.epochs(), 3);
        assert_eq!(forecaster.state(), ForecasterState::Trained);
    }

    #[test]
    fn test_predict_before_init_fails() {
        let forecaster = AqiForecaster::new(small_config()).unwrap();
        let result = forecaster.predict(&wave(10));
        assert!(matches!(result, Err(ForecastError::UninitializedModel)));
    }

    #[test]
    fn test_training_range_mode_requires_training() {
        let config = small_config().with_normalization(NormalizationMode::TrainingRange);
        let mut forecaster = AqiForecaster::new(config).unwrap();
        forecaster.init_model().unwrap();

        let result = forecaster.predict(&wave(10));
        assert!(matches!(result, Err(ForecastError::NotTrained(_))));
    }

    #[test]
    fn test_training_failure_on_short_series() {
        let mut forecaster = AqiForecaster::new(small_config()).unwrap();
        let result = forecaster.train(&wave(5));
        assert!(matches!(result, Err(ForecastError::TrainingFailure(_))));
    }

    #[test]
    fn test_constant_window_predicts_constant() {
        let mut forecaster = AqiForecaster::new(small_config()).unwrap();
        forecaster.train(&wave(40)).unwrap();

        let prediction = forecaster.predict(&[75.0; 6]).unwrap();
        assert_eq!(prediction.predicted_value, 75);
        assert_eq!(prediction.confidence, 1.0);
    }

    #[test]
    fn test_explicit_timestamp() {
        let mut forecaster = AqiForecaster::new(small_config()).unwrap();
        forecaster.init_model().unwrap();

        let at = Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap();
        let prediction = forecaster.predict_at(&wave(12), at).unwrap();
        assert_eq!(prediction.timestamp, at);
    }

    #[test]
    fn test_backtest_scores_each_step() {
        let mut forecaster = AqiForecaster::new(small_config()).unwrap();
        forecaster.train(&wave(40)).unwrap();

        let accuracy = forecaster.backtest(&wave(40), 5).unwrap();
        assert!(accuracy.mae >= 0.0);
        assert!(accuracy.rmse >= accuracy.mae - 1e-9);

        assert!(forecaster.backtest(&wave(8), 5).is_err());
        assert!(forecaster.backtest(&wave(40), 0).is_err());
    }

    #[test]
    fn test_snapshot_round_trip_preserves_predictions() {
        let mut forecaster = AqiForecaster::new(small_config()).unwrap();
        forecaster.train(&wave(40)).unwrap();

        let store = MemoryModelStore::new();
        forecaster.save(&store, "thane").unwrap();
        let restored = AqiForecaster::restore(&store, "thane").unwrap();

        let at = Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap();
        let recent = wave(30);
        assert_eq!(
            forecaster.predict_at(&recent, at).unwrap(),
            restored.predict_at(&recent, at).unwrap()
        );
        assert_eq!(restored.state(), ForecasterState::Trained);
    }

    #[test]
    fn test_failed_training_keeps_previous_model() {
        let mut trained = AqiForecaster::new(small_config()).unwrap();
        trained.train(&wave(40)).unwrap();

        // An absurd learning rate makes the second batch of the next run diverge
        let mut doc = serde_json::to_value(trained.snapshot().unwrap()).unwrap();
        doc["network"]["optimizer"]["learning_rate"] = serde_json::json!(1e300);
        let snapshot: ModelSnapshot = serde_json::from_value(doc).unwrap();
        let mut forecaster = AqiForecaster::from_snapshot(snapshot).unwrap();

        let at = Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap();
        let recent = wave(30);
        let range = forecaster.training_range();
        let before = forecaster.predict_at(&recent, at).unwrap();

        let shifted: Vec<f64> = wave(40).iter().map(|v| v + 200.0).collect();
        let result = forecaster.train(&shifted);
        assert!(matches!(result, Err(ForecastError::TrainingFailure(_))));

        assert_eq!(forecaster.state(), ForecasterState::Trained);
        assert_eq!(forecaster.training_range(), range);
        assert_eq!(forecaster.predict_at(&recent, at).unwrap(), before);
        assert_eq!(forecaster.model().unwrap().optimizer_steps(), 0);
    }

    #[test]
    fn test_save_without_model_fails() {
        let forecaster = AqiForecaster::new(small_config()).unwrap();
        let store = MemoryModelStore::new();
        assert!(matches!(
            forecaster.save(&store, "thane"),
            Err(ForecastError::UninitializedModel)
        ));
    }
}
