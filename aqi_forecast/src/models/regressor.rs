//! LSTM regressor: recurrent layer, ReLU dense layer, linear output unit,
//! trained on mean squared error with Adam.

use crate::config::ForecasterConfig;
use crate::error::{ForecastError, Result};
use crate::models::dense::{Activation, DenseLayer};
use crate::models::lstm::LstmLayer;
use crate::models::optimizer::Adam;
use crate::models::{FitOptions, SequenceModel, TrainingHistory};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Window-to-value network with one feature per timestep
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LstmRegressor {
    name: String,
    lookback: usize,
    lstm: LstmLayer,
    hidden: DenseLayer,
    output: DenseLayer,
    optimizer: Adam,
}

impl LstmRegressor {
    /// Build a freshly initialized network
    pub fn new<R: Rng>(
        lookback: usize,
        lstm_units: usize,
        dense_units: usize,
        learning_rate: f64,
        rng: &mut R,
    ) -> Result<Self> {
        if lookback == 0 || lstm_units == 0 || dense_units == 0 {
            return Err(ForecastError::InvalidParameter(
                "Lookback and layer sizes must be greater than zero".to_string(),
            ));
        }
        if learning_rate.is_nan() || learning_rate <= 0.0 {
            return Err(ForecastError::InvalidParameter(format!(
                "Learning rate must be positive, got {}",
                learning_rate
            )));
        }

        Ok(Self {
            name: format!("LSTM({}) -> Dense({}, relu) -> Dense(1)", lstm_units, dense_units),
            lookback,
            lstm: LstmLayer::new(1, lstm_units, rng),
            hidden: DenseLayer::new(lstm_units, dense_units, Activation::Relu, rng),
            output: DenseLayer::new(dense_units, 1, Activation::Linear, rng),
            optimizer: Adam::new(learning_rate),
        })
    }

    /// Build the network described by a forecaster configuration
    pub fn from_config<R: Rng>(config: &ForecasterConfig, rng: &mut R) -> Result<Self> {
        Self::new(
            config.lookback,
            config.lstm_units,
            config.dense_units,
            config.learning_rate,
            rng,
        )
    }

    /// Units in the recurrent layer
    pub fn lstm_units(&self) -> usize {
        self.lstm.units()
    }

    /// Units in the dense layer
    pub fn dense_units(&self) -> usize {
        self.hidden.units()
    }

    /// Optimizer updates applied since construction or restore
    pub fn optimizer_steps(&self) -> i32 {
        self.optimizer.steps()
    }

    /// Check that every layer's tensors match its declared sizes and that
    /// consecutive layers connect. Weights read from storage go through here
    /// before use.
    pub fn validate(&self) -> Result<()> {
        if self.lookback == 0 {
            return Err(ForecastError::InvalidParameter(
                "Lookback must be greater than zero".to_string(),
            ));
        }
        let lr = self.optimizer.learning_rate();
        if lr.is_nan() || lr <= 0.0 || lr.is_infinite() {
            return Err(ForecastError::InvalidParameter(format!(
                "Learning rate must be positive, got {}",
                lr
            )));
        }

        self.lstm.validate()?;
        self.hidden.validate()?;
        self.output.validate()?;

        if self.lstm.input_size() != 1 {
            return Err(ForecastError::InvalidParameter(format!(
                "LSTM expects {} features per step, the regressor feeds 1",
                self.lstm.input_size()
            )));
        }
        if self.hidden.inputs() != self.lstm.units() {
            return Err(ForecastError::InvalidParameter(format!(
                "Dense layer takes {} inputs but the LSTM emits {}",
                self.hidden.inputs(),
                self.lstm.units()
            )));
        }
        if self.output.inputs() != self.hidden.units() {
            return Err(ForecastError::InvalidParameter(format!(
                "Output layer takes {} inputs but the dense layer emits {}",
                self.output.inputs(),
                self.hidden.units()
            )));
        }
        if self.output.units() != 1 {
            return Err(ForecastError::InvalidParameter(format!(
                "Output layer has {} units, expected 1",
                self.output.units()
            )));
        }
        Ok(())
    }

    fn infer(&self, window: &[f64]) -> f64 {
        let state = self.lstm.infer(window);
        let activations = self.hidden.infer(&state);
        self.output.infer(&activations)[0]
    }

    fn mean_squared_error(&self, indices: &[usize], inputs: &[Vec<f64>], targets: &[f64]) -> f64 {
        let total: f64 = indices
            .iter()
            .map(|&idx| (self.infer(&inputs[idx]) - targets[idx]).powi(2))
            .sum();
        total / indices.len() as f64
    }

    /// One optimizer step over a mini-batch; returns the summed squared error
    fn train_batch(&mut self, batch: &[usize], inputs: &[Vec<f64>], targets: &[f64]) -> f64 {
        let mut lstm_grads = self.lstm.zero_gradients();
        let mut hidden_grads = self.hidden.zero_gradients();
        let mut output_grads = self.output.zero_gradients();

        let scale = 2.0 / batch.len() as f64;
        let mut squared_error = 0.0;

        for &idx in batch {
            let (state, lstm_cache) = self.lstm.forward(&inputs[idx]);
            let (activations, hidden_cache) = self.hidden.forward(&state);
            let (prediction, output_cache) = self.output.forward(&activations);

            let err = prediction[0] - targets[idx];
            squared_error += err * err;

            let d_activations = self
                .output
                .backward(&output_cache, &[scale * err], &mut output_grads);
            let d_state = self
                .hidden
                .backward(&hidden_cache, &d_activations, &mut hidden_grads);
            self.lstm.backward(&lstm_cache, &d_state, &mut lstm_grads);
        }

        let Self {
            lstm,
            hidden,
            output,
            optimizer,
            ..
        } = self;

        let mut params: Vec<&mut [f64]> = Vec::with_capacity(7);
        params.extend(lstm.parameters_mut());
        params.extend(hidden.parameters_mut());
        params.extend(output.parameters_mut());

        let mut grads: Vec<&[f64]> = Vec::with_capacity(7);
        grads.extend(lstm_grads.tensors());
        grads.extend(hidden_grads.tensors());
        grads.extend(output_grads.tensors());

        optimizer.step(params, grads);
        squared_error
    }

    fn check_examples(&self, inputs: &[Vec<f64>], targets: &[f64]) -> Result<()> {
        if inputs.is_empty() {
            return Err(ForecastError::TrainingFailure(
                "No training examples supplied".to_string(),
            ));
        }
        if inputs.len() != targets.len() {
            return Err(ForecastError::TrainingFailure(format!(
                "Got {} input windows but {} targets",
                inputs.len(),
                targets.len()
            )));
        }
        if let Some(window) = inputs.iter().find(|w| w.len() != self.lookback) {
            return Err(ForecastError::TrainingFailure(format!(
                "Expected windows of {} samples, got {}",
                self.lookback,
                window.len()
            )));
        }
        let all_finite = inputs.iter().flatten().chain(targets).all(|v| v.is_finite());
        if !all_finite {
            return Err(ForecastError::TrainingFailure(
                "Training examples contain non-finite values".to_string(),
            ));
        }
        Ok(())
    }
}

impl SequenceModel for LstmRegressor {
    fn fit<R: Rng>(
        &mut self,
        inputs: &[Vec<f64>],
        targets: &[f64],
        options: &FitOptions,
        rng: &mut R,
    ) -> Result<TrainingHistory> {
        self.check_examples(inputs, targets)?;
        if options.epochs == 0 || options.batch_size == 0 {
            return Err(ForecastError::InvalidParameter(
                "Epochs and batch size must be greater than zero".to_string(),
            ));
        }
        if !(0.0..1.0).contains(&options.validation_split) {
            return Err(ForecastError::InvalidParameter(format!(
                "Validation split must be within [0, 1), got {}",
                options.validation_split
            )));
        }

        let total = inputs.len();
        let split_at = (total as f64 * (1.0 - options.validation_split)).floor() as usize;
        if split_at == 0 {
            return Err(ForecastError::TrainingFailure(format!(
                "No training examples left after a {} validation split of {} examples",
                options.validation_split, total
            )));
        }

        let mut order: Vec<usize> = (0..split_at).collect();
        let validation: Vec<usize> = (split_at..total).collect();
        let mut history = TrainingHistory::default();

        for epoch in 1..=options.epochs {
            if options.shuffle {
                order.shuffle(rng);
            }

            let squared_error: f64 = order
                .chunks(options.batch_size)
                .map(|batch| self.train_batch(batch, inputs, targets))
                .sum();
            let loss = squared_error / split_at as f64;
            if !loss.is_finite() {
                return Err(ForecastError::TrainingFailure(format!(
                    "Loss diverged at epoch {}",
                    epoch
                )));
            }
            history.loss.push(loss);

            if !validation.is_empty() {
                let val_loss = self.mean_squared_error(&validation, inputs, targets);
                history.val_loss.push(val_loss);
                debug!(epoch, loss, val_loss, "epoch complete");
            } else {
                debug!(epoch, loss, "epoch complete");
            }
        }

        Ok(history)
    }

    fn predict(&self, window: &[f64]) -> Result<f64> {
        if window.len() != self.lookback {
            return Err(ForecastError::DataError(format!(
                "Expected a window of {} samples, got {}",
                self.lookback,
                window.len()
            )));
        }
        Ok(self.infer(window))
    }

    fn lookback(&self) -> usize {
        self.lookback
    }

    fn name(&self) -> &str {
        &self.name
    }
}
