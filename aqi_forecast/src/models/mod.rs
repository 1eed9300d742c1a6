//! Sequence models for one-step-ahead forecasting

use crate::error::Result;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

/// Options for one call to [`SequenceModel::fit`]
#[derive(Debug, Clone, PartialEq)]
pub struct FitOptions {
    /// Passes over the training examples
    pub epochs: usize,
    /// Examples per gradient step
    pub batch_size: usize,
    /// Fraction of examples, taken from the end before shuffling, held out
    /// for validation
    pub validation_split: f64,
    /// Shuffle the training examples at the start of every epoch
    pub shuffle: bool,
}

impl Default for FitOptions {
    fn default() -> Self {
        Self {
            epochs: 50,
            batch_size: 32,
            validation_split: 0.2,
            shuffle: true,
        }
    }
}

/// Mean squared error recorded after every epoch
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrainingHistory {
    /// Training loss per epoch
    pub loss: Vec<f64>,
    /// Validation loss per epoch, empty when nothing was held out
    pub val_loss: Vec<f64>,
}

impl TrainingHistory {
    /// Number of completed epochs
    pub fn epochs(&self) -> usize {
        self.loss.len()
    }

    /// Training loss of the last epoch
    pub fn final_loss(&self) -> Option<f64> {
        self.loss.last().copied()
    }

    /// Validation loss of the last epoch
    pub fn final_val_loss(&self) -> Option<f64> {
        self.val_loss.last().copied()
    }
}

/// Common interface for trainable window-to-value models
pub trait SequenceModel: Debug + Clone {
    /// Fit the model on `(window, target)` pairs
    fn fit<R: Rng>(
        &mut self,
        inputs: &[Vec<f64>],
        targets: &[f64],
        options: &FitOptions,
        rng: &mut R,
    ) -> Result<TrainingHistory>;

    /// Predict the value following a single window
    fn predict(&self, window: &[f64]) -> Result<f64>;

    /// Window length the model consumes
    fn lookback(&self) -> usize;

    /// Get the name of the model
    fn name(&self) -> &str;
}

pub mod dense;
pub mod lstm;
pub mod optimizer;
pub mod regressor;

pub use regressor::LstmRegressor;
