//! # AQI Forecast
//!
//! One-step-ahead air quality forecasting with a small recurrent network.
//!
//! ## Features
//!
//! - LSTM regressor written in plain Rust (LSTM, two dense layers, Adam)
//! - Min-max normalization and sliding-window training examples
//! - Dispersion-based confidence scores
//! - Per-location forecaster registry for async services
//! - JSON model snapshots on disk or in memory
//! - Synthetic station histories and CSV series loading
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use aqi_forecast::{AqiForecaster, ForecasterConfig};
//!
//! let history: Vec<f64> = (0..200).map(|i| 100.0 + (i % 24) as f64).collect();
//!
//! let mut forecaster = AqiForecaster::new(ForecasterConfig::default().with_seed(7))?;
//! forecaster.train(&history)?;
//!
//! let prediction = forecaster.predict(&history[history.len() - 24..])?;
//! println!("{}", prediction.to_json()?);
//! # Ok::<(), aqi_forecast::ForecastError>(())
//! ```

pub mod config;
pub mod data;
pub mod error;
pub mod metrics;
pub mod models;
pub mod prediction;
pub mod predictor;
pub mod registry;
pub mod store;
pub mod synthetic;

// Re-export commonly used types
pub use crate::config::{ForecasterConfig, NormalizationMode};
pub use crate::data::{SeriesLoader, TimeSeries};
pub use crate::error::{ForecastError, Result};
pub use crate::metrics::ForecastAccuracy;
pub use crate::models::{LstmRegressor, SequenceModel, TrainingHistory};
pub use crate::prediction::{AqiCategory, AqiPrediction};
pub use crate::predictor::{AqiForecaster, ForecasterState};
pub use crate::registry::ForecasterRegistry;
pub use crate::store::{FileModelStore, MemoryModelStore, ModelSnapshot, ModelStore};
pub use crate::synthetic::MonitoringStation;

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
