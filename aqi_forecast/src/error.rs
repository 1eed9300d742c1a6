//! Error types for the aqi_forecast crate

use thiserror::Error;

/// Custom error types for the aqi_forecast crate
#[derive(Debug, Error)]
pub enum ForecastError {
    /// Prediction or persistence attempted before a model exists
    #[error("Model not initialized")]
    UninitializedModel,

    /// Fewer recent samples than the lookback window requires
    #[error("Need at least {required} data points for prediction, got {actual}")]
    InsufficientHistory { required: usize, actual: usize },

    /// The fit rejected its inputs or failed to converge
    #[error("Training failed: {0}")]
    TrainingFailure(String),

    /// An operation needs state that only training produces
    #[error("Model not trained: {0}")]
    NotTrained(String),

    /// No forecaster is registered under the given location
    #[error("Unknown location: {0}")]
    UnknownLocation(String),

    /// Error related to data validation or processing
    #[error("Data error: {0}")]
    DataError(String),

    /// Error from invalid parameters
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Error from the model store
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Error from series math
    #[error("Math error: {0}")]
    MathError(#[from] aqi_math::MathError),

    /// Error from IO operations
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Error from CSV parsing
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    /// Error from JSON (de)serialization
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// Error from configuration parsing
    #[error("Config error: {0}")]
    ConfigError(#[from] toml::de::Error),
}

/// Result type with our custom error
pub type Result<T> = std::result::Result<T, ForecastError>;
