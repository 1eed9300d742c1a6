//! Registry of per-location forecasters
//!
//! Each location owns an independent [`AqiForecaster`] behind its own async
//! mutex, so train and predict calls on one location are serialized while
//! different locations proceed independently. Training runs on the blocking
//! thread pool.
//!
//! Lifecycle per location: `create -> train -> predict ... -> dispose`.

use crate::config::ForecasterConfig;
use crate::error::{ForecastError, Result};
use crate::models::TrainingHistory;
use crate::prediction::AqiPrediction;
use crate::predictor::{AqiForecaster, ForecasterState};
use crate::store::{validate_key, ModelStore};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{info, info_span};

type Handle = Arc<Mutex<AqiForecaster>>;

/// Location id -> forecaster
#[derive(Debug)]
pub struct ForecasterRegistry {
    config: ForecasterConfig,
    entries: RwLock<HashMap<String, Handle>>,
}

impl ForecasterRegistry {
    /// Create an empty registry; new entries use `config`
    pub fn new(config: ForecasterConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            entries: RwLock::new(HashMap::new()),
        })
    }

    /// Configuration applied to newly created forecasters
    pub fn config(&self) -> &ForecasterConfig {
        &self.config
    }

    async fn handle(&self, location: &str) -> Result<Handle> {
        self.entries
            .read()
            .await
            .get(location)
            .cloned()
            .ok_or_else(|| ForecastError::UnknownLocation(location.to_string()))
    }

    /// Register an initialized forecaster for `location`
    pub async fn create(&self, location: &str) -> Result<()> {
        validate_key(location)?;

        let mut entries = self.entries.write().await;
        if entries.contains_key(location) {
            return Err(ForecastError::InvalidParameter(format!(
                "Location '{}' is already registered",
                location
            )));
        }

        let mut forecaster = AqiForecaster::new(self.config.clone())?;
        forecaster.init_model()?;
        entries.insert(location.to_string(), Arc::new(Mutex::new(forecaster)));

        info!(location, "registered forecaster");
        Ok(())
    }

    /// Register an existing forecaster, replacing any previous entry.
    /// Returns whether an entry was replaced.
    pub async fn insert(&self, location: &str, forecaster: AqiForecaster) -> Result<bool> {
        validate_key(location)?;
        let replaced = self
            .entries
            .write()
            .await
            .insert(location.to_string(), Arc::new(Mutex::new(forecaster)))
            .is_some();
        Ok(replaced)
    }

    /// Check whether `location` is registered
    pub async fn contains(&self, location: &str) -> bool {
        self.entries.read().await.contains_key(location)
    }

    /// Registered locations, sorted
    pub async fn locations(&self) -> Vec<String> {
        let mut locations: Vec<String> = self.entries.read().await.keys().cloned().collect();
        locations.sort();
        locations
    }

    /// Lifecycle stage of the forecaster for `location`
    pub async fn state(&self, location: &str) -> Result<ForecasterState> {
        let handle = self.handle(location).await?;
        let state = handle.lock().await.state();
        Ok(state)
    }

    /// Train the forecaster for `location` on its full history
    pub async fn train(&self, location: &str, historical: Vec<f64>) -> Result<TrainingHistory> {
        let handle = self.handle(location).await?;
        let mut forecaster = handle.lock_owned().await;
        let location = location.to_string();

        tokio::task::spawn_blocking(move || {
            let _span = info_span!("train", location = %location).entered();
            forecaster.train(&historical)
        })
        .await
        .map_err(|e| ForecastError::TrainingFailure(format!("Training task failed: {}", e)))?
    }

    /// Forecast the next value for `location`
    pub async fn predict(&self, location: &str, recent: &[f64]) -> Result<AqiPrediction> {
        let handle = self.handle(location).await?;
        let forecaster = handle.lock().await;
        forecaster.predict(recent)
    }

    /// Remove the forecaster for `location`. A call already holding the
    /// instance finishes before it is dropped.
    pub async fn dispose(&self, location: &str) -> bool {
        let removed = self.entries.write().await.remove(location).is_some();
        if removed {
            info!(location, "disposed forecaster");
        }
        removed
    }

    /// Store the forecaster for `location` under its location id
    pub async fn save(&self, location: &str, store: &dyn ModelStore) -> Result<()> {
        let handle = self.handle(location).await?;
        let forecaster = handle.lock().await;
        forecaster.save(store, location)
    }

    /// Replace (or create) the entry for `location` from the store
    pub async fn restore(&self, location: &str, store: &dyn ModelStore) -> Result<()> {
        let forecaster = AqiForecaster::restore(store, location)?;
        self.insert(location, forecaster).await?;
        Ok(())
    }
}
