//! Named storage for trained forecasters
//!
//! A [`ModelSnapshot`] carries everything needed to rebuild a forecaster:
//! its configuration, the network weights and the range seen in training.
//! Optimizer moments are not stored.

use crate::config::ForecasterConfig;
use crate::error::{ForecastError, Result};
use crate::models::LstmRegressor;
use aqi_math::MinMaxRange;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use tracing::info;

/// Serialized state of a forecaster
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelSnapshot {
    pub config: ForecasterConfig,
    pub network: LstmRegressor,
    pub training_range: Option<MinMaxRange>,
    pub saved_at: DateTime<Utc>,
}

/// Storage backend keyed by name
pub trait ModelStore: Send + Sync {
    /// Store a snapshot, replacing any previous entry under `key`
    fn save(&self, key: &str, snapshot: &ModelSnapshot) -> Result<()>;

    /// Fetch the snapshot stored under `key`
    fn load(&self, key: &str) -> Result<ModelSnapshot>;

    /// Check whether `key` holds a snapshot
    fn contains(&self, key: &str) -> bool;

    /// Delete an entry; returns whether anything was removed
    fn remove(&self, key: &str) -> Result<bool>;

    /// All stored keys, sorted
    fn keys(&self) -> Result<Vec<String>>;
}

/// Keys are limited to ASCII letters, digits, `-` and `_`
pub fn validate_key(key: &str) -> Result<()> {
    let valid = !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if !valid {
        return Err(ForecastError::InvalidParameter(format!(
            "Invalid model key '{}': use letters, digits, '-' or '_'",
            key
        )));
    }
    Ok(())
}

fn missing(key: &str) -> ForecastError {
    ForecastError::Persistence(format!("No model stored under '{}'", key))
}

/// One JSON document per key inside a directory
#[derive(Debug, Clone)]
pub struct FileModelStore {
    root: PathBuf,
}

impl FileModelStore {
    /// Open a store rooted at `root`, creating the directory if needed
    pub fn new<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    /// Directory holding the snapshots
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(format!("{}.json", key))
    }
}

impl ModelStore for FileModelStore {
    fn save(&self, key: &str, snapshot: &ModelSnapshot) -> Result<()> {
        validate_key(key)?;
        let path = self.path_for(key);
        let staging = self.root.join(format!(".{}.json.tmp", key));

        fs::write(&staging, serde_json::to_vec(snapshot)?)?;
        fs::rename(&staging, &path)?;

        info!(key, path = %path.display(), "saved model snapshot");
        Ok(())
    }

    fn load(&self, key: &str) -> Result<ModelSnapshot> {
        validate_key(key)?;
        let path = self.path_for(key);
        if !path.exists() {
            return Err(missing(key));
        }

        let bytes = fs::read(&path)?;
        let snapshot = serde_json::from_slice(&bytes)?;
        info!(key, path = %path.display(), "loaded model snapshot");
        Ok(snapshot)
    }

    fn contains(&self, key: &str) -> bool {
        validate_key(key).is_ok() && self.path_for(key).is_file()
    }

    fn remove(&self, key: &str) -> Result<bool> {
        validate_key(key)?;
        let path = self.path_for(key);
        if !path.exists() {
            return Ok(false);
        }
        fs::remove_file(path)?;
        Ok(true)
    }

    fn keys(&self) -> Result<Vec<String>> {
        let mut keys = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                if validate_key(stem).is_ok() {
                    keys.push(stem.to_string());
                }
            }
        }
        keys.sort();
        Ok(keys)
    }
}

/// In-process store holding serialized snapshots
#[derive(Debug, Default)]
pub struct MemoryModelStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryModelStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn poisoned() -> ForecastError {
        ForecastError::Persistence("Model store lock poisoned".to_string())
    }
}

impl ModelStore for MemoryModelStore {
    fn save(&self, key: &str, snapshot: &ModelSnapshot) -> Result<()> {
        validate_key(key)?;
        let document = serde_json::to_string(snapshot)?;
        self.entries
            .write()
            .map_err(|_| Self::poisoned())?
            .insert(key.to_string(), document);
        Ok(())
    }

    fn load(&self, key: &str) -> Result<ModelSnapshot> {
        validate_key(key)?;
        let entries = self.entries.read().map_err(|_| Self::poisoned())?;
        let document = entries.get(key).ok_or_else(|| missing(key))?;
        Ok(serde_json::from_str(document)?)
    }

    fn contains(&self, key: &str) -> bool {
        self.entries
            .read()
            .map(|entries| entries.contains_key(key))
            .unwrap_or(false)
    }

    fn remove(&self, key: &str) -> Result<bool> {
        validate_key(key)?;
        Ok(self
            .entries
            .write()
            .map_err(|_| Self::poisoned())?
            .remove(key)
            .is_some())
    }

    fn keys(&self) -> Result<Vec<String>> {
        let mut keys: Vec<String> = self
            .entries
            .read()
            .map_err(|_| Self::poisoned())?
            .keys()
            .cloned()
            .collect();
        keys.sort();
        Ok(keys)
    }
}
