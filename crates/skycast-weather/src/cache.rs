//! On-disk copy of the last fetched forecast, used when the network is unavailable.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};

use crate::error::WeatherError;
use crate::types::ForecastPayload;

const CACHE_FILE: &str = "weather_cache.json";

#[derive(Debug)]
pub struct WeatherCache {
    cache_path: PathBuf,
    data: Option<ForecastPayload>,
}

impl WeatherCache {
    pub fn new(config_dir: &Path) -> Self {
        Self {
            cache_path: config_dir.join(CACHE_FILE),
            data: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.cache_path
    }

    /// Read the cached payload. A missing file is not an error.
    pub fn load(&mut self) -> Result<Option<&ForecastPayload>, WeatherError> {
        if self.data.is_none() {
            if !self.cache_path.exists() {
                return Ok(None);
            }

            let contents = std::fs::read_to_string(&self.cache_path)?;
            let payload: ForecastPayload = serde_json::from_str(&contents)
                .map_err(|e| WeatherError::Cache(format!("corrupt cache file: {}", e)))?;
            tracing::debug!(
                "Loaded cached forecast for {} from {}",
                payload.location_name,
                payload.fetched_at
            );
            self.data = Some(payload);
        }

        Ok(self.data.as_ref())
    }

    pub fn store(&mut self, payload: &ForecastPayload) -> Result<(), WeatherError> {
        if let Some(parent) = self.cache_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string(payload)
            .map_err(|e| WeatherError::Cache(e.to_string()))?;
        std::fs::write(&self.cache_path, json)?;

        self.data = Some(payload.clone());
        Ok(())
    }

    pub fn clear(&mut self) -> Result<(), WeatherError> {
        self.data = None;
        match std::fs::remove_file(&self.cache_path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Whether a payload fetched at `payload.fetched_at` is younger than `max_age_minutes`.
    pub fn is_fresh(payload: &ForecastPayload, now: DateTime<Utc>, max_age_minutes: u32) -> bool {
        let max_age = Duration::minutes(i64::from(max_age_minutes));
        now.signed_duration_since(payload.fetched_at) < max_age
    }
}
