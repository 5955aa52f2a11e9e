//! Geocoding: place names to coordinates and back.
//! Uses the OpenWeatherMap geocoding API with the same key as the forecast.

use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use tracing::instrument;

use crate::error::WeatherError;
use crate::provider::handle_response;
use crate::retry::{with_retry, RetryConfig};
use crate::types::Location;

const REQUEST_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Deserialize)]
struct GeoEntry {
    name: String,
    lat: f64,
    lon: f64,
    country: Option<String>,
    state: Option<String>,
}

impl From<GeoEntry> for Location {
    fn from(e: GeoEntry) -> Self {
        Location {
            latitude: e.lat,
            longitude: e.lon,
            name: Some(e.name),
            country: e.country,
            state: e.state,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Geocoder {
    client: Arc<Client>,
    api_key: String,
    base_url: String,
    retry: RetryConfig,
}

impl Geocoder {
    pub fn new(api_key: &str, base_url: &str) -> Result<Self, WeatherError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client: Arc::new(client),
            api_key: api_key.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            retry: RetryConfig::default(),
        })
    }

    pub fn with_retry_config(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Look up places matching `query` (e.g. "Paris" or "Paris,FR").
    #[instrument(skip(self), level = "info")]
    pub async fn search(&self, query: &str, limit: u8) -> Result<Vec<Location>, WeatherError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(WeatherError::LocationNotFound(String::new()));
        }

        let url = format!("{}/geo/1.0/direct", self.base_url);
        let params = [
            ("q", query.to_string()),
            ("limit", limit.max(1).to_string()),
            ("appid", self.api_key.clone()),
        ];
        let response =
            with_retry(&self.retry, || self.client.get(&url).query(&params).send()).await?;

        let entries: Vec<GeoEntry> = handle_response(response).await?;
        Ok(entries.into_iter().map(Location::from).collect())
    }

    /// Best match for `query`, or `LocationNotFound`.
    pub async fn resolve(&self, query: &str) -> Result<Location, WeatherError> {
        let location = self
            .search(query, 1)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| WeatherError::LocationNotFound(query.to_string()))?;

        tracing::info!("Resolved \"{}\" to {}", query, location.display_label());
        Ok(location)
    }

    /// Reverse geocode coordinates to a human-readable label (e.g. "Seattle, Washington").
    /// Returns `None` on failure; the caller can fall back to coordinates.
    pub async fn reverse(&self, location: &Location) -> Option<String> {
        if location.name.is_some() {
            return Some(location.display_label());
        }

        let url = format!("{}/geo/1.0/reverse", self.base_url);
        let params = [
            ("lat", location.latitude.to_string()),
            ("lon", location.longitude.to_string()),
            ("limit", "1".to_string()),
            ("appid", self.api_key.clone()),
        ];
        let response = match with_retry(&self.retry, || {
            self.client.get(&url).query(&params).send()
        })
        .await
        {
            Ok(r) => r,
            Err(e) => {
                tracing::debug!("Reverse geocode request failed: {}", e);
                return None;
            }
        };

        let entries: Vec<GeoEntry> = match handle_response(response).await {
            Ok(entries) => entries,
            Err(e) => {
                tracing::debug!("Reverse geocode failed: {}", e);
                return None;
            }
        };

        let label = entries
            .into_iter()
            .next()
            .map(|e| Location::from(e).display_label())?;

        tracing::info!("Reverse geocoded to: {}", label);
        Some(label)
    }
}
