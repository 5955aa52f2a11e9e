use std::sync::{Arc, Mutex};

use skycast_core::{AppError, Config, ConfigError};
use skycast_weather::{Geocoder, WeatherCache, WeatherProvider};

/// Application context: configuration plus the clients built from it.
///
/// Passed explicitly to whatever needs it; there is no global state.
pub struct App {
    config: Arc<Config>,
    provider: Arc<WeatherProvider>,
    geocoder: Arc<Geocoder>,
    cache: Arc<Mutex<WeatherCache>>,
}

impl App {
    /// Create a new application instance from a loaded configuration
    pub fn new(config: Config) -> Result<Self, AppError> {
        let api_key = config
            .weather
            .effective_api_key()
            .ok_or_else(|| ConfigError::MissingSetting("weather.api_key".to_string()))?;

        let base_url = &config.weather.api_base_url;
        let provider = WeatherProvider::new(&api_key, base_url)
            .map_err(|e| AppError::Other(anyhow::Error::new(e)))?;
        let geocoder = Geocoder::new(&api_key, base_url)
            .map_err(|e| AppError::Other(anyhow::Error::new(e)))?;
        let cache = WeatherCache::new(&config.config_dir);

        tracing::info!(
            "Weather client ready for {} (cache at {})",
            config.weather.api_base_url,
            cache.path().display()
        );

        Ok(Self {
            config: Arc::new(config),
            provider: Arc::new(provider),
            geocoder: Arc::new(geocoder),
            cache: Arc::new(Mutex::new(cache)),
        })
    }

    /// Get reference to application config
    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn provider(&self) -> Arc<WeatherProvider> {
        self.provider.clone()
    }

    pub fn geocoder(&self) -> Arc<Geocoder> {
        self.geocoder.clone()
    }

    pub fn cache(&self) -> Arc<Mutex<WeatherCache>> {
        self.cache.clone()
    }

    /// Shutdown the application
    pub fn shutdown(&self) {
        tracing::info!("Shutting down application");
    }
}
