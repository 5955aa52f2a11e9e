use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use url::Url;

use crate::error::ConfigError;

/// Environment variable consulted for the weather API key when the config file has none
pub const API_KEY_ENV: &str = "OPENWEATHER_API_KEY";

/// Configuration validation errors
#[derive(Debug, Clone)]
pub struct ConfigValidationError {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Result of config validation
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationResult {
    /// Returns true if there are no errors (warnings are OK)
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Add an error
    pub fn add_error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Add a warning
    pub fn add_warning(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Get a user-friendly message summarizing all errors
    pub fn error_summary(&self) -> String {
        if self.errors.is_empty() {
            return String::new();
        }
        self.errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Application configuration directory (also holds the forecast cache)
    pub config_dir: PathBuf,

    /// Weather settings
    #[serde(default)]
    pub weather: WeatherConfig,
}

/// Temperature unit preference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TemperatureUnit {
    #[default]
    Auto,
    Celsius,
    Fahrenheit,
}

impl TemperatureUnit {
    /// Convert a Celsius value into this unit. `Auto` stays metric.
    pub fn from_celsius(&self, celsius: f64) -> f64 {
        match self {
            Self::Fahrenheit => celsius * 1.8 + 32.0,
            Self::Auto | Self::Celsius => celsius,
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Fahrenheit => "°F",
            Self::Auto | Self::Celsius => "°C",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherConfig {
    /// Base URL of the OpenWeatherMap-compatible API
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// API key; falls back to the OPENWEATHER_API_KEY environment variable
    #[serde(default)]
    pub api_key: Option<String>,

    /// Temperature unit preference
    #[serde(default)]
    pub temperature_unit: TemperatureUnit,

    /// Refresh interval in minutes (also the cache freshness window)
    #[serde(default = "default_refresh_minutes")]
    pub refresh_minutes: u32,

    /// Place name used when none is given on the command line
    #[serde(default)]
    pub default_location: Option<String>,

    /// Fixed coordinates, used when no place name is available
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
}

fn default_api_base_url() -> String {
    "https://api.openweathermap.org".to_string()
}

fn default_refresh_minutes() -> u32 {
    15
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            api_key: None,
            temperature_unit: TemperatureUnit::Auto,
            refresh_minutes: default_refresh_minutes(),
            default_location: None,
            latitude: None,
            longitude: None,
        }
    }
}

impl WeatherConfig {
    /// The configured API key, or the one from the environment.
    ///
    /// The environment is read on demand; it never ends up in the saved file.
    pub fn effective_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .or_else(|| std::env::var(API_KEY_ENV).ok())
            .filter(|k| !k.trim().is_empty())
    }

    /// Both coordinates, if both are configured.
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        self.latitude.zip(self.longitude)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            config_dir: default_config_dir(),
            weather: WeatherConfig::default(),
        }
    }
}

fn default_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("skycast")
}

impl Config {
    /// Load configuration from file, creating default if it doesn't exist
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load configuration from an explicit path, creating default if it doesn't exist
    pub fn load_from(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            let mut config = Self::default();
            if let Some(parent) = config_path.parent() {
                config.config_dir = parent.to_path_buf();
            }
            config.save_to(config_path)?;
            return Ok(config);
        }

        let contents =
            std::fs::read_to_string(config_path).context("Failed to read config file")?;

        let config: Config = toml::from_str(&contents).context("Failed to parse config file")?;

        Ok(config)
    }

    /// Load configuration and validate it
    ///
    /// Returns the config along with any validation warnings.
    /// Returns an error if validation fails with critical errors.
    /// Validation failures are reported as `ConfigError::Invalid`.
    pub fn load_validated() -> Result<(Self, ValidationResult)> {
        Self::load_validated_from(&Self::config_path()?)
    }

    /// Same as `load_validated`, for an explicit path
    pub fn load_validated_from(config_path: &Path) -> Result<(Self, ValidationResult)> {
        let config = Self::load_from(config_path)?;
        let validation = config.validate();

        if !validation.is_valid() {
            return Err(ConfigError::Invalid(validation.error_summary()).into());
        }

        for warning in &validation.warnings {
            tracing::warn!("Config warning: {}", warning);
        }

        Ok((config, validation))
    }

    /// Validate the configuration
    ///
    /// Returns a ValidationResult containing any errors or warnings.
    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();

        self.validate_url(
            &self.weather.api_base_url,
            "weather.api_base_url",
            &mut result,
        );

        if self.weather.effective_api_key().is_none() {
            result.add_error(
                "weather.api_key",
                format!("No API key configured (set it here or via {})", API_KEY_ENV),
            );
        }

        if self.weather.refresh_minutes == 0 {
            result.add_warning(
                "weather.refresh_minutes",
                "Weather refresh disabled (0 minutes)",
            );
        } else if self.weather.refresh_minutes > 1440 {
            result.add_warning(
                "weather.refresh_minutes",
                "Weather refresh interval is more than 24 hours",
            );
        }

        if let Some(lat) = self.weather.latitude {
            if !(-90.0..=90.0).contains(&lat) {
                result.add_error("weather.latitude", "Latitude must be within -90..=90");
            }
        }
        if let Some(lon) = self.weather.longitude {
            if !(-180.0..=180.0).contains(&lon) {
                result.add_error("weather.longitude", "Longitude must be within -180..=180");
            }
        }
        if self.weather.latitude.is_some() != self.weather.longitude.is_some() {
            result.add_warning(
                "weather.latitude",
                "Only one coordinate configured; both are needed",
            );
        }

        result
    }

    /// Validate a URL field
    fn validate_url(&self, url_str: &str, field_name: &str, result: &mut ValidationResult) {
        match Url::parse(url_str) {
            Ok(url) => {
                if url.scheme() != "http" && url.scheme() != "https" {
                    result.add_error(
                        field_name,
                        format!("URL must use http or https scheme, got: {}", url.scheme()),
                    );
                }

                if url.host().is_none() {
                    result.add_error(field_name, "URL must have a host");
                }

                if let Some(port) = url.port() {
                    if port == 0 {
                        result.add_error(field_name, "Port cannot be 0");
                    }
                }
            }
            Err(e) => {
                result.add_error(field_name, format!("Invalid URL: {}", e));
            }
        }
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    /// Save configuration to an explicit path
    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        // Ensure config directory exists
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;

        std::fs::write(config_path, contents).context("Failed to write config file")?;

        Ok(())
    }

    /// Get the path to the configuration file
    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Failed to get config directory")?
            .join("skycast");

        Ok(config_dir.join("config.toml"))
    }
}
