//! Weather-specific error types.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum WeatherError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("Invalid API key")]
    InvalidApiKey,

    #[error("Location not found: {0}")]
    LocationNotFound(String),

    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Cache error: {0}")]
    Cache(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl WeatherError {
    /// User-friendly error message for display.
    pub fn user_message(&self) -> String {
        match self {
            Self::Network(_) => "Unable to load weather. Check your connection.".to_string(),
            Self::Api { status, .. } if *status >= 500 => {
                "Weather service is having trouble. Please try again later.".to_string()
            }
            Self::Api { .. } => "Unable to load weather.".to_string(),
            Self::InvalidApiKey => "Weather API key is invalid. Check settings.".to_string(),
            Self::LocationNotFound(q) => format!("Could not find \"{}\"", q),
            Self::RateLimited(secs) => format!("Too many requests. Please wait {} seconds.", secs),
            Self::Parse(_) => "Received unreadable weather data.".to_string(),
            Self::Cache(_) | Self::Io(_) => "Local weather cache error".to_string(),
        }
    }

    /// Whether this error is retryable.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::RateLimited(_) | Self::Network(_) => true,
            Self::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }
}
