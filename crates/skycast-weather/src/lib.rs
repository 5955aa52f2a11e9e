//! Weather service for Skycast
//!
//! Fetches 3-hour forecast samples and current conditions from an
//! OpenWeatherMap-compatible API, geocodes place names, and aggregates the
//! samples into the hourly and daily views shown to the user.

pub mod aggregate;
pub mod cache;
pub mod error;
pub mod geocode;
pub mod provider;
pub mod retry;
pub mod sun;
pub mod types;

pub use aggregate::aggregate;
pub use cache::WeatherCache;
pub use error::WeatherError;
pub use geocode::Geocoder;
pub use provider::WeatherProvider;
pub use sun::{sun_position, SunPosition};
pub use types::*;
