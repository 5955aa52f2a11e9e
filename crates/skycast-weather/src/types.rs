use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Weather condition categories mapped from provider condition codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum WeatherCondition {
    #[default]
    Clear,
    PartlyCloudy,
    Cloudy,
    Fog,
    Drizzle,
    Rain,
    Snow,
    Sleet,
    Thunderstorm,
}

impl WeatherCondition {
    /// Convert an OpenWeatherMap condition code to a WeatherCondition
    /// See: https://openweathermap.org/weather-conditions
    pub fn from_code(code: i32) -> Self {
        match code {
            200..=299 => Self::Thunderstorm,
            300..=399 => Self::Drizzle,
            511 => Self::Sleet, // Freezing rain
            500..=599 => Self::Rain,
            611..=616 => Self::Sleet,
            600..=699 => Self::Snow,
            700..=799 => Self::Fog, // Mist, haze, dust, fog
            800 => Self::Clear,
            801 | 802 => Self::PartlyCloudy,
            803 | 804 => Self::Cloudy,
            _ => Self::Clear, // Unknown codes default to clear
        }
    }

    /// Get a human-readable description
    pub fn description(&self) -> &'static str {
        match self {
            Self::Clear => "Clear",
            Self::PartlyCloudy => "Partly Cloudy",
            Self::Cloudy => "Cloudy",
            Self::Fog => "Fog",
            Self::Drizzle => "Drizzle",
            Self::Rain => "Rain",
            Self::Snow => "Snow",
            Self::Sleet => "Sleet",
            Self::Thunderstorm => "Thunderstorm",
        }
    }

    /// Get icon name
    pub fn icon_name(&self) -> &'static str {
        match self {
            Self::Clear => "sun",
            Self::PartlyCloudy => "cloud_sun",
            Self::Cloudy => "cloud",
            Self::Fog => "cloud_fog",
            Self::Drizzle | Self::Rain => "cloud_rain",
            Self::Snow | Self::Sleet => "cloud_snow",
            Self::Thunderstorm => "cloud_lightning",
        }
    }
}

/// Geographic location
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
    pub name: Option<String>,
    pub country: Option<String>,
    pub state: Option<String>,
}

impl Location {
    pub fn from_coordinates(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            name: None,
            country: None,
            state: None,
        }
    }

    /// Label for display: "Name, State", "Name, Country", "Name" or raw coordinates.
    pub fn display_label(&self) -> String {
        let Some(name) = self.name.as_deref().filter(|n| !n.is_empty()) else {
            return format!("{:.4}, {:.4}", self.latitude, self.longitude);
        };

        let suffix = self
            .state
            .as_deref()
            .filter(|s| !s.is_empty() && *s != name)
            .or_else(|| {
                self.country
                    .as_deref()
                    .filter(|c| !c.is_empty() && *c != name)
            });

        match suffix {
            Some(s) => format!("{}, {}", name, s),
            None => name.to_string(),
        }
    }
}

/// One provider sample at 3-hour granularity.
///
/// `temperature_c` is NaN when the provider value could not be parsed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawSample {
    pub timestamp_utc: i64,
    pub temperature_c: f64,
    pub feels_like_c: f64,
    pub humidity_pct: Option<u8>,
    pub wind_speed_ms: Option<f64>,
    pub wind_gust_ms: Option<f64>,
    pub condition_code: i32,
    #[serde(default)]
    pub condition_text: String,
}

impl RawSample {
    pub fn condition(&self) -> WeatherCondition {
        WeatherCondition::from_code(self.condition_code)
    }
}

/// Entry of the next-24-hours view
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HourlyPoint {
    pub timestamp_utc: i64,
    pub label: String,
    pub temp_c: i32,
    pub feels_like_c: i32,
    pub humidity_pct: u8,
    pub wind_speed_ms: f64,
    pub wind_gust_ms: f64,
    pub condition_code: i32,
    pub condition_text: String,
}

impl HourlyPoint {
    pub fn condition(&self) -> WeatherCondition {
        WeatherCondition::from_code(self.condition_code)
    }
}

/// Entry of the next-5-days view
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyPoint {
    pub day_label: String,
    pub low_c: i32,
    pub high_c: i32,
    pub dominant_condition_code: i32,
    pub dominant_condition_text: String,
    pub max_wind_ms: f64,
    pub max_gust_ms: f64,
}

impl DailyPoint {
    pub fn condition(&self) -> WeatherCondition {
        WeatherCondition::from_code(self.dominant_condition_code)
    }
}

/// Hourly and daily views derived from one set of samples
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastResult {
    pub location_label: String,
    pub hourly: Vec<HourlyPoint>,
    pub daily: Vec<DailyPoint>,
}

impl ForecastResult {
    pub fn with_location_label(self, label: impl Into<String>) -> Self {
        Self {
            location_label: label.into(),
            ..self
        }
    }
}

/// Current conditions, including the sun times used for the sun-position view
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentConditions {
    pub timestamp_utc: i64,
    pub temperature_c: f64,
    pub feels_like_c: f64,
    pub humidity_pct: u8,
    pub wind_speed_ms: f64,
    pub condition_code: i32,
    pub condition_text: String,
    pub sunrise_utc: i64,
    pub sunset_utc: i64,
    pub utc_offset_secs: i32,
    pub location_name: String,
}

impl CurrentConditions {
    pub fn condition(&self) -> WeatherCondition {
        WeatherCondition::from_code(self.condition_code)
    }
}

/// Coordinates closer than this (in degrees, both axes) count as the same place.
const SAME_PLACE_TOLERANCE_DEG: f64 = 0.01;

/// Forecast samples as returned by the provider; this is also what gets cached
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastPayload {
    pub samples: Vec<RawSample>,
    pub utc_offset_secs: i32,
    pub location_name: String,
    /// Coordinates the samples were requested for
    pub latitude: f64,
    pub longitude: f64,
    pub fetched_at: DateTime<Utc>,
}

impl ForecastPayload {
    /// Whether these samples were fetched for `location`.
    pub fn is_for(&self, location: &Location) -> bool {
        (self.latitude - location.latitude).abs() < SAME_PLACE_TOLERANCE_DEG
            && (self.longitude - location.longitude).abs() < SAME_PLACE_TOLERANCE_DEG
    }
}
