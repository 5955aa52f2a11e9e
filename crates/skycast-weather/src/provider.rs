//! OpenWeatherMap-compatible forecast and current-conditions client.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use tracing::instrument;

use crate::aggregate::aggregate;
use crate::error::WeatherError;
use crate::retry::{with_retry, RetryConfig};
use crate::types::{CurrentConditions, ForecastPayload, ForecastResult, Location, RawSample};

const REQUEST_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    #[serde(default)]
    list: Vec<ForecastEntry>,
    city: Option<CityInfo>,
}

#[derive(Debug, Deserialize)]
struct ForecastEntry {
    dt: Option<i64>,
    main: Option<MainBlock>,
    #[serde(default)]
    weather: Vec<ConditionBlock>,
    wind: Option<WindBlock>,
}

#[derive(Debug, Deserialize)]
struct CityInfo {
    name: Option<String>,
    timezone: Option<i32>,
}

// Numbers are kept as raw JSON so that one bad value only costs its sample.
#[derive(Debug, Deserialize)]
struct MainBlock {
    temp: Option<Value>,
    feels_like: Option<Value>,
    humidity: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct ConditionBlock {
    #[serde(default)]
    id: i32,
    #[serde(default)]
    description: String,
}

#[derive(Debug, Deserialize)]
struct WindBlock {
    speed: Option<Value>,
    gust: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct CurrentResponse {
    dt: i64,
    main: MainBlock,
    #[serde(default)]
    weather: Vec<ConditionBlock>,
    wind: Option<WindBlock>,
    sys: SunTimes,
    #[serde(default)]
    timezone: i32,
    #[serde(default)]
    name: String,
}

#[derive(Debug, Deserialize)]
struct SunTimes {
    sunrise: i64,
    sunset: i64,
}

/// Accepts numbers and numeric strings; anything else, or a non-finite value, is `None`.
fn lenient_f64(value: Option<&Value>) -> Option<f64> {
    let parsed = match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|v| v.is_finite())
}

fn lenient_humidity(value: Option<&Value>) -> Option<u8> {
    lenient_f64(value).map(|h| h.round().clamp(0.0, 100.0) as u8)
}

fn first_condition(blocks: &[ConditionBlock]) -> (i32, String) {
    blocks
        .first()
        .map(|c| (c.id, c.description.clone()))
        .unwrap_or_default()
}

impl ForecastEntry {
    /// Convert to a sample, or `None` when the timestamp or temperature is unusable.
    fn into_sample(self) -> Option<RawSample> {
        let Some(timestamp_utc) = self.dt else {
            tracing::debug!("Skipping forecast entry without timestamp");
            return None;
        };
        let main = self.main.as_ref();
        let Some(temperature_c) = lenient_f64(main.and_then(|m| m.temp.as_ref())) else {
            tracing::debug!(
                "Skipping forecast entry at {} with unparsable temperature",
                timestamp_utc
            );
            return None;
        };

        let feels_like_c =
            lenient_f64(main.and_then(|m| m.feels_like.as_ref())).unwrap_or(temperature_c);
        let humidity_pct = lenient_humidity(main.and_then(|m| m.humidity.as_ref()));
        let wind = self.wind.as_ref();
        let (condition_code, condition_text) = first_condition(&self.weather);

        Some(RawSample {
            timestamp_utc,
            temperature_c,
            feels_like_c,
            humidity_pct,
            wind_speed_ms: lenient_f64(wind.and_then(|w| w.speed.as_ref())),
            wind_gust_ms: lenient_f64(wind.and_then(|w| w.gust.as_ref())),
            condition_code,
            condition_text,
        })
    }
}

#[derive(Debug, Clone)]
pub struct WeatherProvider {
    client: Arc<Client>,
    api_key: String,
    base_url: String,
    retry: RetryConfig,
}

impl WeatherProvider {
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

    /// Fetch the 5-day / 3-hour forecast samples for a location.
    ///
    /// Entries without a timestamp or with an unparsable temperature are dropped.
    #[instrument(skip(self), level = "info")]
    pub async fn fetch_forecast(
        &self,
        location: &Location,
    ) -> Result<ForecastPayload, WeatherError> {
        let response: ForecastResponse = self.get_json("/data/2.5/forecast", location).await?;

        let total = response.list.len();
        let samples: Vec<RawSample> = response
            .list
            .into_iter()
            .filter_map(ForecastEntry::into_sample)
            .collect();

        if samples.len() < total {
            tracing::info!(
                "Dropped {} of {} malformed forecast entries",
                total - samples.len(),
                total
            );
        }

        let (location_name, utc_offset_secs) = response
            .city
            .map(|c| (c.name.unwrap_or_default(), c.timezone.unwrap_or(0)))
            .unwrap_or_default();

        Ok(ForecastPayload {
            samples,
            utc_offset_secs,
            location_name,
            latitude: location.latitude,
            longitude: location.longitude,
            fetched_at: Utc::now(),
        })
    }

    /// Fetch current conditions, including today's sunrise and sunset.
    #[instrument(skip(self), level = "info")]
    pub async fn fetch_current(
        &self,
        location: &Location,
    ) -> Result<CurrentConditions, WeatherError> {
        let response: CurrentResponse = self.get_json("/data/2.5/weather", location).await?;

        let temperature_c = lenient_f64(response.main.temp.as_ref())
            .ok_or_else(|| WeatherError::Parse("current temperature missing".to_string()))?;
        let wind = response.wind.as_ref();
        let (condition_code, condition_text) = first_condition(&response.weather);

        Ok(CurrentConditions {
            timestamp_utc: response.dt,
            temperature_c,
            feels_like_c: lenient_f64(response.main.feels_like.as_ref()).unwrap_or(temperature_c),
            humidity_pct: lenient_humidity(response.main.humidity.as_ref()).unwrap_or(0),
            wind_speed_ms: lenient_f64(wind.and_then(|w| w.speed.as_ref())).unwrap_or(0.0),
            condition_code,
            condition_text,
            sunrise_utc: response.sys.sunrise,
            sunset_utc: response.sys.sunset,
            utc_offset_secs: response.timezone,
            location_name: response.name,
        })
    }

    /// Fetch and aggregate in one step. `Ok(None)` means the provider had no samples.
    pub async fn forecast(
        &self,
        location: &Location,
        now_utc: i64,
    ) -> Result<Option<ForecastResult>, WeatherError> {
        let payload = self.fetch_forecast(location).await?;
        Ok(forecast_from_payload(&payload, location, now_utc))
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        location: &Location,
    ) -> Result<T, WeatherError> {
        let url = format!("{}{}", self.base_url, path);
        let query = [
            ("lat", location.latitude.to_string()),
            ("lon", location.longitude.to_string()),
            ("units", "metric".to_string()),
            ("appid", self.api_key.clone()),
        ];

        let response =
            with_retry(&self.retry, || self.client.get(&url).query(&query).send()).await?;
        handle_response(response).await
    }
}

/// Aggregate a fetched (or cached) payload and label it for display.
pub fn forecast_from_payload(
    payload: &ForecastPayload,
    location: &Location,
    now_utc: i64,
) -> Option<ForecastResult> {
    let label = if location.name.is_some() || payload.location_name.is_empty() {
        location.display_label()
    } else {
        payload.location_name.clone()
    };

    aggregate(&payload.samples, payload.utc_offset_secs, now_utc)
        .map(|result| result.with_location_label(label))
}

/// Map the HTTP status to our error type and decode successful bodies.
pub(crate) async fn handle_response<T: DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, WeatherError> {
    let status = response.status();

    if status.is_success() {
        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|e| WeatherError::Parse(e.to_string()))
    } else if status.as_u16() == 401 {
        Err(WeatherError::InvalidApiKey)
    } else if status.as_u16() == 404 {
        let text = response.text().await.unwrap_or_default();
        Err(WeatherError::LocationNotFound(text))
    } else if status.as_u16() == 429 {
        let retry_after = response
            .headers()
            .get("Retry-After")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse().ok())
            .unwrap_or(60);
        Err(WeatherError::RateLimited(retry_after))
    } else {
        let text = response.text().await.unwrap_or_default();
        Err(WeatherError::Api {
            status: status.as_u16(),
            message: text,
        })
    }
}
