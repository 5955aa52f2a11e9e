//! Weather backend: async forecast fetching.
//! Network work runs on the tokio runtime; results are sent back via mpsc.

use std::sync::mpsc::Sender;
use std::sync::Arc;

use chrono::Utc;
use skycast_core::WeatherConfig;
use skycast_weather::provider::forecast_from_payload;
use skycast_weather::{
    sun_position, ForecastPayload, ForecastResult, Location, SunPosition, WeatherCache,
};
use tokio::runtime::Handle;

use crate::app::App;

/// Error type for weather operations
#[derive(Debug, Clone, thiserror::Error)]
pub enum WeatherError {
    #[error("Weather request timed out")]
    Timeout,
    #[error("Connection failed: {0}")]
    Connection(String),
    #[error("Weather error: {0}")]
    Request(String),
    #[error("Weather API error: {status} - {message}")]
    Server { status: u16, message: String },
    #[error("Weather service unavailable: {0}")]
    Unavailable(String),
    #[error("Invalid weather response: {0}")]
    InvalidResponse(String),
    #[error("Location error: {0}")]
    Location(String),
    #[error("Weather API key rejected")]
    InvalidApiKey,
    #[error("No forecast data available")]
    NoData,
    #[error("Cache error: {0}")]
    Cache(String),
}

impl From<skycast_weather::WeatherError> for WeatherError {
    fn from(e: skycast_weather::WeatherError) -> Self {
        use skycast_weather::WeatherError as Upstream;
        match e {
            Upstream::Network(e) if e.is_timeout() => WeatherError::Timeout,
            Upstream::Network(e) if e.is_connect() => WeatherError::Connection(e.to_string()),
            Upstream::Network(e) => WeatherError::Request(e.to_string()),
            Upstream::Api { status, message } if status >= 500 => {
                WeatherError::Unavailable(format!("{} {}", status, message))
            }
            Upstream::Api { status, message } => WeatherError::Server { status, message },
            Upstream::RateLimited(secs) => {
                WeatherError::Unavailable(format!("rate limited for {}s", secs))
            }
            Upstream::Parse(s) => WeatherError::InvalidResponse(s),
            Upstream::InvalidApiKey => WeatherError::InvalidApiKey,
            Upstream::LocationNotFound(q) => WeatherError::Location(q),
            Upstream::Cache(s) => WeatherError::Cache(s),
            Upstream::Io(io) => WeatherError::Cache(io.to_string()),
        }
    }
}

/// Where to get weather for
#[derive(Debug, Clone, PartialEq)]
pub enum LocationQuery {
    Place(String),
    Coordinates { latitude: f64, longitude: f64 },
}

impl LocationQuery {
    /// Command-line place first, then the configured place, then configured coordinates.
    pub fn pick(arg: Option<String>, config: &WeatherConfig) -> Option<Self> {
        arg.filter(|a| !a.trim().is_empty())
            .or_else(|| config.default_location.clone())
            .map(LocationQuery::Place)
            .or_else(|| {
                config
                    .coordinates()
                    .map(|(latitude, longitude)| LocationQuery::Coordinates { latitude, longitude })
            })
    }
}

/// Everything the CLI renders for one location
#[derive(Debug, Clone)]
pub struct WeatherReport {
    pub forecast: ForecastResult,
    pub sun: Option<SunPosition>,
    /// Set when the network failed and the last cached forecast was used
    pub from_cache: bool,
    /// Cached forecast older than the refresh interval
    pub stale: bool,
}

/// Messages sent from async operations back to the caller's thread
#[derive(Debug)]
pub enum WeatherServiceMessage {
    /// Result of fetching weather data
    FetchDone(Result<WeatherReport, WeatherError>),
}

/// Request weather for `query` asynchronously.
/// Sends `FetchDone` on the channel when complete.
pub fn request_fetch(
    tx: &Sender<WeatherServiceMessage>,
    runtime: &Handle,
    app: Arc<App>,
    query: LocationQuery,
) {
    let tx = tx.clone();

    runtime.spawn(async move {
        let result = fetch_report(&app, query).await;
        if tx.send(WeatherServiceMessage::FetchDone(result)).is_err() {
            tracing::debug!("Weather result dropped: receiver gone");
        }
    });
}

async fn fetch_report(app: &App, query: LocationQuery) -> Result<WeatherReport, WeatherError> {
    let location = match query {
        LocationQuery::Place(name) => app.geocoder().resolve(&name).await?,
        LocationQuery::Coordinates {
            latitude,
            longitude,
        } => {
            let mut location = Location::from_coordinates(latitude, longitude);
            location.name = app.geocoder().reverse(&location).await;
            location
        }
    };
    tracing::info!(
        "Fetching weather for {}, {}",
        location.latitude,
        location.longitude
    );

    let (payload, from_cache) = match app.provider().fetch_forecast(&location).await {
        Ok(payload) => {
            store_cached(app, &payload);
            (payload, false)
        }
        Err(e) if e.is_retryable() => {
            tracing::warn!("Forecast fetch failed, trying cache: {}", e);
            match load_cached(app, &location) {
                Some(payload) => (payload, true),
                None => return Err(e.into()),
            }
        }
        Err(e) => return Err(e.into()),
    };
    let stale = from_cache
        && !WeatherCache::is_fresh(&payload, Utc::now(), app.config().weather.refresh_minutes);

    let now = Utc::now().timestamp();
    let forecast = forecast_from_payload(&payload, &location, now).ok_or(WeatherError::NoData)?;

    let sun = if from_cache {
        None
    } else {
        match app.provider().fetch_current(&location).await {
            Ok(current) => Some(sun_position(
                current.sunrise_utc,
                current.sunset_utc,
                now,
                current.utc_offset_secs,
            )),
            Err(e) => {
                tracing::warn!("Current conditions unavailable: {}", e);
                None
            }
        }
    };

    Ok(WeatherReport {
        forecast,
        sun,
        from_cache,
        stale,
    })
}

fn store_cached(app: &App, payload: &ForecastPayload) {
    let cache = app.cache();
    let Ok(mut cache) = cache.lock() else {
        tracing::error!("Weather cache lock poisoned");
        return;
    };
    if let Err(e) = cache.store(payload) {
        tracing::warn!("Failed to cache forecast: {}", e);
    }
}

/// The cached payload, if it was fetched for the same place.
fn load_cached(app: &App, location: &Location) -> Option<ForecastPayload> {
    let cache = app.cache();
    let mut cache = cache.lock().ok()?;
    let payload = match cache.load() {
        Ok(payload) => payload?.clone(),
        Err(e) => {
            tracing::warn!("Ignoring unreadable weather cache: {}", e);
            return None;
        }
    };

    if !payload.is_for(location) {
        tracing::info!(
            "Cached forecast is for {}, not {}",
            payload.location_name,
            location.display_label()
        );
        return None;
    }

    tracing::info!("Using cached forecast from {}", payload.fetched_at);
    Some(payload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use skycast_core::Config;
    use skycast_weather::RawSample;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const LIMA: (f64, f64) = (-12.05, -77.04);
    const OSLO: (f64, f64) = (59.91, 10.75);

    fn test_app(server: &MockServer, dir: &tempfile::TempDir) -> App {
        let config = Config {
            config_dir: dir.path().to_path_buf(),
            weather: WeatherConfig {
                api_base_url: server.uri(),
                api_key: Some("key".to_string()),
                ..WeatherConfig::default()
            },
        };
        App::new(config).unwrap()
    }

    async fn mount_lima_geocode(server: &MockServer) {
        let (lat, lon) = LIMA;
        Mock::given(method("GET"))
            .and(path("/geo/1.0/direct"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {"name": "Lima", "lat": lat, "lon": lon, "country": "PE"}
            ])))
            .mount(server)
            .await;
    }

    fn saved_payload(place: &str, (lat, lon): (f64, f64), age: Duration) -> ForecastPayload {
        let now = Utc::now();
        ForecastPayload {
            samples: vec![RawSample {
                timestamp_utc: now.timestamp() + 3600,
                temperature_c: -20.0,
                feels_like_c: -25.0,
                humidity_pct: Some(80),
                wind_speed_ms: Some(4.0),
                wind_gust_ms: None,
                condition_code: 600,
                condition_text: format!("{} snow", place),
            }],
            utc_offset_secs: 0,
            location_name: place.to_string(),
            latitude: lat,
            longitude: lon,
            fetched_at: now - age,
        }
    }

    fn seed_cache(app: &App, payload: &ForecastPayload) {
        app.cache().lock().unwrap().store(payload).unwrap();
    }

    #[test]
    fn weather_error_display() {
        assert!(format!("{}", WeatherError::Request("timeout".into())).contains("Weather"));
        assert!(format!("{}", WeatherError::Location("failed".into())).contains("Location"));
        assert!(format!("{}", WeatherError::NoData).contains("No forecast"));
    }

    #[test]
    fn upstream_errors_are_classified() {
        let e: WeatherError = skycast_weather::WeatherError::InvalidApiKey.into();
        assert!(matches!(e, WeatherError::InvalidApiKey));

        let e: WeatherError = skycast_weather::WeatherError::LocationNotFound("Nope".into()).into();
        assert!(matches!(e, WeatherError::Location(q) if q == "Nope"));

        let e: WeatherError = skycast_weather::WeatherError::RateLimited(5).into();
        assert!(matches!(e, WeatherError::Unavailable(_)));

        let e: WeatherError = skycast_weather::WeatherError::Api {
            status: 400,
            message: "bad query".into(),
        }
        .into();
        assert!(matches!(e, WeatherError::Server { status: 400, .. }));

        let e: WeatherError = skycast_weather::WeatherError::Parse("eof".into()).into();
        assert!(matches!(e, WeatherError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn refused_connection_is_a_connection_error() {
        let geocoder = skycast_weather::Geocoder::new("key", "http://127.0.0.1:9")
            .unwrap()
            .with_retry_config(skycast_weather::retry::RetryConfig::none());

        let e: WeatherError = geocoder.search("Lima", 1).await.unwrap_err().into();
        assert!(matches!(e, WeatherError::Connection(_)));
    }

    #[test]
    fn location_query_precedence() {
        let mut config = WeatherConfig::default();
        assert_eq!(LocationQuery::pick(None, &config), None);

        config.latitude = Some(1.0);
        config.longitude = Some(2.0);
        assert_eq!(
            LocationQuery::pick(None, &config),
            Some(LocationQuery::Coordinates {
                latitude: 1.0,
                longitude: 2.0
            })
        );

        config.default_location = Some("Quito".into());
        assert_eq!(
            LocationQuery::pick(Some(" ".into()), &config),
            Some(LocationQuery::Place("Quito".into()))
        );
        assert_eq!(
            LocationQuery::pick(Some("Lima".into()), &config),
            Some(LocationQuery::Place("Lima".into()))
        );
    }

    #[tokio::test]
    async fn fresh_fetch_is_cached_and_has_sun() {
        let mock_server = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();
        mount_lima_geocode(&mock_server).await;

        let now = Utc::now().timestamp();
        Mock::given(method("GET"))
            .and(path("/data/2.5/forecast"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "list": [{
                    "dt": now + 3600,
                    "main": {"temp": 21.0, "feels_like": 20.0, "humidity": 60},
                    "weather": [{"id": 800, "description": "clear sky"}],
                    "wind": {"speed": 3.0}
                }],
                "city": {"name": "Lima", "timezone": -18000}
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        Mock::given(method("GET"))
            .and(path("/data/2.5/weather"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "dt": now,
                "main": {"temp": 21.0},
                "weather": [{"id": 800, "description": "clear sky"}],
                "sys": {"sunrise": now - 3600, "sunset": now + 3600},
                "timezone": -18000,
                "name": "Lima"
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let app = test_app(&mock_server, &dir);
        let report = fetch_report(&app, LocationQuery::Place("Lima".into()))
            .await
            .unwrap();

        assert!(!report.from_cache);
        assert!(!report.stale);
        assert_eq!(report.forecast.location_label, "Lima, PE");
        assert_eq!(report.forecast.hourly[0].temp_c, 21);
        let sun = report.sun.unwrap();
        assert!(sun.is_daytime);

        let mut cache = WeatherCache::new(dir.path());
        let cached = cache.load().unwrap().unwrap();
        assert!(cached.is_for(&Location::from_coordinates(LIMA.0, LIMA.1)));
    }

    #[tokio::test]
    async fn server_error_falls_back_to_cache_for_same_place() {
        let mock_server = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();
        mount_lima_geocode(&mock_server).await;

        Mock::given(method("GET"))
            .and(path("/data/2.5/forecast"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&mock_server)
            .await;

        Mock::given(method("GET"))
            .and(path("/data/2.5/weather"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&mock_server)
            .await;

        let app = test_app(&mock_server, &dir);
        seed_cache(&app, &saved_payload("lima", LIMA, Duration::minutes(5)));

        let report = fetch_report(&app, LocationQuery::Place("Lima".into()))
            .await
            .unwrap();

        assert!(report.from_cache);
        assert!(!report.stale);
        assert!(report.sun.is_none());
        assert_eq!(report.forecast.location_label, "Lima, PE");
        assert_eq!(report.forecast.daily[0].dominant_condition_text, "lima snow");
    }

    #[tokio::test]
    async fn old_cached_forecast_is_marked_stale() {
        let mock_server = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();
        mount_lima_geocode(&mock_server).await;

        Mock::given(method("GET"))
            .and(path("/data/2.5/forecast"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&mock_server)
            .await;

        let app = test_app(&mock_server, &dir);
        seed_cache(&app, &saved_payload("lima", LIMA, Duration::hours(2)));

        let report = fetch_report(&app, LocationQuery::Place("Lima".into()))
            .await
            .unwrap();

        assert!(report.from_cache);
        assert!(report.stale);
    }

    #[tokio::test]
    async fn cache_for_another_place_is_not_used() {
        let mock_server = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();
        mount_lima_geocode(&mock_server).await;

        Mock::given(method("GET"))
            .and(path("/data/2.5/forecast"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&mock_server)
            .await;

        let app = test_app(&mock_server, &dir);
        seed_cache(&app, &saved_payload("oslo", OSLO, Duration::minutes(5)));

        let result = fetch_report(&app, LocationQuery::Place("Lima".into())).await;

        assert!(matches!(result, Err(WeatherError::Unavailable(_))));
    }

    #[tokio::test]
    async fn server_error_without_cache_fails() {
        let mock_server = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();
        mount_lima_geocode(&mock_server).await;

        Mock::given(method("GET"))
            .and(path("/data/2.5/forecast"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&mock_server)
            .await;

        let app = test_app(&mock_server, &dir);
        let result = fetch_report(&app, LocationQuery::Place("Lima".into())).await;

        assert!(matches!(result, Err(WeatherError::Unavailable(_))));
    }

    #[tokio::test]
    async fn rejected_key_does_not_fall_back_to_cache() {
        let mock_server = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();
        mount_lima_geocode(&mock_server).await;

        Mock::given(method("GET"))
            .and(path("/data/2.5/forecast"))
            .respond_with(ResponseTemplate::new(401))
            .expect(1)
            .mount(&mock_server)
            .await;

        let app = test_app(&mock_server, &dir);
        seed_cache(&app, &saved_payload("lima", LIMA, Duration::minutes(5)));

        let result = fetch_report(&app, LocationQuery::Place("Lima".into())).await;

        assert!(matches!(result, Err(WeatherError::InvalidApiKey)));
    }
}
