use crate::weather_service::WeatherError as ServiceWeatherError;
use skycast_core::{AppError, NetworkError, WeatherError};

impl From<ServiceWeatherError> for AppError {
    fn from(e: ServiceWeatherError) -> Self {
        match e {
            ServiceWeatherError::Timeout => AppError::Network(NetworkError::Timeout),
            ServiceWeatherError::Connection(s) => {
                AppError::Network(NetworkError::ConnectionFailed(s))
            }
            ServiceWeatherError::Request(s) => AppError::Weather(WeatherError::ApiError(s)),
            ServiceWeatherError::Server { status, message } => {
                AppError::Network(NetworkError::ServerError { status, message })
            }
            ServiceWeatherError::Unavailable(_) => {
                AppError::Weather(WeatherError::ServiceUnavailable)
            }
            ServiceWeatherError::InvalidResponse(s) => {
                AppError::Network(NetworkError::InvalidResponse(s))
            }
            ServiceWeatherError::Location(s) => {
                AppError::Weather(WeatherError::LocationNotFound(s))
            }
            ServiceWeatherError::InvalidApiKey => AppError::Weather(WeatherError::InvalidApiKey),
            ServiceWeatherError::NoData => AppError::Weather(WeatherError::NoData),
            ServiceWeatherError::Cache(s) => AppError::Weather(WeatherError::CacheError(s)),
        }
    }
}
