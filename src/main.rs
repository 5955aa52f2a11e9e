mod app;
mod error_mapping;
mod render;
mod weather_service;

use std::process::ExitCode;
use std::sync::mpsc;
use std::sync::Arc;

use skycast_core::{AppError, Config, ConfigError};

use crate::app::App;
use crate::weather_service::{LocationQuery, WeatherServiceMessage};

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("Skycast failed: {}", e);
            eprintln!("{}", e.user_message());
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), AppError> {
    // Initialize core
    skycast_core::init()?;

    let (config, _warnings) = Config::load_validated()?;
    let unit = config.weather.temperature_unit;

    let query = LocationQuery::pick(std::env::args().nth(1), &config.weather).ok_or_else(|| {
        ConfigError::MissingSetting(
            "location: pass a place name or set weather.default_location".to_string(),
        )
    })?;

    let runtime = tokio::runtime::Runtime::new()?;
    let app = Arc::new(App::new(config)?);

    tracing::info!("Skycast started");

    let (tx, rx) = mpsc::channel();
    weather_service::request_fetch(&tx, runtime.handle(), app.clone(), query);
    drop(tx);

    let message = rx
        .recv()
        .map_err(|_| AppError::Other(anyhow::anyhow!("Weather task ended without a result")))?;

    let outcome = match message {
        WeatherServiceMessage::FetchDone(Ok(report)) => {
            println!("{}", render::render_report(&report, unit));
            Ok(())
        }
        WeatherServiceMessage::FetchDone(Err(e)) => Err(AppError::from(e)),
    };

    // Graceful shutdown
    app.shutdown();

    outcome
}
