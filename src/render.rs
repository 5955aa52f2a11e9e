//! Plain-text rendering of a weather report.

use skycast_core::TemperatureUnit;
use skycast_weather::sun::format_remaining;
use skycast_weather::{DailyPoint, HourlyPoint, SunPosition};

use crate::weather_service::WeatherReport;

const SUN_BAR_WIDTH: usize = 20;

fn temp(unit: TemperatureUnit, celsius: i32) -> String {
    format!(
        "{:.0}{}",
        unit.from_celsius(f64::from(celsius)),
        unit.symbol()
    )
}

pub fn hourly_line(point: &HourlyPoint, unit: TemperatureUnit) -> String {
    format!(
        "{:>5}  {:>6} (feels {:>6})  {:>3}%  wind {:.1}/{:.1} m/s  {}",
        point.label,
        temp(unit, point.temp_c),
        temp(unit, point.feels_like_c),
        point.humidity_pct,
        point.wind_speed_ms,
        point.wind_gust_ms,
        describe(&point.condition_text, point.condition().description()),
    )
}

pub fn daily_line(day: &DailyPoint, unit: TemperatureUnit) -> String {
    format!(
        "{:>5}  {:>6} / {:>6}  wind up to {:.1} m/s (gusts {:.1})  {}",
        day.day_label,
        temp(unit, day.low_c),
        temp(unit, day.high_c),
        day.max_wind_ms,
        day.max_gust_ms,
        describe(&day.dominant_condition_text, day.condition().description()),
    )
}

pub fn sun_line(sun: &SunPosition) -> String {
    let filled = (sun.fraction * SUN_BAR_WIDTH as f64).round() as usize;
    let bar: String = (0..SUN_BAR_WIDTH)
        .map(|i| if i < filled { '=' } else { '-' })
        .collect();

    let remaining = if sun.is_daytime {
        format!("{} of daylight left", format_remaining(sun.daylight_remaining_secs))
    } else {
        "sun is down".to_string()
    };

    format!(
        "{} [{}] {}  {}",
        sun.sunrise_label, bar, sun.sunset_label, remaining
    )
}

/// Provider text when present, otherwise the category name.
fn describe<'a>(text: &'a str, fallback: &'a str) -> &'a str {
    if text.trim().is_empty() {
        fallback
    } else {
        text
    }
}

pub fn render_report(report: &WeatherReport, unit: TemperatureUnit) -> String {
    let mut lines = vec![format!("Weather for {}", report.forecast.location_label)];
    if report.stale {
        lines.push("(offline: the last saved forecast is out of date)".to_string());
    } else if report.from_cache {
        lines.push("(offline: showing the last saved forecast)".to_string());
    }

    if let Some(sun) = &report.sun {
        lines.push(String::new());
        lines.push(sun_line(sun));
    }

    lines.push(String::new());
    lines.push("Next 24 hours".to_string());
    if report.forecast.hourly.is_empty() {
        lines.push("  no upcoming samples".to_string());
    }
    lines.extend(
        report
            .forecast
            .hourly
            .iter()
            .map(|p| format!("  {}", hourly_line(p, unit))),
    );

    lines.push(String::new());
    lines.push("Next days".to_string());
    lines.extend(
        report
            .forecast
            .daily
            .iter()
            .map(|d| format!("  {}", daily_line(d, unit))),
    );

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use skycast_weather::ForecastResult;

    fn day() -> DailyPoint {
        DailyPoint {
            day_label: "Today".to_string(),
            low_c: -1,
            high_c: 4,
            dominant_condition_code: 601,
            dominant_condition_text: String::new(),
            max_wind_ms: 6.25,
            max_gust_ms: 11.0,
        }
    }

    #[test]
    fn daily_line_falls_back_to_category_name() {
        let line = daily_line(&day(), TemperatureUnit::Celsius);
        assert!(line.contains("Today"));
        assert!(line.contains("-1°C"));
        assert!(line.contains("4°C"));
        assert!(line.ends_with("Snow"));
    }

    #[test]
    fn fahrenheit_is_converted_for_display() {
        let line = daily_line(&day(), TemperatureUnit::Fahrenheit);
        assert!(line.contains("30°F"));
        assert!(line.contains("39°F"));
    }

    #[test]
    fn sun_line_shows_progress_and_remaining() {
        let sun = SunPosition {
            fraction: 0.5,
            daylight_remaining_secs: 5 * 3600 + 30 * 60,
            is_daytime: true,
            sunrise_label: "07:00".to_string(),
            sunset_label: "18:00".to_string(),
        };
        let line = sun_line(&sun);
        assert!(line.starts_with("07:00 [=========="));
        assert!(line.contains("5h 30m of daylight left"));
    }

    #[test]
    fn report_marks_cached_data() {
        let report = WeatherReport {
            forecast: ForecastResult {
                location_label: "Oslo, NO".to_string(),
                hourly: Vec::new(),
                daily: vec![day()],
            },
            sun: None,
            from_cache: true,
            stale: false,
        };
        let text = render_report(&report, TemperatureUnit::Auto);
        assert!(text.starts_with("Weather for Oslo, NO"));
        assert!(text.contains("showing the last saved forecast"));
        assert!(text.contains("no upcoming samples"));
    }

    #[test]
    fn report_warns_about_stale_cache() {
        let report = WeatherReport {
            forecast: ForecastResult {
                location_label: "Oslo, NO".to_string(),
                hourly: Vec::new(),
                daily: vec![day()],
            },
            sun: None,
            from_cache: true,
            stale: true,
        };
        let text = render_report(&report, TemperatureUnit::Celsius);
        assert!(text.contains("out of date"));
        assert!(!text.contains("showing the last saved forecast"));
    }
}
