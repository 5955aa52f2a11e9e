//! Sun progress between sunrise and sunset.

use serde::{Deserialize, Serialize};

use crate::aggregate::local_time;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SunPosition {
    /// How far the sun is through today's arc, 0.0 at sunrise and 1.0 at sunset
    pub fraction: f64,
    pub daylight_remaining_secs: i64,
    pub is_daytime: bool,
    pub sunrise_label: String,
    pub sunset_label: String,
}

/// Linear interpolation of `now_utc` between sunrise and sunset, clamped to [0, 1].
///
/// A degenerate day (sunset not after sunrise, as during polar night) yields 0.
pub fn sun_position(
    sunrise_utc: i64,
    sunset_utc: i64,
    now_utc: i64,
    utc_offset_secs: i32,
) -> SunPosition {
    let day_length = sunset_utc.saturating_sub(sunrise_utc);

    let fraction = if day_length <= 0 {
        0.0
    } else {
        ((now_utc.saturating_sub(sunrise_utc)) as f64 / day_length as f64).clamp(0.0, 1.0)
    };

    let daylight_remaining_secs = if day_length <= 0 || now_utc >= sunset_utc {
        0
    } else {
        sunset_utc - now_utc.max(sunrise_utc)
    };

    SunPosition {
        fraction,
        daylight_remaining_secs,
        is_daytime: sunrise_utc <= now_utc && now_utc < sunset_utc,
        sunrise_label: clock_label(sunrise_utc, utc_offset_secs),
        sunset_label: clock_label(sunset_utc, utc_offset_secs),
    }
}

/// "Hh MMm", e.g. "3h 05m".
pub fn format_remaining(secs: i64) -> String {
    let total_minutes = secs.max(0) / 60;
    format!("{}h {:02}m", total_minutes / 60, total_minutes % 60)
}

fn clock_label(timestamp_utc: i64, utc_offset_secs: i32) -> String {
    local_time(timestamp_utc, utc_offset_secs)
        .map(|t| t.format("%H:%M").to_string())
        .unwrap_or_else(|| "--:--".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SUNRISE: i64 = 1_709_535_600; // 2024-03-04 07:00 UTC
    const SUNSET: i64 = SUNRISE + 11 * 3600;

    #[test]
    fn test_midday_is_halfway() {
        let pos = sun_position(SUNRISE, SUNSET, SUNRISE + 11 * 1800, 0);
        assert!((pos.fraction - 0.5).abs() < 1e-9);
        assert!(pos.is_daytime);
        assert_eq!(pos.daylight_remaining_secs, 11 * 1800);
    }

    #[test]
    fn test_before_sunrise_clamps_to_zero() {
        let pos = sun_position(SUNRISE, SUNSET, SUNRISE - 3600, 0);
        assert_eq!(pos.fraction, 0.0);
        assert!(!pos.is_daytime);
        assert_eq!(pos.daylight_remaining_secs, 11 * 3600);
    }

    #[test]
    fn test_after_sunset_clamps_to_one() {
        let pos = sun_position(SUNRISE, SUNSET, SUNSET + 60, 0);
        assert_eq!(pos.fraction, 1.0);
        assert!(!pos.is_daytime);
        assert_eq!(pos.daylight_remaining_secs, 0);
    }

    #[test]
    fn test_degenerate_day() {
        let pos = sun_position(SUNRISE, SUNRISE, SUNRISE, 0);
        assert_eq!(pos.fraction, 0.0);
        assert_eq!(pos.daylight_remaining_secs, 0);
        assert!(!pos.is_daytime);
    }

    #[test]
    fn test_labels_use_location_offset() {
        let pos = sun_position(SUNRISE, SUNSET, SUNRISE, -5 * 3600);
        assert_eq!(pos.sunrise_label, "02:00");
        assert_eq!(pos.sunset_label, "13:00");
    }

    #[test]
    fn test_format_remaining() {
        assert_eq!(format_remaining(3 * 3600 + 5 * 60 + 59), "3h 05m");
        assert_eq!(format_remaining(0), "0h 00m");
        assert_eq!(format_remaining(-10), "0h 00m");
    }
}
