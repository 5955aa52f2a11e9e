//! Forecast aggregation: 3-hour samples into the next-24-hours and next-5-days views.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, NaiveDateTime};

use crate::types::{DailyPoint, ForecastResult, HourlyPoint, RawSample};

pub const HOURLY_WINDOW_SECS: i64 = 24 * 60 * 60;
pub const MAX_DAILY_BUCKETS: usize = 5;

const NOW_LABEL: &str = "Now";
const TODAY_LABEL: &str = "Today";

/// Build the hourly and daily views for a location.
///
/// `samples` must be ordered by timestamp; `utc_offset_secs` is the location's
/// offset from UTC and `now_utc` the reference instant for the hourly window.
/// Returns `None` when there are no samples at all. Malformed samples are
/// skipped, never fatal.
///
/// The returned result carries an empty location label; attach one with
/// [`ForecastResult::with_location_label`].
pub fn aggregate(
    samples: &[RawSample],
    utc_offset_secs: i32,
    now_utc: i64,
) -> Option<ForecastResult> {
    if samples.is_empty() {
        return None;
    }

    let hourly = hourly_window(samples, utc_offset_secs, now_utc);
    let daily = daily_summary(samples, utc_offset_secs);

    tracing::debug!(
        "Aggregated {} samples into {} hourly and {} daily points",
        samples.len(),
        hourly.len(),
        daily.len()
    );

    Some(ForecastResult {
        location_label: String::new(),
        hourly,
        daily,
    })
}

/// Samples within `[now_utc, now_utc + 24h]`.
fn hourly_window(samples: &[RawSample], utc_offset_secs: i32, now_utc: i64) -> Vec<HourlyPoint> {
    let window_end = now_utc.saturating_add(HOURLY_WINDOW_SECS);
    let mut points: Vec<HourlyPoint> = Vec::new();

    for sample in samples {
        let ts = sample.timestamp_utc;
        if ts < now_utc {
            continue;
        }
        // Input is chronological: nothing after this point can be inside the window.
        if ts > window_end {
            break;
        }
        if sample.temperature_c.is_nan() {
            tracing::debug!("Skipping hourly sample at {} without temperature", ts);
            continue;
        }

        let label = if points.is_empty() {
            NOW_LABEL.to_string()
        } else {
            match local_time(ts, utc_offset_secs) {
                Some(local) => local.format("%H:%M").to_string(),
                None => continue,
            }
        };

        points.push(HourlyPoint {
            timestamp_utc: ts,
            label,
            temp_c: round_display(sample.temperature_c),
            feels_like_c: round_display(sample.feels_like_c),
            humidity_pct: sample.humidity_pct.unwrap_or(0),
            wind_speed_ms: finite_or_zero(sample.wind_speed_ms),
            wind_gust_ms: finite_or_zero(sample.wind_gust_ms),
            condition_code: sample.condition_code,
            condition_text: sample.condition_text.clone(),
        });
    }

    points
}

#[derive(Debug)]
struct ConditionTally {
    code: i32,
    text: String,
    count: u32,
}

#[derive(Debug)]
struct DayBucket {
    first_local: NaiveDateTime,
    low: Option<f64>,
    high: Option<f64>,
    // Kept in first-seen order; the tie-break depends on it.
    conditions: Vec<ConditionTally>,
    max_wind: f64,
    max_gust: f64,
}

impl DayBucket {
    fn new(first_local: NaiveDateTime) -> Self {
        Self {
            first_local,
            low: None,
            high: None,
            conditions: Vec::new(),
            max_wind: 0.0,
            max_gust: 0.0,
        }
    }

    fn add(&mut self, sample: &RawSample) {
        let temp = sample.temperature_c;
        if temp.is_finite() {
            self.low = Some(self.low.map_or(temp, |low| low.min(temp)));
            self.high = Some(self.high.map_or(temp, |high| high.max(temp)));
        }

        match self
            .conditions
            .iter_mut()
            .find(|t| t.code == sample.condition_code)
        {
            Some(tally) => tally.count += 1,
            None => self.conditions.push(ConditionTally {
                code: sample.condition_code,
                text: sample.condition_text.clone(),
                count: 1,
            }),
        }

        self.max_wind = self.max_wind.max(finite_or_zero(sample.wind_speed_ms));
        self.max_gust = self.max_gust.max(finite_or_zero(sample.wind_gust_ms));
    }

    /// Most frequent condition; on equal counts the one seen first wins.
    fn dominant(&self) -> Option<&ConditionTally> {
        self.conditions
            .iter()
            .fold(None, |best: Option<&ConditionTally>, tally| match best {
                Some(b) if b.count >= tally.count => Some(b),
                _ => Some(tally),
            })
    }

    fn into_point(self, index: usize) -> DailyPoint {
        let day_label = if index == 0 {
            TODAY_LABEL.to_string()
        } else {
            self.first_local.format("%a").to_string()
        };

        let (code, text) = self
            .dominant()
            .map(|t| (t.code, t.text.clone()))
            .unwrap_or_default();

        DailyPoint {
            day_label,
            low_c: self.low.map_or(0, round_display),
            high_c: self.high.map_or(0, round_display),
            dominant_condition_code: code,
            dominant_condition_text: text,
            max_wind_ms: self.max_wind,
            max_gust_ms: self.max_gust,
        }
    }
}

/// Group every sample by local calendar date, in order of first appearance.
fn daily_summary(samples: &[RawSample], utc_offset_secs: i32) -> Vec<DailyPoint> {
    let mut buckets: Vec<DayBucket> = Vec::new();
    let mut index: HashMap<NaiveDate, usize> = HashMap::new();

    for sample in samples {
        let Some(local) = local_time(sample.timestamp_utc, utc_offset_secs) else {
            tracing::debug!(
                "Skipping sample with out-of-range timestamp {}",
                sample.timestamp_utc
            );
            continue;
        };

        let date = local.date();
        let slot = match index.get(&date) {
            Some(&slot) => slot,
            None => {
                if buckets.len() == MAX_DAILY_BUCKETS {
                    continue;
                }
                buckets.push(DayBucket::new(local));
                index.insert(date, buckets.len() - 1);
                buckets.len() - 1
            }
        };

        buckets[slot].add(sample);
    }

    buckets
        .into_iter()
        .enumerate()
        .map(|(i, bucket)| bucket.into_point(i))
        .collect()
}

/// Wall-clock time at the location.
///
/// The offset is added to the epoch value and the result read as UTC, so it
/// is applied exactly once regardless of the host's own zone.
pub(crate) fn local_time(timestamp_utc: i64, utc_offset_secs: i32) -> Option<NaiveDateTime> {
    let shifted = timestamp_utc.checked_add(i64::from(utc_offset_secs))?;
    DateTime::from_timestamp(shifted, 0).map(|dt| dt.naive_utc())
}

fn round_display(value: f64) -> i32 {
    if value.is_finite() {
        value.round() as i32
    } else {
        0
    }
}

fn finite_or_zero(value: Option<f64>) -> f64 {
    value.filter(|v| v.is_finite()).unwrap_or(0.0)
}
