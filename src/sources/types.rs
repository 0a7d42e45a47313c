// src/sources/types.rs
use std::fmt;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, TimeZone, Timelike};
use serde::{Deserialize, Serialize};

/// Fixed "now" for a whole run; every provider derives "today" from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunClock {
    pub now: DateTime<FixedOffset>,
}

impl RunClock {
    pub fn new(now: DateTime<FixedOffset>) -> Self {
        Self { now }
    }

    pub fn local_now() -> Self {
        Self::new(chrono::Local::now().fixed_offset())
    }

    pub fn today(&self) -> NaiveDate {
        self.now.date_naive()
    }

    pub fn offset(&self) -> FixedOffset {
        *self.now.offset()
    }

    /// Local midnight and the last second of the day, as RFC 3339 instants.
    pub fn day_bounds(&self) -> (DateTime<FixedOffset>, DateTime<FixedOffset>) {
        let start = self
            .now
            .with_hour(0)
            .and_then(|d| d.with_minute(0))
            .and_then(|d| d.with_second(0))
            .and_then(|d| d.with_nanosecond(0))
            .unwrap_or(self.now);
        let end = start + chrono::Duration::days(1) - chrono::Duration::seconds(1);
        (start, end)
    }

    /// Convert a unix timestamp to the run's local offset.
    pub fn local(&self, unix_secs: i64) -> Option<DateTime<FixedOffset>> {
        self.offset().timestamp_opt(unix_secs, 0).single()
    }
}

// ---------------------------------------------------------------------------
// Calendar
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StartTime {
    AllDay,
    At(NaiveTime),
}

impl StartTime {
    /// All-day events sort as midnight, ahead of any timed event at midnight.
    pub fn sort_key(&self) -> (NaiveTime, bool) {
        match self {
            StartTime::AllDay => (NaiveTime::MIN, false),
            StartTime::At(t) => (*t, true),
        }
    }
}

impl fmt::Display for StartTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StartTime::AllDay => f.write_str("Cały dzień"),
            StartTime::At(t) => write!(f, "{}", t.format("%H:%M")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarEvent {
    pub start: StartTime,
    pub title: String,
    pub location: Option<String>,
    pub source_name: String,
}

/// Event as returned by the calendar backend, before normalization.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RawCalendarEvent {
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    pub start: RawEventStart,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RawEventStart {
    #[serde(rename = "dateTime", default)]
    pub date_time: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
}

// ---------------------------------------------------------------------------
// Weather
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherSlice {
    pub clock_time: NaiveTime,
    pub temperature_c: i32,
    pub feels_like_c: i32,
    pub description: String,
    pub humidity_pct: i32,
    pub pressure: i32,
    pub wind_speed: f64,
    pub precipitation_chance_pct: i32,
    pub icon: String,
}

/// Day aggregates; `None` means "unavailable".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeatherSummary {
    pub location_name: String,
    pub min_temp: Option<i32>,
    pub max_temp: Option<i32>,
    pub avg_humidity: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherReport {
    pub summary: WeatherSummary,
    pub slices: Vec<WeatherSlice>,
}

/// One forecast step as delivered by the weather backend.
#[derive(Debug, Clone, PartialEq)]
pub struct RawForecastSlice {
    pub timestamp: i64,
    pub temp: f64,
    pub feels_like: f64,
    pub description: String,
    pub humidity: i32,
    pub pressure: i32,
    pub wind_speed: f64,
    /// 0.0 ..= 1.0
    pub precip_chance: f64,
    pub icon_code: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Forecast {
    pub location_name: String,
    pub slices: Vec<RawForecastSlice>,
}

// ---------------------------------------------------------------------------
// Reading list & quote
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadingItem {
    pub title: String,
    pub url: Option<String>,
    pub author: Option<String>,
    pub external_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    pub text: String,
    pub author: String,
    pub source: String,
}

impl Quote {
    pub const FALLBACK_TEXT: &'static str =
        "Każdy dzień to nowa szansa, aby być lepszym niż wczoraj.";
    pub const FALLBACK_AUTHOR: &'static str = "Chatbot";
    pub const FALLBACK_SOURCE: &'static str = "Mądrość cyfrowa";

    pub fn fallback() -> Self {
        Self {
            text: Self::FALLBACK_TEXT.to_string(),
            author: Self::FALLBACK_AUTHOR.to_string(),
            source: Self::FALLBACK_SOURCE.to_string(),
        }
    }
}
