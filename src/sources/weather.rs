// src/sources/weather.rs
use std::sync::Arc;

use super::types::{
    Forecast, RawForecastSlice, RunClock, WeatherReport, WeatherSlice, WeatherSummary,
};
use super::SourceProvider;
use crate::backends::WeatherBackend;
use crate::retry::{ErrorLog, RetryPolicy};

/// Today's forecast slices plus min/max/mean aggregates.
pub struct WeatherProvider {
    backend: Arc<dyn WeatherBackend>,
    location: String,
    policy: RetryPolicy,
    clock: RunClock,
}

impl WeatherProvider {
    pub fn new(
        backend: Arc<dyn WeatherBackend>,
        location: impl Into<String>,
        policy: RetryPolicy,
        clock: RunClock,
    ) -> Self {
        Self {
            backend,
            location: location.into(),
            policy,
            clock,
        }
    }
}

#[async_trait::async_trait]
impl SourceProvider for WeatherProvider {
    type Snapshot = Option<WeatherReport>;

    async fn fetch(&self, log: &mut ErrorLog) -> Option<WeatherReport> {
        let forecast = self
            .policy
            .execute("OpenWeatherMap", log, || self.backend.forecast(&self.location))
            .await
            .ok()?;
        let report = build_report(&forecast, &self.clock);
        tracing::info!(
            target: "digest",
            city = %report.summary.location_name,
            slices = report.slices.len(),
            "weather forecast fetched"
        );
        Some(report)
    }

    fn name(&self) -> &'static str {
        "weather"
    }
}

pub fn build_report(forecast: &Forecast, clock: &RunClock) -> WeatherReport {
    let slices: Vec<WeatherSlice> = select_today(&forecast.slices, clock)
        .into_iter()
        .filter_map(|raw| to_slice(raw, clock))
        .collect();
    let summary = summarize(&forecast.location_name, &slices);
    WeatherReport { summary, slices }
}

/// Slices whose local date is today; if none, the single earliest slice.
pub fn select_today<'a>(raw: &'a [RawForecastSlice], clock: &RunClock) -> Vec<&'a RawForecastSlice> {
    let today = clock.today();
    let todays: Vec<&RawForecastSlice> = raw
        .iter()
        .filter(|s| clock.local(s.timestamp).map(|dt| dt.date_naive()) == Some(today))
        .collect();
    if !todays.is_empty() {
        return todays;
    }
    raw.iter().min_by_key(|s| s.timestamp).into_iter().collect()
}

pub fn summarize(location_name: &str, slices: &[WeatherSlice]) -> WeatherSummary {
    let min_temp = slices.iter().map(|s| s.temperature_c).min();
    let max_temp = slices.iter().map(|s| s.temperature_c).max();
    let avg_humidity = if slices.is_empty() {
        None
    } else {
        let total: i64 = slices.iter().map(|s| i64::from(s.humidity_pct)).sum();
        Some((total as f64 / slices.len() as f64).round() as i32)
    };
    WeatherSummary {
        location_name: location_name.to_string(),
        min_temp,
        max_temp,
        avg_humidity,
    }
}

fn to_slice(raw: &RawForecastSlice, clock: &RunClock) -> Option<WeatherSlice> {
    let local = clock.local(raw.timestamp)?;
    Some(WeatherSlice {
        clock_time: local.time(),
        temperature_c: raw.temp.round() as i32,
        feels_like_c: raw.feels_like.round() as i32,
        description: capitalize(&raw.description),
        humidity_pct: raw.humidity,
        pressure: raw.pressure,
        wind_speed: raw.wind_speed,
        precipitation_chance_pct: (raw.precip_chance * 100.0).round() as i32,
        icon: raw.icon_code.clone(),
    })
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}
