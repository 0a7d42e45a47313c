// src/backends/openweather.rs
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;

use super::{check_status, http_client, require, WeatherBackend};
use crate::config::WeatherConfig;
use crate::sources::types::{Forecast, RawForecastSlice};

const FORECAST_URL: &str = "https://api.openweathermap.org/data/2.5/forecast";

/// OpenWeatherMap 5-day / 3-hour forecast.
pub struct OpenWeatherClient {
    http: reqwest::Client,
    api_key: Option<String>,
    units: String,
    lang: String,
}

impl OpenWeatherClient {
    pub fn from_config(cfg: &WeatherConfig) -> Result<Self> {
        Ok(Self {
            http: http_client()?,
            api_key: cfg.api_key.clone(),
            units: cfg.units.clone(),
            lang: cfg.lang.clone(),
        })
    }
}

#[derive(Debug, Deserialize)]
struct ForecastResp {
    list: Vec<Item>,
    city: City,
}

#[derive(Debug, Deserialize)]
struct City {
    name: String,
}

#[derive(Debug, Deserialize)]
struct Item {
    dt: i64,
    main: Main,
    #[serde(default)]
    weather: Vec<Condition>,
    #[serde(default)]
    wind: Wind,
    #[serde(default)]
    pop: f64,
}

#[derive(Debug, Deserialize)]
struct Main {
    temp: f64,
    feels_like: f64,
    humidity: i32,
    pressure: i32,
}

#[derive(Debug, Deserialize)]
struct Condition {
    description: String,
    icon: String,
}

#[derive(Debug, Default, Deserialize)]
struct Wind {
    #[serde(default)]
    speed: f64,
}

pub fn parse_forecast(body: &str) -> Result<Forecast> {
    let resp: ForecastResp = serde_json::from_str(body).context("parse openweathermap forecast")?;
    let slices = resp
        .list
        .into_iter()
        .map(|it| {
            let (description, icon_code) = it
                .weather
                .into_iter()
                .next()
                .map(|c| (c.description, c.icon))
                .unwrap_or_default();
            RawForecastSlice {
                timestamp: it.dt,
                temp: it.main.temp,
                feels_like: it.main.feels_like,
                description,
                humidity: it.main.humidity,
                pressure: it.main.pressure,
                wind_speed: it.wind.speed,
                precip_chance: it.pop,
                icon_code,
            }
        })
        .collect();
    Ok(Forecast {
        location_name: resp.city.name,
        slices,
    })
}

#[async_trait]
impl WeatherBackend for OpenWeatherClient {
    async fn forecast(&self, location: &str) -> Result<Forecast> {
        let api_key = require(&self.api_key, "OPENWEATHERMAP_API_KEY")?;
        let resp = self
            .http
            .get(FORECAST_URL)
            .query(&[
                ("q", location),
                ("appid", api_key),
                ("units", self.units.as_str()),
                ("lang", self.lang.as_str()),
            ])
            .send()
            .await
            .context("openweathermap request")?;
        let resp = check_status(resp, "openweathermap").await?;
        let body = resp.text().await.context("openweathermap body")?;
        parse_forecast(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_forecast_payload() {
        let body = r#"{
            "cod": "200",
            "list": [
                {"dt": 1735725600, "main": {"temp": 1.6, "feels_like": -2.1, "humidity": 88, "pressure": 1018},
                 "weather": [{"description": "zachmurzenie duże", "icon": "04d"}],
                 "wind": {"speed": 4.2}, "pop": 0.2},
                {"dt": 1735736400, "main": {"temp": 2.4, "feels_like": -1.0, "humidity": 84, "pressure": 1017},
                 "weather": [], "wind": {"speed": 3.9}}
            ],
            "city": {"name": "Warszawa"}
        }"#;
        let f = parse_forecast(body).unwrap();
        assert_eq!(f.location_name, "Warszawa");
        assert_eq!(f.slices.len(), 2);
        assert_eq!(f.slices[0].icon_code, "04d");
        assert_eq!(f.slices[1].description, "");
        assert_eq!(f.slices[1].precip_chance, 0.0);
    }

    #[test]
    fn rejects_error_payload() {
        assert!(parse_forecast(r#"{"cod":"404","message":"city not found"}"#).is_err());
    }
}
