// src/backends/mod.rs
//! Narrow interfaces to the external services the digest reads from, plus
//! their HTTP implementations. Auth, transport timeouts and wire formats live
//! here; the providers only see normalized raw records.

pub mod google_calendar;
pub mod notion;
pub mod openai;
pub mod openweather;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};
use std::time::Duration;

use crate::retry::non_retryable;
use crate::sources::types::{Forecast, RawCalendarEvent, ReadingItem};

pub use google_calendar::GoogleCalendarClient;
pub use notion::NotionClient;
pub use openai::OpenAiGenerator;
pub use openweather::OpenWeatherClient;

pub(crate) const USER_AGENT: &str = "daily-digest/0.1";
pub(crate) const CONNECT_TIMEOUT: Duration = Duration::from_secs(4);
pub(crate) const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[async_trait]
pub trait CalendarBackend: Send + Sync {
    async fn list_events(
        &self,
        calendar_id: &str,
        start: DateTime<FixedOffset>,
        end: DateTime<FixedOffset>,
    ) -> Result<Vec<RawCalendarEvent>>;

    async fn calendar_display_name(&self, calendar_id: &str) -> Result<String>;
}

#[async_trait]
pub trait WeatherBackend: Send + Sync {
    async fn forecast(&self, location: &str) -> Result<Forecast>;
}

#[async_trait]
pub trait ReadingListBackend: Send + Sync {
    async fn query_pending(&self) -> Result<Vec<ReadingItem>>;
    async fn mark_completed(&self, item_id: &str) -> Result<()>;
}

/// One chat-style completion call.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub system: String,
    pub user: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn complete(&self, req: &CompletionRequest) -> Result<String>;
    fn name(&self) -> &'static str;
}

pub(crate) fn http_client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .connect_timeout(CONNECT_TIMEOUT)
        .timeout(REQUEST_TIMEOUT)
        .build()
        .map_err(anyhow::Error::from)
}

/// Require a configured secret; a missing one is not worth retrying.
pub(crate) fn require<'a>(value: &'a Option<String>, key: &str) -> Result<&'a str> {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(non_retryable(format!("brak konfiguracji: {key}"))),
    }
}

/// Turn a non-2xx response into an error; auth/not-found are final.
pub(crate) async fn check_status(resp: reqwest::Response, what: &str) -> Result<reqwest::Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    let snippet: String = body.chars().take(200).collect();
    let msg = format!("{what}: HTTP {status}: {snippet}");
    if matches!(status.as_u16(), 400 | 401 | 403 | 404) {
        Err(non_retryable(msg))
    } else {
        Err(anyhow::anyhow!(msg))
    }
}
