// src/backends/google_calendar.rs
//! Google Calendar v3 with an OAuth refresh-token grant. The access token is
//! cached in memory for its lifetime; nothing is written back to disk.

use std::path::Path;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, SecondsFormat};
use reqwest::Url;
use serde::Deserialize;
use tokio::sync::Mutex;

use super::{check_status, http_client, require, CalendarBackend};
use crate::config::CalendarConfig;
use crate::retry::non_retryable;
use crate::sources::types::RawCalendarEvent;

const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const API_BASE: &str = "https://www.googleapis.com/calendar/v3/";
/// Refresh a bit before the server-side expiry.
const EXPIRY_MARGIN: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OAuthCredentials {
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub client_secret: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

impl OAuthCredentials {
    /// Authorized-user file as written by Google's installed-app flow.
    pub fn from_file(path: &Path) -> Result<Self> {
        let s = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        serde_json::from_str(&s).with_context(|| format!("parsing {}", path.display()))
    }

    /// Values from config win; the token file fills the gaps.
    fn or(self, other: OAuthCredentials) -> Self {
        Self {
            client_id: self.client_id.or(other.client_id),
            client_secret: self.client_secret.or(other.client_secret),
            refresh_token: self.refresh_token.or(other.refresh_token),
        }
    }
}

struct CachedToken {
    value: String,
    expires_at: Instant,
}

pub struct GoogleCalendarClient {
    http: reqwest::Client,
    creds: OAuthCredentials,
    token: Mutex<Option<CachedToken>>,
    api_base: Url,
}

impl GoogleCalendarClient {
    pub fn from_config(cfg: &CalendarConfig) -> Result<Self> {
        let mut creds = OAuthCredentials {
            client_id: cfg.client_id.clone(),
            client_secret: cfg.client_secret.clone(),
            refresh_token: cfg.refresh_token.clone(),
        };
        if let Some(path) = &cfg.token_path {
            match OAuthCredentials::from_file(path) {
                Ok(file_creds) => creds = creds.or(file_creds),
                Err(e) => {
                    tracing::warn!(target: "digest", error = %format!("{e:#}"), "google token file unusable")
                }
            }
        }
        Ok(Self {
            http: http_client()?,
            creds,
            token: Mutex::new(None),
            api_base: Url::parse(API_BASE).context("calendar api base url")?,
        })
    }

    async fn access_token(&self) -> Result<String> {
        let mut guard = self.token.lock().await;
        if let Some(t) = guard.as_ref() {
            if Instant::now() < t.expires_at {
                return Ok(t.value.clone());
            }
        }

        let client_id = require(&self.creds.client_id, "GOOGLE_CLIENT_ID")?;
        let client_secret = require(&self.creds.client_secret, "GOOGLE_CLIENT_SECRET")?;
        let refresh_token = require(&self.creds.refresh_token, "GOOGLE_REFRESH_TOKEN")?;

        let resp = self
            .http
            .post(TOKEN_URL)
            .form(&[
                ("grant_type", "refresh_token"),
                ("client_id", client_id),
                ("client_secret", client_secret),
                ("refresh_token", refresh_token),
            ])
            .send()
            .await
            .context("google token request")?;
        let resp = check_status(resp, "google token refresh").await?;
        let body: TokenResp = resp.json().await.context("parse google token")?;

        let lifetime = Duration::from_secs(body.expires_in.unwrap_or(3600));
        let expires_at = Instant::now() + lifetime.saturating_sub(EXPIRY_MARGIN);
        *guard = Some(CachedToken {
            value: body.access_token.clone(),
            expires_at,
        });
        tracing::debug!(target: "digest", "google access token refreshed");
        Ok(body.access_token)
    }

    fn url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.api_base.clone();
        url.path_segments_mut()
            .map_err(|_| non_retryable("calendar api base cannot be a base"))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

#[derive(Debug, Deserialize)]
struct TokenResp {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct EventsResp {
    #[serde(default)]
    items: Vec<RawCalendarEvent>,
}

#[derive(Debug, Deserialize)]
struct CalendarResp {
    #[serde(default)]
    summary: Option<String>,
}

pub fn parse_events(body: &str) -> Result<Vec<RawCalendarEvent>> {
    let resp: EventsResp = serde_json::from_str(body).context("parse calendar events")?;
    Ok(resp.items)
}

fn rfc3339(dt: DateTime<FixedOffset>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Secs, true)
}

#[async_trait]
impl CalendarBackend for GoogleCalendarClient {
    async fn list_events(
        &self,
        calendar_id: &str,
        start: DateTime<FixedOffset>,
        end: DateTime<FixedOffset>,
    ) -> Result<Vec<RawCalendarEvent>> {
        let token = self.access_token().await?;
        let mut url = self.url(&["calendars", calendar_id, "events"])?;
        url.query_pairs_mut()
            .append_pair("timeMin", &rfc3339(start))
            .append_pair("timeMax", &rfc3339(end))
            .append_pair("singleEvents", "true")
            .append_pair("orderBy", "startTime");

        let resp = self
            .http
            .get(url)
            .bearer_auth(token)
            .send()
            .await
            .context("calendar events request")?;
        let resp = check_status(resp, "calendar events").await?;
        let body = resp.text().await.context("calendar events body")?;
        parse_events(&body)
    }

    async fn calendar_display_name(&self, calendar_id: &str) -> Result<String> {
        let token = self.access_token().await?;
        let url = self.url(&["calendars", calendar_id])?;
        let resp = self
            .http
            .get(url)
            .bearer_auth(token)
            .send()
            .await
            .context("calendar info request")?;
        let resp = check_status(resp, "calendar info").await?;
        let info: CalendarResp = resp.json().await.context("parse calendar info")?;
        Ok(info.summary.unwrap_or_else(|| calendar_id.to_string()))
    }
}
