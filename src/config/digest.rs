// src/config/digest.rs
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::retry::{RetryPolicy, DEFAULT_ATTEMPTS, DEFAULT_DELAY_SECS};

pub const DEFAULT_CITY: &str = "Warsaw";
pub const DEFAULT_MODEL: &str = "gpt-4.1-nano";

fn default_attempts() -> u32 {
    DEFAULT_ATTEMPTS
}
fn default_delay_secs() -> u64 {
    DEFAULT_DELAY_SECS
}
fn default_units() -> String {
    "metric".into()
}
fn default_lang() -> String {
    "pl".into()
}
fn default_status_property() -> String {
    "Status".into()
}
fn default_pending_status() -> String {
    "Not started".into()
}
fn default_done_status() -> String {
    "Done".into()
}
fn default_sample_size() -> usize {
    crate::sources::reading::DEFAULT_SAMPLE_SIZE
}
fn default_model() -> String {
    DEFAULT_MODEL.into()
}
fn default_smtp_host() -> String {
    "smtp.gmail.com".into()
}
fn default_smtp_port() -> u16 {
    587
}
fn default_from_name() -> String {
    "Daily Digest".into()
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DigestConfig {
    pub retry: RetryConfig,
    pub calendar: CalendarConfig,
    pub weather: WeatherConfig,
    pub reading_list: ReadingListConfig,
    pub ai: AiConfig,
    pub email: EmailConfig,
    pub render: RenderConfig,
    /// When set, the digest is written here instead of being e-mailed.
    pub dry_run_path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_attempts")]
    pub attempts: u32,
    #[serde(default = "default_delay_secs")]
    pub delay_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            attempts: default_attempts(),
            delay_secs: default_delay_secs(),
        }
    }
}

impl RetryConfig {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.attempts, Duration::from_secs(self.delay_secs))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalendarConfig {
    pub ids: Vec<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub refresh_token: Option<String>,
    /// Authorized-user JSON (`client_id`, `client_secret`, `refresh_token`).
    pub token_path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherConfig {
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_units")]
    pub units: String,
    #[serde(default = "default_lang")]
    pub lang: String,
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            city: None,
            api_key: None,
            units: default_units(),
            lang: default_lang(),
        }
    }
}

impl WeatherConfig {
    pub fn city(&self) -> &str {
        self.city.as_deref().unwrap_or(DEFAULT_CITY)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadingListConfig {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub database_id: Option<String>,
    #[serde(default = "default_status_property")]
    pub status_property: String,
    #[serde(default = "default_pending_status")]
    pub pending_status: String,
    #[serde(default = "default_done_status")]
    pub done_status: String,
    #[serde(default = "default_sample_size")]
    pub sample_size: usize,
}

impl Default for ReadingListConfig {
    fn default() -> Self {
        Self {
            token: None,
            database_id: None,
            status_property: default_status_property(),
            pending_status: default_pending_status(),
            done_status: default_done_status(),
            sample_size: default_sample_size(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AiConfig {
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_model")]
    pub model: String,
    /// OpenAI-compatible base URL; defaults to api.openai.com.
    #[serde(default)]
    pub base_url: Option<String>,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: default_model(),
            base_url: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmailConfig {
    #[serde(default = "default_smtp_host")]
    pub smtp_host: String,
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default = "default_from_name")]
    pub from_name: String,
    #[serde(default)]
    pub recipient: Option<String>,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            smtp_host: default_smtp_host(),
            smtp_port: default_smtp_port(),
            username: None,
            password: None,
            from_name: default_from_name(),
            recipient: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub template_path: Option<PathBuf>,
}

/// Fill `slot` from `var` when it is unset or the literal "ENV".
fn resolve_slot(slot: &mut Option<String>, var: &str, lookup: &impl Fn(&str) -> Option<String>) {
    let wants_env = match slot.as_deref().map(str::trim) {
        None | Some("") => true,
        Some(v) => v.eq_ignore_ascii_case("env"),
    };
    if wants_env {
        *slot = lookup(var).filter(|v| !v.trim().is_empty());
    }
}

impl DigestConfig {
    /// Resolve secrets and env-provided lists. `lookup` is usually `std::env::var`.
    pub fn resolve_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        resolve_slot(&mut self.calendar.client_id, "GOOGLE_CLIENT_ID", &lookup);
        resolve_slot(&mut self.calendar.client_secret, "GOOGLE_CLIENT_SECRET", &lookup);
        resolve_slot(&mut self.calendar.refresh_token, "GOOGLE_REFRESH_TOKEN", &lookup);
        resolve_slot(&mut self.weather.api_key, "OPENWEATHERMAP_API_KEY", &lookup);
        resolve_slot(&mut self.weather.city, "WEATHER_CITY", &lookup);
        resolve_slot(&mut self.reading_list.token, "NOTION_TOKEN", &lookup);
        resolve_slot(&mut self.reading_list.database_id, "NOTION_DATABASE_ID", &lookup);
        resolve_slot(&mut self.ai.api_key, "OPENAI_API_KEY", &lookup);
        resolve_slot(&mut self.email.username, "GMAIL_EMAIL", &lookup);
        resolve_slot(&mut self.email.password, "GMAIL_APP_PASSWORD", &lookup);
        resolve_slot(&mut self.email.recipient, "RECIPIENT_EMAIL", &lookup);

        if self.calendar.ids.is_empty() {
            let raw = lookup("GOOGLE_CALENDAR_IDS").unwrap_or_else(|| "primary".to_string());
            self.calendar.ids = split_ids(&raw);
        }
        if self.calendar.token_path.is_none() {
            self.calendar.token_path = lookup("GOOGLE_TOKEN_PATH").map(PathBuf::from);
        }
        if self.dry_run_path.is_none() {
            self.dry_run_path = lookup("DIGEST_DRY_RUN_PATH").map(PathBuf::from);
        }
    }

    /// Credentials that are absent after resolution. Calendar auth counts as
    /// present when either a token file or a refresh triple is configured.
    pub fn missing_credentials(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        let set = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.trim().is_empty());

        let calendar_triple = set(&self.calendar.client_id)
            && set(&self.calendar.client_secret)
            && set(&self.calendar.refresh_token);
        if !calendar_triple && self.calendar.token_path.is_none() {
            missing.push("GOOGLE_REFRESH_TOKEN");
        }
        if !set(&self.weather.api_key) {
            missing.push("OPENWEATHERMAP_API_KEY");
        }
        if !set(&self.reading_list.token) {
            missing.push("NOTION_TOKEN");
        }
        if !set(&self.reading_list.database_id) {
            missing.push("NOTION_DATABASE_ID");
        }
        if !set(&self.ai.api_key) {
            missing.push("OPENAI_API_KEY");
        }
        if self.dry_run_path.is_none() {
            if !set(&self.email.username) {
                missing.push("GMAIL_EMAIL");
            }
            if !set(&self.email.password) {
                missing.push("GMAIL_APP_PASSWORD");
            }
            if !set(&self.email.recipient) {
                missing.push("RECIPIENT_EMAIL");
            }
        }
        missing
    }
}

pub fn split_ids(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
