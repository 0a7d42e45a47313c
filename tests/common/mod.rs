// tests/common/mod.rs
// In-memory collaborators shared by the integration tests.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, TimeZone};
use parking_lot::Mutex;

use daily_digest::backends::{
    CalendarBackend, CompletionRequest, ReadingListBackend, TextGenerator, WeatherBackend,
};
use daily_digest::notify::Dispatcher;
use daily_digest::render::{HtmlRenderer, RenderedDigest};
use daily_digest::sources::types::{
    Forecast, RawCalendarEvent, RawEventStart, RawForecastSlice, ReadingItem,
};
use daily_digest::sources::QuoteProvider;
use daily_digest::{Collaborators, PipelineSettings, RetryPolicy, RunClock};

/// 2025-01-15 07:30 at UTC+1.
pub fn clock() -> RunClock {
    let tz = FixedOffset::east_opt(3600).unwrap();
    RunClock::new(tz.with_ymd_and_hms(2025, 1, 15, 7, 30, 0).unwrap())
}

pub fn quick_policy() -> RetryPolicy {
    RetryPolicy::new(3, Duration::ZERO)
}

pub fn timed(title: &str, date_time: &str) -> RawCalendarEvent {
    RawCalendarEvent {
        summary: Some(title.to_string()),
        location: None,
        start: RawEventStart {
            date_time: Some(date_time.to_string()),
            date: None,
        },
    }
}

pub fn all_day(title: &str, date: &str) -> RawCalendarEvent {
    RawCalendarEvent {
        summary: Some(title.to_string()),
        location: None,
        start: RawEventStart {
            date_time: None,
            date: Some(date.to_string()),
        },
    }
}

pub fn item(id: &str) -> ReadingItem {
    ReadingItem {
        title: format!("Artykuł {id}"),
        url: Some(format!("https://example.test/{id}")),
        author: None,
        external_id: id.to_string(),
    }
}

pub fn raw_slice(ts: i64, temp: f64, humidity: i32) -> RawForecastSlice {
    RawForecastSlice {
        timestamp: ts,
        temp,
        feels_like: temp - 2.0,
        description: "pochmurno".to_string(),
        humidity,
        pressure: 1015,
        wind_speed: 3.0,
        precip_chance: 0.1,
        icon_code: "04d".to_string(),
    }
}

/// Unix timestamp of a local (UTC+1) wall-clock instant.
pub fn local_ts(y: i32, m: u32, d: u32, h: u32) -> i64 {
    let tz = FixedOffset::east_opt(3600).unwrap();
    tz.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap().timestamp()
}

// ---------------------------------------------------------------------------
// Calendar
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct MockCalendar {
    pub events: HashMap<String, Vec<RawCalendarEvent>>,
    pub names: HashMap<String, String>,
    pub failing: Vec<String>,
    pub calls: Mutex<Vec<String>>,
}

impl MockCalendar {
    pub fn with(mut self, id: &str, name: &str, events: Vec<RawCalendarEvent>) -> Self {
        self.events.insert(id.to_string(), events);
        self.names.insert(id.to_string(), name.to_string());
        self
    }

    pub fn failing(mut self, id: &str) -> Self {
        self.failing.push(id.to_string());
        self
    }

    pub fn calls_for(&self, id: &str) -> usize {
        self.calls.lock().iter().filter(|c| c.as_str() == id).count()
    }
}

#[async_trait]
impl CalendarBackend for MockCalendar {
    async fn list_events(
        &self,
        calendar_id: &str,
        _start: DateTime<FixedOffset>,
        _end: DateTime<FixedOffset>,
    ) -> Result<Vec<RawCalendarEvent>> {
        self.calls.lock().push(calendar_id.to_string());
        if self.failing.iter().any(|f| f == calendar_id) {
            return Err(anyhow!("calendar {calendar_id} unavailable"));
        }
        Ok(self.events.get(calendar_id).cloned().unwrap_or_default())
    }

    async fn calendar_display_name(&self, calendar_id: &str) -> Result<String> {
        self.names
            .get(calendar_id)
            .cloned()
            .ok_or_else(|| anyhow!("no such calendar"))
    }
}

// ---------------------------------------------------------------------------
// Weather
// ---------------------------------------------------------------------------

pub struct MockWeather {
    pub forecast: Option<Forecast>,
    pub calls: Mutex<u32>,
}

impl MockWeather {
    pub fn ok(forecast: Forecast) -> Self {
        Self {
            forecast: Some(forecast),
            calls: Mutex::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            forecast: None,
            calls: Mutex::new(0),
        }
    }
}

#[async_trait]
impl WeatherBackend for MockWeather {
    async fn forecast(&self, _location: &str) -> Result<Forecast> {
        *self.calls.lock() += 1;
        self.forecast
            .clone()
            .ok_or_else(|| anyhow!("weather service down"))
    }
}

// ---------------------------------------------------------------------------
// Reading list
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct MockReadingList {
    pub pending: Vec<ReadingItem>,
    pub fail_query: bool,
    pub fail_mark: bool,
    pub marked: Mutex<Vec<String>>,
    pub queries: Mutex<u32>,
}

impl MockReadingList {
    pub fn with_items(n: usize) -> Self {
        Self {
            pending: (1..=n).map(|i| item(&format!("p{i}"))).collect(),
            ..Default::default()
        }
    }

    pub fn failing() -> Self {
        Self {
            fail_query: true,
            ..Default::default()
        }
    }
}

#[async_trait]
impl ReadingListBackend for MockReadingList {
    async fn query_pending(&self) -> Result<Vec<ReadingItem>> {
        *self.queries.lock() += 1;
        if self.fail_query {
            return Err(anyhow!("notion unavailable"));
        }
        Ok(self.pending.clone())
    }

    async fn mark_completed(&self, item_id: &str) -> Result<()> {
        if self.fail_mark {
            return Err(anyhow!("update rejected"));
        }
        self.marked.lock().push(item_id.to_string());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Generative text
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub enum Reply {
    Text(String),
    Fail,
    Panic,
}

/// Answers the quote instruction and the narrative prompt independently.
pub struct MockGenerator {
    pub quote: Reply,
    pub narrative: Reply,
    pub requests: Mutex<Vec<CompletionRequest>>,
}

impl MockGenerator {
    pub fn new(quote: Reply, narrative: Reply) -> Self {
        Self {
            quote,
            narrative,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn healthy() -> Self {
        Self::new(
            Reply::Text(
                r#"{"quote": "Kto pyta, nie błądzi.", "author": "Przysłowie", "source": "Mądrość ludowa"}"#
                    .into(),
            ),
            Reply::Text("Dzień dobry! Masz dziś spokojny dzień.".into()),
        )
    }

    pub fn down() -> Self {
        Self::new(Reply::Fail, Reply::Fail)
    }

    pub fn quote_calls(&self) -> usize {
        let system = QuoteProvider::request().system;
        self.requests
            .lock()
            .iter()
            .filter(|r| r.system == system)
            .count()
    }
}

#[async_trait]
impl TextGenerator for MockGenerator {
    async fn complete(&self, req: &CompletionRequest) -> Result<String> {
        self.requests.lock().push(req.clone());
        let reply = if req.system == QuoteProvider::request().system {
            &self.quote
        } else {
            &self.narrative
        };
        match reply {
            Reply::Text(t) => Ok(t.clone()),
            Reply::Fail => Err(anyhow!("model overloaded")),
            Reply::Panic => panic!("generator exploded"),
        }
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

// ---------------------------------------------------------------------------
// Dispatcher
// ---------------------------------------------------------------------------

/// Records every delivery attempt; the first `fail_first` attempts fail.
#[derive(Default)]
pub struct RecordingDispatcher {
    pub fail_first: usize,
    pub attempts: Mutex<usize>,
    pub delivered: Mutex<Vec<RenderedDigest>>,
}

impl RecordingDispatcher {
    pub fn failing(times: usize) -> Self {
        Self {
            fail_first: times,
            ..Default::default()
        }
    }

    pub fn attempts(&self) -> usize {
        *self.attempts.lock()
    }
}

#[async_trait]
impl Dispatcher for RecordingDispatcher {
    async fn deliver(&self, doc: &RenderedDigest) -> Result<()> {
        let n = {
            let mut a = self.attempts.lock();
            *a += 1;
            *a
        };
        if n <= self.fail_first {
            return Err(anyhow!("smtp connection refused"));
        }
        self.delivered.lock().push(doc.clone());
        Ok(())
    }

    fn name(&self) -> &'static str {
        "recording"
    }
}

// ---------------------------------------------------------------------------
// Wiring
// ---------------------------------------------------------------------------

pub struct Harness {
    pub calendar: Arc<MockCalendar>,
    pub weather: Arc<MockWeather>,
    pub reading: Arc<MockReadingList>,
    pub generator: Arc<MockGenerator>,
    pub dispatcher: Arc<RecordingDispatcher>,
}

impl Harness {
    pub fn collaborators(&self) -> Collaborators {
        Collaborators {
            calendar: self.calendar.clone(),
            weather: self.weather.clone(),
            reading_list: self.reading.clone(),
            generator: self.generator.clone(),
            dispatcher: self.dispatcher.clone(),
        }
    }

    pub fn settings(&self, calendar_ids: &[&str]) -> PipelineSettings {
        PipelineSettings {
            policy: quick_policy(),
            calendar_ids: calendar_ids.iter().map(|s| s.to_string()).collect(),
            location: "Warsaw".to_string(),
            sample_size: 3,
            renderer: HtmlRenderer::builtin(),
        }
    }
}

/// Every collaborator broken except the dispatcher.
pub fn all_failing() -> Harness {
    Harness {
        calendar: Arc::new(MockCalendar::default().failing("primary")),
        weather: Arc::new(MockWeather::failing()),
        reading: Arc::new(MockReadingList::failing()),
        generator: Arc::new(MockGenerator::down()),
        dispatcher: Arc::new(RecordingDispatcher::default()),
    }
}

pub fn healthy() -> Harness {
    let forecast = Forecast {
        location_name: "Warszawa".to_string(),
        slices: vec![
            raw_slice(local_ts(2025, 1, 15, 9), 1.4, 80),
            raw_slice(local_ts(2025, 1, 15, 15), 3.6, 70),
        ],
    };
    Harness {
        calendar: Arc::new(MockCalendar::default().with(
            "primary",
            "primary",
            vec![timed("Standup", "2025-01-15T09:30:00+01:00")],
        )),
        weather: Arc::new(MockWeather::ok(forecast)),
        reading: Arc::new(MockReadingList::with_items(5)),
        generator: Arc::new(MockGenerator::healthy()),
        dispatcher: Arc::new(RecordingDispatcher::default()),
    }
}
