// src/report.rs
//! # Report assembly
//! Pure merge of provider snapshots, narrative and error logs into one
//! immutable [`DigestReport`]. No I/O; identical inputs give identical reports.

use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::Serialize;

use crate::retry::ErrorLog;
use crate::sources::types::{CalendarEvent, Quote, ReadingItem, RunClock, WeatherReport};

/// Everything the providers produced in one run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceSnapshot {
    pub events: Vec<CalendarEvent>,
    pub weather: Option<WeatherReport>,
    pub reading_items: Vec<ReadingItem>,
    pub quote: Quote,
}

/// Per-provider error logs, concatenated in invocation order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceErrors {
    pub calendar: ErrorLog,
    pub weather: ErrorLog,
    pub reading_list: ErrorLog,
    pub quote: ErrorLog,
}

impl SourceErrors {
    pub fn concat(self) -> ErrorLog {
        let mut all = self.calendar;
        all.merge(self.weather);
        all.merge(self.reading_list);
        all.merge(self.quote);
        all
    }
}

/// Final output of a run. Built once, then only read.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DigestReport {
    narrative: String,
    events: Vec<CalendarEvent>,
    weather: Option<WeatherReport>,
    reading_items: Vec<ReadingItem>,
    quote: Option<Quote>,
    errors: ErrorLog,
    date: NaiveDate,
    generated_at: DateTime<FixedOffset>,
}

impl DigestReport {
    pub fn narrative(&self) -> &str {
        &self.narrative
    }

    pub fn events(&self) -> &[CalendarEvent] {
        &self.events
    }

    pub fn weather(&self) -> Option<&WeatherReport> {
        self.weather.as_ref()
    }

    pub fn reading_items(&self) -> &[ReadingItem] {
        &self.reading_items
    }

    /// Always present on a normally assembled report; `None` only when degraded.
    pub fn quote(&self) -> Option<&Quote> {
        self.quote.as_ref()
    }

    pub fn errors(&self) -> &ErrorLog {
        &self.errors
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn generated_at(&self) -> DateTime<FixedOffset> {
        self.generated_at
    }

    pub fn is_degraded(&self) -> bool {
        self.quote.is_none()
    }
}

pub fn assemble(
    snapshot: SourceSnapshot,
    narrative: String,
    errors: SourceErrors,
    clock: &RunClock,
) -> DigestReport {
    DigestReport {
        narrative,
        events: snapshot.events,
        weather: snapshot.weather,
        reading_items: snapshot.reading_items,
        quote: Some(snapshot.quote),
        errors: errors.concat(),
        date: clock.today(),
        generated_at: clock.now,
    }
}

/// Minimal report for a critical failure: empty sections, one error entry.
pub fn degraded(cause: &str, clock: &RunClock) -> DigestReport {
    DigestReport {
        narrative: format!(
            "Napotkano problemy podczas przygotowywania dzisiejszego podsumowania: {cause}"
        ),
        events: Vec::new(),
        weather: None,
        reading_items: Vec::new(),
        quote: None,
        errors: ErrorLog::from(vec![format!("Krytyczny błąd: {cause}")]),
        date: clock.today(),
        generated_at: clock.now,
    }
}
