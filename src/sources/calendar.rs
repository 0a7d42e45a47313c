// src/sources/calendar.rs
use std::sync::Arc;

use chrono::{DateTime, NaiveDateTime, NaiveTime};

use super::types::{CalendarEvent, RawCalendarEvent, RunClock, StartTime};
use super::SourceProvider;
use crate::backends::CalendarBackend;
use crate::retry::{ErrorLog, OperationResult, RetryPolicy};

const UNTITLED: &str = "Brak tytułu";

/// Today's events from every configured calendar, merged and sorted by start.
pub struct CalendarProvider {
    backend: Arc<dyn CalendarBackend>,
    calendar_ids: Vec<String>,
    policy: RetryPolicy,
    clock: RunClock,
}

impl CalendarProvider {
    pub fn new(
        backend: Arc<dyn CalendarBackend>,
        calendar_ids: Vec<String>,
        policy: RetryPolicy,
        clock: RunClock,
    ) -> Self {
        Self {
            backend,
            calendar_ids,
            policy,
            clock,
        }
    }

    /// Falls back to the id; a failed lookup is still a logged failure.
    async fn display_name(&self, calendar_id: &str, log: &mut ErrorLog) -> String {
        match self.backend.calendar_display_name(calendar_id).await {
            Ok(name) if !name.trim().is_empty() => name,
            Ok(_) => calendar_id.to_string(),
            Err(e) => {
                tracing::warn!(target: "digest", calendar_id, error = %format!("{e:#}"), "calendar name lookup failed, using id");
                log.push(format!(
                    "Google Calendar ({calendar_id}) - nazwa kalendarza: {e:#}"
                ));
                calendar_id.to_string()
            }
        }
    }
}

#[async_trait::async_trait]
impl SourceProvider for CalendarProvider {
    type Snapshot = Vec<CalendarEvent>;

    async fn fetch(&self, log: &mut ErrorLog) -> Vec<CalendarEvent> {
        let (start, end) = self.clock.day_bounds();
        let mut merged = Vec::new();

        for calendar_id in &self.calendar_ids {
            let operation = format!("Google Calendar ({calendar_id})");
            let raw = self
                .policy
                .execute(&operation, log, || {
                    self.backend.list_events(calendar_id, start, end)
                })
                .await;
            let OperationResult::Success(raw) = raw else {
                continue;
            };
            let source_name = self.display_name(calendar_id, log).await;
            tracing::info!(target: "digest", calendar = %source_name, count = raw.len(), "calendar events fetched");
            merged.extend(raw.iter().map(|ev| normalize_event(ev, &source_name)));
        }

        sort_events(&mut merged);
        merged
    }

    fn name(&self) -> &'static str {
        "calendar"
    }
}

/// Stable ascending sort by time of day; all-day events first.
pub fn sort_events(events: &mut [CalendarEvent]) {
    events.sort_by_key(|ev| ev.start.sort_key());
}

pub fn normalize_event(raw: &RawCalendarEvent, source_name: &str) -> CalendarEvent {
    let start = match raw.start.date_time.as_deref() {
        Some(dt) => parse_wall_clock(dt).map_or(StartTime::AllDay, StartTime::At),
        None => StartTime::AllDay,
    };
    let title = raw
        .summary
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(UNTITLED)
        .to_string();
    let location = raw
        .location
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string);

    CalendarEvent {
        start,
        title,
        location,
        source_name: source_name.to_string(),
    }
}

/// Wall-clock time as written in the timestamp, in the event's own offset.
fn parse_wall_clock(s: &str) -> Option<NaiveTime> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.time());
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S")
        .ok()
        .map(|dt| dt.time())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::types::RawEventStart;

    fn timed(dt: &str, title: &str) -> RawCalendarEvent {
        RawCalendarEvent {
            summary: Some(title.into()),
            location: None,
            start: RawEventStart {
                date_time: Some(dt.into()),
                date: None,
            },
        }
    }

    #[test]
    fn keeps_wall_clock_of_event_offset() {
        let ev = normalize_event(&timed("2025-03-01T09:30:00+01:00", "Standup"), "Praca");
        assert_eq!(
            ev.start,
            StartTime::At(NaiveTime::from_hms_opt(9, 30, 0).unwrap())
        );
        assert_eq!(ev.start.to_string(), "09:30");
        assert_eq!(ev.source_name, "Praca");
    }

    #[test]
    fn date_only_is_all_day_and_untitled_gets_placeholder() {
        let raw = RawCalendarEvent {
            summary: Some("  ".into()),
            location: Some("".into()),
            start: RawEventStart {
                date_time: None,
                date: Some("2025-03-01".into()),
            },
        };
        let ev = normalize_event(&raw, "primary");
        assert_eq!(ev.start, StartTime::AllDay);
        assert_eq!(ev.title, UNTITLED);
        assert_eq!(ev.location, None);
        assert_eq!(ev.start.to_string(), "Cały dzień");
    }

    #[test]
    fn all_day_sorts_before_midnight() {
        let mut evs = vec![
            normalize_event(&timed("2025-03-01T00:00:00Z", "Midnight"), "a"),
            normalize_event(
                &RawCalendarEvent {
                    summary: Some("Holiday".into()),
                    location: None,
                    start: RawEventStart {
                        date_time: None,
                        date: Some("2025-03-01".into()),
                    },
                },
                "b",
            ),
        ];
        sort_events(&mut evs);
        assert_eq!(evs[0].title, "Holiday");
        assert_eq!(evs[1].title, "Midnight");
    }
}
