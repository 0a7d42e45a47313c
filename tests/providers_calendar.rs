// tests/providers_calendar.rs
mod common;

use std::sync::Arc;

use chrono::NaiveTime;
use common::{all_day, clock, quick_policy, timed, MockCalendar};
use daily_digest::sources::{CalendarProvider, SourceProvider, StartTime};
use daily_digest::ErrorLog;

fn provider(backend: Arc<MockCalendar>, ids: &[&str]) -> CalendarProvider {
    CalendarProvider::new(
        backend,
        ids.iter().map(|s| s.to_string()).collect(),
        quick_policy(),
        clock(),
    )
}

fn at(h: u32, m: u32) -> StartTime {
    StartTime::At(NaiveTime::from_hms_opt(h, m, 0).unwrap())
}

#[tokio::test]
async fn merges_calendars_and_sorts_all_day_first() {
    let backend = Arc::new(
        MockCalendar::default()
            .with(
                "primary",
                "primary",
                vec![
                    timed("Lunch", "2025-01-15T12:00:00+01:00"),
                    timed("Północ", "2025-01-15T00:00:00+01:00"),
                ],
            )
            .with(
                "team@group",
                "Zespół",
                vec![
                    all_day("Urlop Ani", "2025-01-15"),
                    timed("Standup", "2025-01-15T09:30:00+01:00"),
                ],
            ),
    );
    let mut log = ErrorLog::new();
    let events = provider(backend, &["primary", "team@group"])
        .fetch(&mut log)
        .await;

    assert!(log.is_empty());
    let got: Vec<(StartTime, &str, &str)> = events
        .iter()
        .map(|e| (e.start, e.title.as_str(), e.source_name.as_str()))
        .collect();
    assert_eq!(
        got,
        vec![
            (StartTime::AllDay, "Urlop Ani", "Zespół"),
            (at(0, 0), "Północ", "primary"),
            (at(9, 30), "Standup", "Zespół"),
            (at(12, 0), "Lunch", "primary"),
        ]
    );
}

#[tokio::test]
async fn one_failing_calendar_does_not_abort_the_others() {
    let backend = Arc::new(
        MockCalendar::default()
            .with("primary", "primary", vec![timed("Standup", "2025-01-15T09:30:00+01:00")])
            .failing("broken"),
    );
    let mut log = ErrorLog::new();
    let events = provider(backend.clone(), &["broken", "primary"])
        .fetch(&mut log)
        .await;

    assert_eq!(events.len(), 1);
    assert_eq!(events[0].title, "Standup");
    assert_eq!(log.len(), 1);
    assert!(log.entries()[0].contains("broken"));
    assert_eq!(backend.calls_for("broken"), 3);
    assert_eq!(backend.calls_for("primary"), 1);
}

#[tokio::test]
async fn each_failing_calendar_gets_its_own_entry() {
    let backend = Arc::new(MockCalendar::default().failing("a").failing("b"));
    let mut log = ErrorLog::new();
    let events = provider(backend, &["a", "b"]).fetch(&mut log).await;
    assert!(events.is_empty());
    assert_eq!(log.len(), 2);
    assert!(log.entries()[0].contains("(a)"));
    assert!(log.entries()[1].contains("(b)"));
}

#[tokio::test]
async fn failed_name_lookup_falls_back_to_id_and_is_logged() {
    let mut cal = MockCalendar::default();
    cal.events.insert(
        "nameless".to_string(),
        vec![timed("Demo", "2025-01-15T14:00:00+01:00")],
    );
    let mut log = ErrorLog::new();
    let events = provider(Arc::new(cal), &["nameless"]).fetch(&mut log).await;
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].source_name, "nameless");
    assert_eq!(log.len(), 1);
    assert!(log.entries()[0].starts_with("Google Calendar (nameless) - nazwa kalendarza"));
}
