// src/sources/mod.rs
//! The four independent data sources of a digest run.
//!
//! Every provider retries its backend calls through [`RetryPolicy`], records
//! failures in the `ErrorLog` it is handed and falls back to an empty/default
//! snapshot. None of them ever returns an error to the caller.

pub mod calendar;
pub mod quote;
pub mod reading;
pub mod types;
pub mod weather;

use crate::retry::ErrorLog;

pub use calendar::CalendarProvider;
pub use quote::QuoteProvider;
pub use reading::ReadingListProvider;
pub use types::{
    CalendarEvent, Quote, ReadingItem, RunClock, StartTime, WeatherReport, WeatherSlice,
    WeatherSummary,
};
pub use weather::WeatherProvider;

#[async_trait::async_trait]
pub trait SourceProvider: Send + Sync {
    type Snapshot: Send;

    /// Produce a normalized snapshot; failures go to `log`, never to the caller.
    async fn fetch(&self, log: &mut ErrorLog) -> Self::Snapshot;

    fn name(&self) -> &'static str;
}
