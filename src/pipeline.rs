// src/pipeline.rs
//! One digest run: fetch all sources, synthesize the intro, assemble, render
//! and deliver. Any fault outside the providers falls back to a degraded
//! report; only a failed delivery of that report ends the run with an error.

use std::fmt;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use metrics::{counter, describe_counter, describe_gauge, gauge};
use once_cell::sync::OnceCell;

use crate::backends::{
    CalendarBackend, GoogleCalendarClient, NotionClient, OpenAiGenerator, OpenWeatherClient,
    ReadingListBackend, TextGenerator, WeatherBackend,
};
use crate::config::DigestConfig;
use crate::notify::{Dispatcher, EmailDispatcher, FileDispatcher};
use crate::render::{render_with, HtmlRenderer, RenderedDigest, BUILTIN_TEMPLATE};
use crate::report::{self, DigestReport, SourceErrors, SourceSnapshot};
use crate::retry::RetryPolicy;
use crate::sources::{
    CalendarProvider, QuoteProvider, ReadingListProvider, RunClock, SourceProvider,
    WeatherProvider,
};
use crate::synth::ContentSynthesizer;

/// One-time metrics registration.
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("digest_runs_total", "Digest runs started.");
        describe_counter!(
            "digest_degraded_runs_total",
            "Runs that fell back to the degraded report."
        );
        describe_counter!(
            "digest_operation_attempts_total",
            "Backend operation attempts made by the retry executor."
        );
        describe_counter!(
            "digest_operation_failures_total",
            "Backend operations that failed on every attempt."
        );
        describe_gauge!(
            "digest_error_entries",
            "Error log entries in the last assembled report."
        );
    });
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStage {
    Init,
    FetchingSources,
    Synthesizing,
    Assembled,
    Delivered,
    DegradedDelivery,
}

impl fmt::Display for RunStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RunStage::Init => "init",
            RunStage::FetchingSources => "fetching_sources",
            RunStage::Synthesizing => "synthesizing",
            RunStage::Assembled => "assembled",
            RunStage::Delivered => "delivered",
            RunStage::DegradedDelivery => "degraded_delivery",
        };
        f.write_str(s)
    }
}

fn enter(stage: RunStage) {
    tracing::info!(target: "digest", %stage, "run stage");
}

#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    Delivered { report: DigestReport },
    Degraded { cause: String, report: DigestReport },
}

impl RunOutcome {
    pub fn report(&self) -> &DigestReport {
        match self {
            RunOutcome::Delivered { report } | RunOutcome::Degraded { report, .. } => report,
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, RunOutcome::Degraded { .. })
    }
}

/// External collaborators of a run.
#[derive(Clone)]
pub struct Collaborators {
    pub calendar: Arc<dyn CalendarBackend>,
    pub weather: Arc<dyn WeatherBackend>,
    pub reading_list: Arc<dyn ReadingListBackend>,
    pub generator: Arc<dyn TextGenerator>,
    pub dispatcher: Arc<dyn Dispatcher>,
}

impl Collaborators {
    /// Production HTTP clients. A dry-run path swaps e-mail for a local file.
    pub fn from_config(cfg: &DigestConfig) -> Result<Self> {
        let dispatcher: Arc<dyn Dispatcher> = match &cfg.dry_run_path {
            Some(path) => Arc::new(FileDispatcher::new(path)),
            None => Arc::new(EmailDispatcher::from_config(&cfg.email)?),
        };
        Ok(Self {
            calendar: Arc::new(GoogleCalendarClient::from_config(&cfg.calendar)?),
            weather: Arc::new(OpenWeatherClient::from_config(&cfg.weather)?),
            reading_list: Arc::new(NotionClient::from_config(&cfg.reading_list)?),
            generator: Arc::new(OpenAiGenerator::from_config(&cfg.ai)?),
            dispatcher,
        })
    }
}

#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub policy: RetryPolicy,
    pub calendar_ids: Vec<String>,
    pub location: String,
    pub sample_size: usize,
    pub renderer: HtmlRenderer,
}

impl PipelineSettings {
    pub fn from_config(cfg: &DigestConfig) -> Self {
        let renderer = match &cfg.render.template_path {
            Some(p) => HtmlRenderer::from_path(p),
            None => HtmlRenderer::builtin(),
        };
        Self {
            policy: cfg.retry.policy(),
            calendar_ids: cfg.calendar.ids.clone(),
            location: cfg.weather.city().to_string(),
            sample_size: cfg.reading_list.sample_size,
            renderer,
        }
    }
}

#[derive(Clone)]
pub struct DigestPipeline {
    collab: Collaborators,
    settings: PipelineSettings,
}

impl DigestPipeline {
    pub fn new(collab: Collaborators, settings: PipelineSettings) -> Self {
        Self { collab, settings }
    }

    pub fn from_config(cfg: &DigestConfig) -> Result<Self> {
        Ok(Self::new(
            Collaborators::from_config(cfg)?,
            PipelineSettings::from_config(cfg),
        ))
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    /// Fetch every source concurrently; each provider keeps its own error log.
    pub async fn fetch_sources(&self, clock: RunClock) -> (SourceSnapshot, SourceErrors) {
        let policy = self.settings.policy;
        let calendar_src = CalendarProvider::new(
            self.collab.calendar.clone(),
            self.settings.calendar_ids.clone(),
            policy,
            clock,
        );
        let weather_src = WeatherProvider::new(
            self.collab.weather.clone(),
            self.settings.location.clone(),
            policy,
            clock,
        );
        let reading_src = ReadingListProvider::new(self.collab.reading_list.clone(), policy)
            .with_sample_size(self.settings.sample_size);
        let quote_src = QuoteProvider::new(self.collab.generator.clone(), policy);

        let mut errors = SourceErrors::default();
        let (events, weather, reading_items, quote) = tokio::join!(
            calendar_src.fetch(&mut errors.calendar),
            weather_src.fetch(&mut errors.weather),
            reading_src.fetch(&mut errors.reading_list),
            quote_src.fetch(&mut errors.quote),
        );
        for (provider, log) in [
            (calendar_src.name(), &errors.calendar),
            (weather_src.name(), &errors.weather),
            (reading_src.name(), &errors.reading_list),
            (quote_src.name(), &errors.quote),
        ] {
            tracing::info!(target: "digest", provider, errors = log.len(), "provider finished");
        }
        (
            SourceSnapshot {
                events,
                weather,
                reading_items,
                quote,
            },
            errors,
        )
    }

    /// Normal path up to a rendered document.
    pub async fn compose(&self, clock: RunClock) -> Result<(DigestReport, RenderedDigest)> {
        enter(RunStage::FetchingSources);
        let (snapshot, errors) = self.fetch_sources(clock).await;
        tracing::info!(
            target: "digest",
            events = snapshot.events.len(),
            weather = snapshot.weather.is_some(),
            reading_items = snapshot.reading_items.len(),
            "sources fetched"
        );

        enter(RunStage::Synthesizing);
        let narrative = ContentSynthesizer::new(self.collab.generator.clone())
            .synthesize(&snapshot)
            .await;

        let report = report::assemble(snapshot, narrative, errors, &clock);
        gauge!("digest_error_entries").set(report.errors().len() as f64);
        enter(RunStage::Assembled);

        let doc = self
            .settings
            .renderer
            .render(&report)
            .await
            .context("rendering digest")?;
        Ok((report, doc))
    }

    /// Run to completion. `Err` only when even the degraded report could not be delivered.
    pub async fn run(&self, clock: RunClock) -> Result<RunOutcome> {
        ensure_metrics_described();
        counter!("digest_runs_total").increment(1);
        enter(RunStage::Init);

        // A panic anywhere in compose must still end in a delivered report.
        let this = self.clone();
        let composed = match tokio::spawn(async move { this.compose(clock).await }).await {
            Ok(res) => res,
            Err(join_err) => Err(anyhow!("{}", panic_message(join_err))),
        };

        let cause = match composed {
            Ok((report, doc)) => match self.collab.dispatcher.deliver(&doc).await {
                Ok(()) => {
                    enter(RunStage::Delivered);
                    tracing::info!(
                        target: "digest",
                        errors = report.errors().len(),
                        dispatcher = self.collab.dispatcher.name(),
                        "daily digest delivered"
                    );
                    return Ok(RunOutcome::Delivered { report });
                }
                Err(e) => format!("{:#}", e.context("delivering digest")),
            },
            Err(e) => format!("{e:#}"),
        };

        tracing::error!(target: "digest", %cause, "critical failure, sending degraded digest");
        self.deliver_degraded(&cause, clock).await
    }

    async fn deliver_degraded(&self, cause: &str, clock: RunClock) -> Result<RunOutcome> {
        enter(RunStage::DegradedDelivery);
        counter!("digest_degraded_runs_total").increment(1);
        let report = report::degraded(cause, &clock);
        let doc = render_with(BUILTIN_TEMPLATE, &report);
        self.collab
            .dispatcher
            .deliver(&doc)
            .await
            .context("delivering degraded digest")?;
        tracing::warn!(target: "digest", "degraded digest delivered");
        Ok(RunOutcome::Degraded {
            cause: cause.to_string(),
            report,
        })
    }
}

fn panic_message(err: tokio::task::JoinError) -> String {
    if !err.is_panic() {
        return format!("compose task cancelled: {err}");
    }
    let payload = err.into_panic();
    let msg = payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string());
    format!("panic: {msg}")
}
