// src/render.rs
//! Turns a [`DigestReport`] into a deliverable document: an HTML body filled
//! from a placeholder template plus a plain-text alternative.

use std::fmt::Write as _;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use html_escape::{encode_double_quoted_attribute, encode_text};
use once_cell::sync::OnceCell;
use regex::{Captures, Regex};

use crate::report::DigestReport;
use crate::sources::types::{CalendarEvent, Quote, ReadingItem, WeatherReport};

pub const BUILTIN_TEMPLATE: &str = include_str!("../templates/email_template.html");

pub const PH_INTRO: &str = "{{AI_INTRO}}";
pub const PH_EVENTS: &str = "{{EVENTS_SECTION}}";
pub const PH_WEATHER: &str = "{{WEATHER_SECTION}}";
pub const PH_ARTICLES: &str = "{{ARTICLES_SECTION}}";
pub const PH_QUOTE: &str = "{{QUOTE_SECTION}}";
pub const PH_ERRORS: &str = "{{ERRORS_SECTION}}";
pub const PH_DATE: &str = "{{DATE}}";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedDigest {
    pub subject: String,
    pub html: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateSource {
    Builtin,
    File(PathBuf),
}

#[derive(Debug, Clone)]
pub struct HtmlRenderer {
    source: TemplateSource,
}

impl HtmlRenderer {
    pub fn builtin() -> Self {
        Self {
            source: TemplateSource::Builtin,
        }
    }

    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        Self {
            source: TemplateSource::File(path.into()),
        }
    }

    pub fn source(&self) -> &TemplateSource {
        &self.source
    }

    /// Load and validate the template. A template without the notices
    /// placeholder is rejected so errors can never be hidden.
    pub async fn load_template(&self) -> Result<String> {
        let template = match &self.source {
            TemplateSource::Builtin => BUILTIN_TEMPLATE.to_string(),
            TemplateSource::File(path) => tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("reading template {}", path.display()))?,
        };
        if !template.contains(PH_ERRORS) {
            bail!("template has no {PH_ERRORS} placeholder");
        }
        Ok(template)
    }

    pub async fn render(&self, report: &DigestReport) -> Result<RenderedDigest> {
        let template = self.load_template().await?;
        Ok(render_with(&template, report))
    }
}

pub fn subject(report: &DigestReport) -> String {
    format!("📅 Daily Digest - {}", report.date().format("%d.%m.%Y"))
}

/// Substitute every placeholder in one pass over the template; substituted
/// content is never scanned again. Unknown `{{...}}` tokens are left as is.
pub fn render_with(template: &str, report: &DigestReport) -> RenderedDigest {
    static RE_PLACEHOLDER: OnceCell<Regex> = OnceCell::new();
    let re = RE_PLACEHOLDER
        .get_or_init(|| Regex::new(r"\{\{[A-Z_]+\}\}").expect("placeholder regex"));

    let intro = encode_text(report.narrative()).replace('\n', "<br>");
    let events = events_html(report.events());
    let weather = weather_html(report.weather());
    let articles = articles_html(report.reading_items());
    let quote = quote_html(report.quote());
    let errors = errors_html(report.errors().entries());
    let date = report.date().format("%d.%m.%Y").to_string();

    let html = re
        .replace_all(template, |caps: &Captures<'_>| {
            let section: &str = match &caps[0] {
                PH_INTRO => &intro,
                PH_EVENTS => &events,
                PH_WEATHER => &weather,
                PH_ARTICLES => &articles,
                PH_QUOTE => &quote,
                PH_ERRORS => &errors,
                PH_DATE => &date,
                other => other,
            };
            section.to_string()
        })
        .into_owned();

    RenderedDigest {
        subject: subject(report),
        html,
        text: render_text(report),
    }
}

fn events_html(events: &[CalendarEvent]) -> String {
    if events.is_empty() {
        return r#"<p style="color: #666;">Brak zaplanowanych wydarzeń na dziś.</p>"#.to_string();
    }
    let mut html = String::new();
    for ev in events {
        let location = ev
            .location
            .as_deref()
            .map(|l| {
                format!(
                    r#"<div style="color: #666; font-size: 14px; margin-top: 3px;">📍 {}</div>"#,
                    encode_text(l)
                )
            })
            .unwrap_or_default();
        let calendar = if ev.source_name != "primary" {
            format!(
                r#"<div style="color: #777; font-size: 12px; margin-top: 2px;">Kalendarz: {}</div>"#,
                encode_text(&ev.source_name)
            )
        } else {
            String::new()
        };
        let _ = write!(
            html,
            r#"<div style="margin-bottom: 15px; padding: 10px; background-color: #f8f9fa; border-radius: 8px;">
<div style="font-weight: 600; color: #007AFF;">{time}</div>
<div style="font-weight: 500; margin-top: 5px;">{title}</div>
{location}{calendar}</div>
"#,
            time = ev.start,
            title = encode_text(&ev.title),
        );
    }
    html
}

pub fn weather_icon(code: &str) -> &'static str {
    match code {
        "01d" => "☀️",
        "01n" => "🌙",
        "02d" => "⛅",
        "02n" | "03d" | "03n" | "04d" | "04n" => "☁️",
        "09d" | "09n" | "10n" => "🌧️",
        "10d" => "🌦️",
        "11d" | "11n" => "⛈️",
        "13d" | "13n" => "❄️",
        "50d" | "50n" => "🌫️",
        _ => "🌤️",
    }
}

fn or_na(v: Option<i32>) -> String {
    v.map_or_else(|| "N/A".to_string(), |x| x.to_string())
}

fn weather_html(weather: Option<&WeatherReport>) -> String {
    let Some(report) = weather.filter(|w| !w.slices.is_empty()) else {
        return r#"<p style="color: #666;">Brak danych pogodowych.</p>"#.to_string();
    };
    let s = &report.summary;
    let mut html = format!(
        r#"<div style="background-color: #f8f9fa; padding: 15px; border-radius: 8px;">
<div style="font-size: 18px; font-weight: 600; color: #007AFF;">📍 {city}</div>
<div style="font-size: 14px; color: #666; margin-top: 2px;">{min}°C - {max}°C | Wilgotność: {hum}%</div>
<div style="display: flex; overflow-x: auto; gap: 15px; padding: 10px 0;">
"#,
        city = encode_text(&s.location_name),
        min = or_na(s.min_temp),
        max = or_na(s.max_temp),
        hum = or_na(s.avg_humidity),
    );
    for slice in &report.slices {
        let rain = if slice.precipitation_chance_pct > 0 {
            format!(
                r#"<div style="color: #007AFF; font-size: 11px; margin-top: 2px;">💧 {}%</div>"#,
                slice.precipitation_chance_pct
            )
        } else {
            String::new()
        };
        let _ = write!(
            html,
            r#"<div style="min-width: 80px; text-align: center; background-color: white; padding: 12px 8px; border-radius: 8px; border: 1px solid #e0e0e0;">
<div style="font-weight: 600; font-size: 14px; color: #333;">{time}</div>
<div style="font-size: 24px; margin: 8px 0;">{icon}</div>
<div style="font-size: 12px; color: #666;">{desc}</div>
<div style="font-weight: 600; font-size: 16px; color: #333; margin: 6px 0;">{temp}°C</div>
<div style="font-size: 11px; color: #999;">Odczuwalnie {feels}°C</div>
{rain}<div style="font-size: 10px; color: #999; margin-top: 4px;">💨 {wind} m/s</div>
</div>
"#,
            time = slice.clock_time.format("%H:%M"),
            icon = weather_icon(&slice.icon),
            desc = encode_text(&slice.description),
            temp = slice.temperature_c,
            feels = slice.feels_like_c,
            wind = slice.wind_speed,
        );
    }
    html.push_str("</div>\n</div>");
    html
}

fn articles_html(items: &[ReadingItem]) -> String {
    if items.is_empty() {
        return r#"<p style="color: #666;">Brak nowych artykułów do przeczytania.</p>"#.to_string();
    }
    let mut html = String::new();
    for item in items {
        let title = encode_text(&item.title);
        let link = match item.url.as_deref().filter(|u| !u.is_empty()) {
            Some(url) => format!(
                r#"<a href="{}" style="color: #007AFF; text-decoration: none;">{title}</a>"#,
                encode_double_quoted_attribute(url)
            ),
            None => title.to_string(),
        };
        let author = item
            .author
            .as_deref()
            .filter(|a| !a.is_empty())
            .map(|a| {
                format!(
                    r#"<div style="color: #666; font-size: 14px; margin-top: 3px;">Autor: {}</div>"#,
                    encode_text(a)
                )
            })
            .unwrap_or_default();
        let _ = write!(
            html,
            r#"<div style="margin-bottom: 15px; padding: 10px; background-color: #f8f9fa; border-radius: 8px;">
<div style="font-weight: 500;">{link}</div>
{author}</div>
"#
        );
    }
    html
}

fn quote_html(quote: Option<&Quote>) -> String {
    let Some(q) = quote else {
        return r#"<p style="color: #666;">Brak cytatu na dziś.</p>"#.to_string();
    };
    format!(
        r#"<div style="background-color: #f8f9fa; padding: 20px; border-radius: 8px; border-left: 4px solid #007AFF;">
<div style="font-style: italic; font-size: 16px; margin-bottom: 10px;">"{text}"</div>
<div style="font-weight: 500; color: #666;">— {author}</div>
<div style="font-size: 14px; color: #999; margin-top: 5px;">{source}</div>
</div>"#,
        text = encode_text(&q.text),
        author = encode_text(&q.author),
        source = encode_text(&q.source),
    )
}

fn errors_html(errors: &[String]) -> String {
    if errors.is_empty() {
        return String::new();
    }
    let mut html = String::from(
        r#"<div style="background-color: #fff3cd; border: 1px solid #ffeaa7; padding: 15px; border-radius: 8px; margin-top: 20px;">
<h3 style="margin: 0 0 10px 0; color: #856404;">⚠️ Uwagi systemowe</h3>
"#,
    );
    for e in errors {
        let _ = writeln!(
            html,
            r#"<div style="color: #856404; font-size: 14px; margin-bottom: 5px;">• {}</div>"#,
            encode_text(e)
        );
    }
    html.push_str("</div>");
    html
}

/// Plain-text alternative body.
pub fn render_text(report: &DigestReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Daily Digest - {}", report.date().format("%d.%m.%Y"));
    let _ = writeln!(out, "\n{}\n", report.narrative());

    let _ = writeln!(out, "Wydarzenia:");
    if report.events().is_empty() {
        let _ = writeln!(out, "  brak");
    }
    for ev in report.events() {
        let _ = write!(out, "  {} {}", ev.start, ev.title);
        if let Some(loc) = &ev.location {
            let _ = write!(out, " ({loc})");
        }
        let _ = writeln!(out);
    }

    let _ = writeln!(out, "\nPogoda:");
    match report.weather() {
        Some(w) => {
            let s = &w.summary;
            let _ = writeln!(
                out,
                "  {}: {}°C - {}°C, wilgotność {}%",
                s.location_name,
                or_na(s.min_temp),
                or_na(s.max_temp),
                or_na(s.avg_humidity)
            );
        }
        None => {
            let _ = writeln!(out, "  brak danych");
        }
    }

    let _ = writeln!(out, "\nDo przeczytania:");
    if report.reading_items().is_empty() {
        let _ = writeln!(out, "  brak");
    }
    for item in report.reading_items() {
        match &item.url {
            Some(url) => {
                let _ = writeln!(out, "  {} <{url}>", item.title);
            }
            None => {
                let _ = writeln!(out, "  {}", item.title);
            }
        }
    }

    if let Some(q) = report.quote() {
        let _ = writeln!(out, "\n\"{}\" - {} ({})", q.text, q.author, q.source);
    }

    if !report.errors().is_empty() {
        let _ = writeln!(out, "\nUwagi systemowe:");
        for e in report.errors().entries() {
            let _ = writeln!(out, "  - {e}");
        }
    }
    out
}
