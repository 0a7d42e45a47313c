// src/synth.rs
//! Narrative intro for the digest. Generation failures never reach the
//! caller: they degrade to [`FALLBACK_NARRATIVE`] and are not error-log entries.

use std::sync::Arc;

use crate::backends::{CompletionRequest, TextGenerator};
use crate::report::SourceSnapshot;

pub const FALLBACK_NARRATIVE: &str =
    "Przepraszam, nie udało się wygenerować spersonalizowanej treści. Oto Twoje dane na dziś.";

const SYNTH_SYSTEM: &str = "Jesteś asystentem do tworzenia codziennych podsumowań. \
Twoim zadaniem jest stworzenie przyjaznego, ale profesjonalnego podsumowania dnia w języku polskim. \
Używaj luźnego, ale nie przesadnie potocznego tonu. Bądź pomocny i motywujący. \
Nie dodawaj zbędnych znaczników HTML - zostanie to użyte w szablonie HTML. Nie dodawaj cytatu w podsumowaniu.";

pub struct ContentSynthesizer {
    generator: Arc<dyn TextGenerator>,
}

impl ContentSynthesizer {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self { generator }
    }

    pub async fn synthesize(&self, snapshot: &SourceSnapshot) -> String {
        let req = CompletionRequest {
            system: SYNTH_SYSTEM.to_string(),
            user: build_prompt(snapshot),
            max_tokens: 1000,
            temperature: 0.7,
        };
        match self.generator.complete(&req).await {
            Ok(text) if !text.trim().is_empty() => text.trim().to_string(),
            Ok(_) => {
                tracing::warn!(target: "digest", generator = self.generator.name(), "empty narrative, using fallback");
                FALLBACK_NARRATIVE.to_string()
            }
            Err(e) => {
                tracing::error!(target: "digest", generator = self.generator.name(), error = %format!("{e:#}"), "narrative generation failed");
                FALLBACK_NARRATIVE.to_string()
            }
        }
    }
}

/// "<description> <temp>°C", plus the day's range when it is not flat.
pub fn weather_headline(snapshot: &SourceSnapshot) -> String {
    let Some(report) = snapshot.weather.as_ref() else {
        return "brak danych".to_string();
    };
    let Some(first) = report.slices.first() else {
        return "brak danych".to_string();
    };
    let mut out = format!("{} {}°C", first.description, first.temperature_c);
    let s = &report.summary;
    if let (Some(min), Some(max)) = (s.min_temp, s.max_temp) {
        if min != max {
            out.push_str(&format!(" (dziś {min}°C - {max}°C)"));
        }
    }
    out
}

pub fn build_prompt(snapshot: &SourceSnapshot) -> String {
    format!(
        "Stwórz krótkie (2-3 zdania), przyjazne wprowadzenie do dzisiejszego dnia w języku polskim.\n\
         Weź pod uwagę:\n\
         Wydarzenia na dziś: {events} wydarzeń zaplanowanych\n\
         Pogoda: {weather}\n\
         Artykuły do przeczytania: {articles} artykułów\n\
         Cytat dnia: \"{quote}\" - {author}\n\
         Stwórz motywujące wprowadzenie, które łączy te elementy w spójną całość.",
        events = snapshot.events.len(),
        weather = weather_headline(snapshot),
        articles = snapshot.reading_items.len(),
        quote = snapshot.quote.text,
        author = snapshot.quote.author,
    )
}
