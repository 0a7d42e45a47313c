// src/sources/quote.rs
use std::sync::Arc;

use once_cell::sync::OnceCell;
use regex::Regex;
use serde::Deserialize;

use super::types::Quote;
use super::SourceProvider;
use crate::backends::{CompletionRequest, TextGenerator};
use crate::retry::{ErrorLog, OperationResult, RetryPolicy};

const UNKNOWN_SOURCE: &str = "Nieznane źródło";

const QUOTE_SYSTEM: &str = "Jesteś ekspertem od generowania krótkich, inspirujących cytatów. \
Odpowiedz tylko samym cytatem, jego autorem i źródłem (autor i źródło mają być autentyczne). \
Format odpowiedzi powinien być JSON: {\"quote\": \"Treść cytatu\", \"author\": \"Autor cytatu\", \"source\": \"Źródło/Książka\"}.";
const QUOTE_USER: &str = "Podaj mi motywacyjny cytat na dzisiejszy dzień.";

/// Quote of the day from the generative backend. Never empty: any failure
/// yields [`Quote::fallback`].
pub struct QuoteProvider {
    generator: Arc<dyn TextGenerator>,
    policy: RetryPolicy,
}

impl QuoteProvider {
    pub fn new(generator: Arc<dyn TextGenerator>, policy: RetryPolicy) -> Self {
        Self { generator, policy }
    }

    pub fn request() -> CompletionRequest {
        CompletionRequest {
            system: QUOTE_SYSTEM.to_string(),
            user: QUOTE_USER.to_string(),
            max_tokens: 150,
            temperature: 0.8,
        }
    }
}

#[async_trait::async_trait]
impl SourceProvider for QuoteProvider {
    type Snapshot = Quote;

    async fn fetch(&self, log: &mut ErrorLog) -> Quote {
        let req = Self::request();
        let raw = self
            .policy
            .execute("Cytat AI", log, || self.generator.complete(&req))
            .await;
        let OperationResult::Success(raw) = raw else {
            return Quote::fallback();
        };
        match parse_quote(&raw) {
            Some(q) => {
                tracing::info!(target: "digest", author = %q.author, "quote generated");
                q
            }
            None => {
                tracing::warn!(target: "digest", response = %raw, "malformed quote response, using default quote");
                Quote::fallback()
            }
        }
    }

    fn name(&self) -> &'static str {
        "quote"
    }
}

#[derive(Deserialize)]
struct QuoteWire {
    quote: Option<String>,
    author: Option<String>,
    #[serde(default)]
    source: Option<String>,
}

/// Parse `{"quote", "author", "source"}`, tolerating a Markdown code fence.
/// Returns `None` for non-JSON or when quote/author are missing or blank.
pub fn parse_quote(raw: &str) -> Option<Quote> {
    let body = strip_code_fence(raw.trim());
    let wire: QuoteWire = serde_json::from_str(body).ok()?;
    let text = non_blank(wire.quote)?;
    let author = non_blank(wire.author)?;
    let source = non_blank(wire.source).unwrap_or_else(|| UNKNOWN_SOURCE.to_string());
    Some(Quote {
        text,
        author,
        source,
    })
}

fn non_blank(v: Option<String>) -> Option<String> {
    v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

fn strip_code_fence(s: &str) -> &str {
    static RE_FENCE: OnceCell<Regex> = OnceCell::new();
    let re = RE_FENCE.get_or_init(|| {
        Regex::new(r"(?s)^```[a-zA-Z]*\s*(.*?)\s*```$").expect("fence regex")
    });
    re.captures(s)
        .and_then(|c| c.get(1))
        .map_or(s, |m| m.as_str())
}
