// tests/synth_fallback.rs
mod common;

use std::sync::Arc;

use common::{MockGenerator, Reply};
use daily_digest::report::SourceSnapshot;
use daily_digest::sources::types::Quote;
use daily_digest::synth::{ContentSynthesizer, FALLBACK_NARRATIVE};

fn empty_snapshot() -> SourceSnapshot {
    SourceSnapshot {
        events: vec![],
        weather: None,
        reading_items: vec![],
        quote: Quote::fallback(),
    }
}

#[tokio::test]
async fn failure_returns_fixed_apology() {
    let generator = Arc::new(MockGenerator::new(Reply::Fail, Reply::Fail));
    let text = ContentSynthesizer::new(generator.clone())
        .synthesize(&empty_snapshot())
        .await;
    assert_eq!(text, FALLBACK_NARRATIVE);
    // Single attempt, no retry.
    assert_eq!(generator.requests.lock().len(), 1);
}

#[tokio::test]
async fn blank_output_returns_fixed_apology() {
    let generator = Arc::new(MockGenerator::new(Reply::Fail, Reply::Text("  \n".into())));
    let text = ContentSynthesizer::new(generator)
        .synthesize(&empty_snapshot())
        .await;
    assert_eq!(text, FALLBACK_NARRATIVE);
}

#[tokio::test]
async fn prompt_embeds_counts_and_quote() {
    let generator = Arc::new(MockGenerator::new(
        Reply::Fail,
        Reply::Text("  Miłego dnia!  ".into()),
    ));
    let text = ContentSynthesizer::new(generator.clone())
        .synthesize(&empty_snapshot())
        .await;
    assert_eq!(text, "Miłego dnia!");

    let requests = generator.requests.lock();
    let req = &requests[0];
    assert_eq!(req.max_tokens, 1000);
    assert!(req.user.contains("0 wydarzeń"));
    assert!(req.user.contains("brak danych"));
    assert!(req.user.contains("0 artykułów"));
    assert!(req.user.contains(Quote::FALLBACK_TEXT));
    assert!(req.user.contains("Chatbot"));
}
