// src/sources/reading.rs
use std::sync::Arc;

use rand::Rng;

use super::types::ReadingItem;
use super::SourceProvider;
use crate::backends::ReadingListBackend;
use crate::retry::{ErrorLog, RetryPolicy};

pub const DEFAULT_SAMPLE_SIZE: usize = 3;

/// Picks a few pending articles and marks them completed in the store.
pub struct ReadingListProvider {
    backend: Arc<dyn ReadingListBackend>,
    sample_size: usize,
    policy: RetryPolicy,
}

impl ReadingListProvider {
    pub fn new(backend: Arc<dyn ReadingListBackend>, policy: RetryPolicy) -> Self {
        Self {
            backend,
            sample_size: DEFAULT_SAMPLE_SIZE,
            policy,
        }
    }

    pub fn with_sample_size(mut self, n: usize) -> Self {
        self.sample_size = n;
        self
    }

    /// Best-effort: a failed transition is logged, the item stays selected.
    async fn mark_selected(&self, items: &[ReadingItem], log: &mut ErrorLog) {
        for item in items {
            match self.backend.mark_completed(&item.external_id).await {
                Ok(()) => {
                    tracing::info!(target: "digest", title = %item.title, "reading item marked completed")
                }
                Err(e) => log.push(format!(
                    "Błąd podczas aktualizacji statusu artykułu '{}': {e:#}",
                    item.title
                )),
            }
        }
    }
}

#[async_trait::async_trait]
impl SourceProvider for ReadingListProvider {
    type Snapshot = Vec<ReadingItem>;

    async fn fetch(&self, log: &mut ErrorLog) -> Vec<ReadingItem> {
        let pending = self
            .policy
            .execute("Notion", log, || self.backend.query_pending())
            .await
            .unwrap_or_default();

        // ThreadRng is !Send; keep it out of scope across the await below.
        let selected = select_sample(pending, self.sample_size, &mut rand::rng());
        self.mark_selected(&selected, log).await;
        tracing::info!(target: "digest", count = selected.len(), "reading items selected");
        selected
    }

    fn name(&self) -> &'static str {
        "reading_list"
    }
}

/// Uniform sample without replacement of `n` items; all of them when `n` or fewer.
/// Sampled items keep their original relative order.
pub fn select_sample<R: Rng + ?Sized>(
    items: Vec<ReadingItem>,
    n: usize,
    rng: &mut R,
) -> Vec<ReadingItem> {
    if items.len() <= n {
        return items;
    }
    let mut picked = rand::seq::index::sample(rng, items.len(), n).into_vec();
    picked.sort_unstable();
    items
        .into_iter()
        .enumerate()
        .filter(|(i, _)| picked.binary_search(i).is_ok())
        .map(|(_, item)| item)
        .collect()
}
