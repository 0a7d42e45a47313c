// src/notify/file.rs
use std::path::PathBuf;

use anyhow::{Context, Result};

use super::Dispatcher;
use crate::render::RenderedDigest;

/// Writes the HTML to disk instead of sending it (local dry runs).
pub struct FileDispatcher {
    path: PathBuf,
}

impl FileDispatcher {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait::async_trait]
impl Dispatcher for FileDispatcher {
    async fn deliver(&self, doc: &RenderedDigest) -> Result<()> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(dir)
                .await
                .with_context(|| format!("creating {}", dir.display()))?;
        }
        tokio::fs::write(&self.path, doc.html.as_bytes())
            .await
            .with_context(|| format!("writing {}", self.path.display()))?;
        tracing::info!(target: "digest", path = %self.path.display(), subject = %doc.subject, "digest written to file");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "file"
    }
}
