// src/notify/mod.rs
pub mod email;
pub mod file;

use anyhow::Result;

use crate::render::RenderedDigest;

pub use email::EmailDispatcher;
pub use file::FileDispatcher;

/// Final hop of a run. Failures are reported to the caller, never retried here.
#[async_trait::async_trait]
pub trait Dispatcher: Send + Sync {
    async fn deliver(&self, doc: &RenderedDigest) -> Result<()>;
    fn name(&self) -> &'static str;
}
