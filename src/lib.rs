// src/lib.rs
// Public library surface for the binaries and integration tests.

pub mod backends;
pub mod config;
pub mod notify;
pub mod pipeline;
pub mod render;
pub mod report;
pub mod retry;
pub mod sources;
pub mod synth;

// ---- Re-exports for stable public API ----
pub use crate::pipeline::{Collaborators, DigestPipeline, PipelineSettings, RunOutcome, RunStage};
pub use crate::report::DigestReport;
pub use crate::retry::{ErrorLog, OperationResult, RetryPolicy};
pub use crate::sources::RunClock;
