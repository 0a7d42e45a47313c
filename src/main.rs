//! Daily Digest: binary entrypoint.
//! Runs one digest job and exits; scheduling is left to cron or a systemd timer.
//!
//! Exit code is 0 whenever a digest (normal or degraded) reached the recipient.

use std::process::ExitCode;

use daily_digest::{config, DigestPipeline, RunClock, RunOutcome};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Compact logs by default; `DIGEST_LOG_FORMAT=json` for log shippers.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("daily_digest=info,digest=info,warn"));

    let json = std::env::var("DIGEST_LOG_FORMAT")
        .ok()
        .is_some_and(|v| v.eq_ignore_ascii_case("json"));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer().compact()).init();
    }
}

async fn run() -> anyhow::Result<RunOutcome> {
    let cfg = config::load_default()?;
    let missing = cfg.missing_credentials();
    if !missing.is_empty() {
        tracing::warn!(target: "digest", ?missing, "credentials missing, affected sources will be reported as errors");
    }
    let pipeline = DigestPipeline::from_config(&cfg)?;
    pipeline.run(RunClock::local_now()).await
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env in local/dev; no-op when the file is absent.
    let _ = dotenvy::dotenv();
    init_tracing();

    match run().await {
        Ok(RunOutcome::Delivered { report }) => {
            tracing::info!(target: "digest", errors = report.errors().len(), "run finished");
            ExitCode::SUCCESS
        }
        Ok(RunOutcome::Degraded { cause, .. }) => {
            tracing::warn!(target: "digest", %cause, "run finished with degraded digest");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(target: "digest", error = %format!("{e:#}"), "run failed");
            ExitCode::FAILURE
        }
    }
}
