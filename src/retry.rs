// src/retry.rs
//! Bounded fixed-delay retry around a fallible async operation, plus the
//! per-run `ErrorLog` that collects every failure that was recovered from.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use metrics::counter;
use serde::{Deserialize, Serialize};

pub const DEFAULT_ATTEMPTS: u32 = 3;
pub const DEFAULT_DELAY_SECS: u64 = 2;

/// Outcome of one retried operation. Never both a value and a cause.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationResult<T> {
    Success(T),
    Failure { cause: String },
}

impl<T> OperationResult<T> {
    pub fn is_success(&self) -> bool {
        matches!(self, OperationResult::Success(_))
    }

    pub fn ok(self) -> Option<T> {
        match self {
            OperationResult::Success(v) => Some(v),
            OperationResult::Failure { .. } => None,
        }
    }

    pub fn unwrap_or_else(self, f: impl FnOnce(&str) -> T) -> T {
        match self {
            OperationResult::Success(v) => v,
            OperationResult::Failure { cause } => f(&cause),
        }
    }
}

impl<T: Default> OperationResult<T> {
    pub fn unwrap_or_default(self) -> T {
        self.unwrap_or_else(|_| T::default())
    }
}

/// Ordered, append-only record of failures for a single run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorLog {
    entries: Vec<String>,
}

impl ErrorLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entry: impl Into<String>) {
        let entry = entry.into();
        tracing::error!(target: "digest", entry = %entry, "error log entry");
        self.entries.push(entry);
    }

    /// Append all entries of `other`, keeping their order.
    pub fn merge(&mut self, other: ErrorLog) {
        self.entries.extend(other.entries);
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl From<Vec<String>> for ErrorLog {
    fn from(entries: Vec<String>) -> Self {
        Self { entries }
    }
}

/// Marks an error as not worth retrying (missing credentials, auth rejected...).
#[derive(Debug)]
pub struct NonRetryable(pub String);

impl fmt::Display for NonRetryable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for NonRetryable {}

pub fn non_retryable(msg: impl Into<String>) -> anyhow::Error {
    anyhow::Error::new(NonRetryable(msg.into()))
}

fn is_non_retryable(err: &anyhow::Error) -> bool {
    err.chain()
        .any(|cause| cause.downcast_ref::<NonRetryable>().is_some())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_ATTEMPTS,
            delay: Duration::from_secs(DEFAULT_DELAY_SECS),
        }
    }
}

impl RetryPolicy {
    /// `attempts` == 0 is treated as 1.
    pub fn new(attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: attempts.max(1),
            delay,
        }
    }

    /// Run `op` up to `max_attempts` times with a fixed pause in between.
    ///
    /// The first success is returned as is. When every attempt fails, exactly one
    /// entry naming `operation` and the attempt count is appended to `log`.
    pub async fn execute<T, F, Fut>(
        &self,
        operation: &str,
        log: &mut ErrorLog,
        mut op: F,
    ) -> OperationResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = anyhow::Result<T>>,
    {
        let max = self.max_attempts.max(1);
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            counter!("digest_operation_attempts_total").increment(1);
            match op().await {
                Ok(value) => {
                    tracing::info!(target: "digest", operation, attempt, "operation succeeded");
                    return OperationResult::Success(value);
                }
                Err(e) => {
                    tracing::warn!(target: "digest", operation, attempt, error = %format!("{e:#}"), "operation attempt failed");
                    let give_up = attempt >= max || is_non_retryable(&e);
                    if give_up {
                        let cause = format!("{e:#}");
                        counter!("digest_operation_failures_total").increment(1);
                        log.push(failure_entry(operation, attempt, &cause));
                        return OperationResult::Failure { cause };
                    }
                    if !self.delay.is_zero() {
                        tokio::time::sleep(self.delay).await;
                    }
                }
            }
        }
    }
}

fn failure_entry(operation: &str, attempts: u32, cause: &str) -> String {
    format!("{operation} - nieudane próby: {attempts}, ostatni błąd: {cause}")
}
