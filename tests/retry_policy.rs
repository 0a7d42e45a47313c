// tests/retry_policy.rs
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use anyhow::anyhow;
use daily_digest::retry::non_retryable;
use daily_digest::{ErrorLog, OperationResult, RetryPolicy};

#[tokio::test]
async fn fails_n_minus_one_then_succeeds_without_entries() {
    for max in 1..=4u32 {
        let policy = RetryPolicy::new(max, Duration::ZERO);
        let calls = AtomicU32::new(0);
        let mut log = ErrorLog::new();
        let out = policy
            .execute("Flaky", &mut log, || async {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                if n < max {
                    Err(anyhow!("attempt {n} failed"))
                } else {
                    Ok(n)
                }
            })
            .await;
        assert_eq!(out, OperationResult::Success(max));
        assert!(log.is_empty(), "max={max}");
        assert_eq!(calls.load(Ordering::SeqCst), max);
    }
}

#[tokio::test]
async fn exhaustion_records_one_entry_with_attempt_count() {
    let policy = RetryPolicy::new(3, Duration::ZERO);
    let calls = AtomicU32::new(0);
    let mut log = ErrorLog::new();
    let out: OperationResult<Vec<u8>> = policy
        .execute("OpenWeatherMap", &mut log, || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(anyhow!("timeout"))
        })
        .await;

    assert!(!out.is_success());
    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert_eq!(log.len(), 1);
    let entry = &log.entries()[0];
    assert!(entry.starts_with("OpenWeatherMap"));
    assert!(entry.contains("3"));
    assert!(entry.contains("timeout"));
    assert!(out.unwrap_or_default().is_empty());
}

#[tokio::test]
async fn non_retryable_stops_after_first_attempt() {
    let policy = RetryPolicy::new(5, Duration::ZERO);
    let calls = AtomicU32::new(0);
    let mut log = ErrorLog::new();
    let out: OperationResult<()> = policy
        .execute("Notion", &mut log, || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(non_retryable("brak konfiguracji: NOTION_TOKEN"))
        })
        .await;

    assert!(!out.is_success());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(
        log.entries(),
        ["Notion - nieudane próby: 1, ostatni błąd: brak konfiguracji: NOTION_TOKEN"]
    );
}

#[tokio::test(start_paused = true)]
async fn fixed_delay_between_attempts_only() {
    let policy = RetryPolicy::new(3, Duration::from_secs(2));
    let mut log = ErrorLog::new();
    let started = tokio::time::Instant::now();
    let _: OperationResult<()> = policy
        .execute("Slow", &mut log, || async { Err(anyhow!("nope")) })
        .await;
    // Two pauses between three attempts, none after the last.
    assert_eq!(started.elapsed(), Duration::from_secs(4));
    assert_eq!(log.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn delay_does_not_block_other_operations() {
    let policy = RetryPolicy::new(2, Duration::from_secs(2));
    let mut slow_log = ErrorLog::new();
    let mut fast_log = ErrorLog::new();
    let started = tokio::time::Instant::now();

    let (slow, fast) = tokio::join!(
        policy.execute("Slow", &mut slow_log, || async {
            Err::<u32, _>(anyhow!("down"))
        }),
        async {
            let out = policy
                .execute("Fast", &mut fast_log, || async { Ok::<_, anyhow::Error>(7) })
                .await;
            (out, started.elapsed())
        },
    );

    assert!(!slow.is_success());
    assert_eq!(fast.0, OperationResult::Success(7));
    assert_eq!(fast.1, Duration::ZERO);
    assert_eq!(slow_log.len(), 1);
    assert!(fast_log.is_empty());
}
