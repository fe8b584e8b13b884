use std::sync::{
    Arc,
    atomic::{AtomicU32, Ordering},
};

use anyhow::{Result, anyhow};
use notification_feed::{config::Config, utils::retry_with_backoff};
use tokio::time::Instant;

fn session_write_retry(max_attempts: u32) -> notification_feed::models::retry::RetryConfig {
    let mut config = Config::new("http://backend");
    config.max_retry_attempts = max_attempts;
    config.initial_retry_delay_ms = 50;
    config.max_retry_delay_ms = 200;
    config.retry_backoff_multiplier = 2;
    config.retry_config()
}

/// Test: A write that succeeds first time is not repeated
#[tokio::test]
async fn test_successful_write_runs_once() -> Result<()> {
    let config = session_write_retry(3);
    let attempts = Arc::new(AtomicU32::new(0));

    let result = retry_with_backoff(&config, || {
        let attempts = Arc::clone(&attempts);
        async move {
            attempts.fetch_add(1, Ordering::SeqCst);
            Ok::<_, anyhow::Error>("stored")
        }
    })
    .await?;

    assert_eq!(result, "stored");
    assert_eq!(attempts.load(Ordering::SeqCst), 1);

    Ok(())
}

/// Test: Transient write failures are retried until one succeeds
#[tokio::test]
async fn test_transient_failures_are_retried() -> Result<()> {
    let config = session_write_retry(5);
    let attempts = Arc::new(AtomicU32::new(0));

    let result = retry_with_backoff(&config, || {
        let attempts = Arc::clone(&attempts);
        async move {
            if attempts.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(anyhow!("connection reset"))
            } else {
                Ok("stored")
            }
        }
    })
    .await?;

    assert_eq!(result, "stored");
    assert_eq!(attempts.load(Ordering::SeqCst), 3);

    Ok(())
}

/// Test: Persistent failures stop after the configured attempts
#[tokio::test]
async fn test_persistent_failure_exhausts_attempts() -> Result<()> {
    let config = session_write_retry(4);
    let attempts = Arc::new(AtomicU32::new(0));

    let result = retry_with_backoff(&config, || {
        let attempts = Arc::clone(&attempts);
        async move {
            attempts.fetch_add(1, Ordering::SeqCst);
            Err::<(), _>(anyhow!("read-only replica"))
        }
    })
    .await;

    assert!(result.is_err());
    assert_eq!(attempts.load(Ordering::SeqCst), 4);

    Ok(())
}

/// Test: Delays between attempts never exceed the cap
#[tokio::test]
async fn test_backoff_respects_max_delay() -> Result<()> {
    let config = session_write_retry(5);
    let start = Instant::now();
    let times = Arc::new(tokio::sync::Mutex::new(Vec::new()));

    let _ = retry_with_backoff(&config, || {
        let times = Arc::clone(&times);
        async move {
            times.lock().await.push(start.elapsed().as_millis());
            Err::<(), _>(anyhow!("unavailable"))
        }
    })
    .await;

    let times = times.lock().await;
    assert_eq!(times.len(), 5);

    for pair in times.windows(2) {
        let delay = pair[1] - pair[0];
        assert!(
            delay <= (config.max_delay_ms * 15 / 10) as u128,
            "delay {} exceeded cap",
            delay
        );
    }

    Ok(())
}
