//! Stress test for the request queue: many tasks with randomized durations
//! and injected rate limits, checking the concurrency bound and that every
//! task settles exactly once.

use magline::{MaglineError, QueueConfig, RequestQueue};
use rand::Rng;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;

#[tokio::test(start_paused = true)]
async fn randomized_load_respects_the_concurrency_bound() {
    let max_concurrent = 3;
    let queue = RequestQueue::new(QueueConfig {
        max_concurrent,
        base_retry_delay: Duration::from_millis(10),
        max_retries: 3,
        min_interval: None,
    });

    let current = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));

    // pre-roll the randomness so the request functions stay deterministic
    // across retry invocations
    let mut rng = rand::thread_rng();
    let plans: Vec<(u64, usize)> = (0..40)
        .map(|_| (rng.gen_range(0..20), rng.gen_range(0..3)))
        .collect();

    let mut handles = Vec::new();
    for (i, (delay_ms, rate_limits)) in plans.into_iter().enumerate() {
        let queue = Arc::clone(&queue);
        let current = Arc::clone(&current);
        let peak = Arc::clone(&peak);
        handles.push(tokio::spawn(async move {
            let attempts = Arc::new(AtomicUsize::new(0));
            queue
                .add(move || {
                    let current = Arc::clone(&current);
                    let peak = Arc::clone(&peak);
                    let attempts = Arc::clone(&attempts);
                    async move {
                        let now = current.fetch_add(1, Ordering::SeqCst) + 1;
                        peak.fetch_max(now, Ordering::SeqCst);
                        sleep(Duration::from_millis(delay_ms)).await;
                        current.fetch_sub(1, Ordering::SeqCst);

                        if attempts.fetch_add(1, Ordering::SeqCst) < rate_limits {
                            Err(MaglineError::Status(429))
                        } else {
                            Ok(i)
                        }
                    }
                })
                .await
        }));
    }

    for (i, handle) in handles.into_iter().enumerate() {
        let result = handle.await.expect("join");
        assert_eq!(result.expect("task settles successfully"), i);
    }

    let peak = peak.load(Ordering::SeqCst);
    assert!(
        peak <= max_concurrent,
        "peak concurrency {} exceeded bound {}",
        peak,
        max_concurrent
    );
    assert_eq!(current.load(Ordering::SeqCst), 0, "all slots released");
}
