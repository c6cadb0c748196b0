//! Bounded-concurrency request queue with rate-limit aware retry
//!
//! All backend lookups for a session route through one shared queue instance,
//! which is the whole point of admission control: the client never issues
//! unbounded concurrent requests, dispatch start-times can be spaced out, and
//! HTTP 429 responses push the task back to the tail with exponential backoff.

use crate::utils::error::MaglineError;
use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{oneshot, Mutex};
use tokio::time::{sleep, Instant};
use tracing::{debug, warn};
use uuid::Uuid;

/// Boxed future produced by a queued request function
pub type RequestFuture<T> = Pin<Box<dyn Future<Output = Result<T, MaglineError>> + Send>>;

/// Zero-argument request producer; may be invoked again on retry
pub type RequestFn<T> = Box<dyn Fn() -> RequestFuture<T> + Send + Sync>;

/// Queue configuration
#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// Upper bound on simultaneously in-flight tasks
    pub max_concurrent: usize,
    /// Base of the exponential backoff applied to rate-limited tasks
    pub base_retry_delay: Duration,
    /// Cap on retry attempts per task
    pub max_retries: usize,
    /// Minimum spacing between dispatch start-times, when configured
    pub min_interval: Option<Duration>,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            max_concurrent: 2,
            base_retry_delay: Duration::from_secs(3),
            max_retries: 3,
            min_interval: None,
        }
    }
}

/// A request admitted to the queue, owned by it until settled
struct QueuedTask<T> {
    id: Uuid,
    request_fn: RequestFn<T>,
    done: oneshot::Sender<Result<T, MaglineError>>,
    retries: usize,
}

struct QueueState<T> {
    pending: VecDeque<QueuedTask<T>>,
    running: usize,
    last_dispatch: Option<Instant>,
}

/// Admission-control queue for outbound requests
pub struct RequestQueue<T> {
    config: QueueConfig,
    state: Mutex<QueueState<T>>,
}

impl<T: Send + 'static> RequestQueue<T> {
    /// Create a new queue; wrap in `Arc` so all callers share one instance
    pub fn new(config: QueueConfig) -> Arc<Self> {
        let config = QueueConfig {
            max_concurrent: config.max_concurrent.max(1),
            ..config
        };
        Arc::new(Self {
            config,
            state: Mutex::new(QueueState {
                pending: VecDeque::new(),
                running: 0,
                last_dispatch: None,
            }),
        })
    }

    pub fn config(&self) -> &QueueConfig {
        &self.config
    }

    /// Enqueue a request-producing operation and wait for its final outcome.
    ///
    /// The operation may be invoked more than once if the queue retries it
    /// after a rate-limited response, so it should be idempotent. The returned
    /// future settles once the operation succeeds or exhausts its retries.
    pub async fn add<F, Fut>(self: &Arc<Self>, request_fn: F) -> Result<T, MaglineError>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, MaglineError>> + Send + 'static,
    {
        self.add_boxed(Box::new(move || Box::pin(request_fn()) as RequestFuture<T>))
            .await
    }

    /// Enqueue an already-boxed request function
    pub async fn add_boxed(self: &Arc<Self>, request_fn: RequestFn<T>) -> Result<T, MaglineError> {
        let (done, outcome) = oneshot::channel();
        let task = QueuedTask {
            id: Uuid::new_v4(),
            request_fn,
            done,
            retries: 0,
        };
        debug!(task = %task.id, "enqueued request");
        {
            let mut state = self.state.lock().await;
            state.pending.push_back(task);
        }
        self.spawn_drain(None);

        match outcome.await {
            Ok(result) => result,
            Err(_) => Err(MaglineError::OperationFailed(
                "request queue dropped the task".to_string(),
            )),
        }
    }

    /// Schedule a drain attempt, optionally after a delay
    fn spawn_drain(self: &Arc<Self>, delay: Option<Duration>) {
        let queue = Arc::clone(self);
        tokio::spawn(async move {
            if let Some(delay) = delay {
                sleep(delay).await;
            }
            queue.drain().await;
        });
    }

    /// Dispatch pending tasks while a slot is free, honoring `min_interval`
    ///
    /// Returns a boxed future to break the recursive async cycle
    /// (run -> release_and_drain -> drain -> run), which the compiler
    /// otherwise cannot prove `Send`.
    fn drain(self: Arc<Self>) -> Pin<Box<dyn Future<Output = ()> + Send>> {
        Box::pin(async move {
        loop {
            let task = {
                let mut state = self.state.lock().await;
                if state.running >= self.config.max_concurrent || state.pending.is_empty() {
                    return;
                }

                if let Some(min) = self.config.min_interval {
                    if let Some(last) = state.last_dispatch {
                        let since = last.elapsed();
                        if since < min {
                            // too soon, defer the whole drain pass
                            drop(state);
                            self.spawn_drain(Some(min - since));
                            return;
                        }
                    }
                }

                match state.pending.pop_front() {
                    Some(task) => {
                        state.running += 1;
                        state.last_dispatch = Some(Instant::now());
                        task
                    }
                    None => return,
                }
            };

            let queue = Arc::clone(&self);
            tokio::spawn(async move {
                queue.run(task).await;
            });
        }
        })
    }

    /// Run one dispatched task to settlement, requeue, or rejection
    async fn run(self: Arc<Self>, task: QueuedTask<T>) {
        debug!(task = %task.id, attempt = task.retries + 1, "dispatching request");
        let result = (task.request_fn)().await;

        match result {
            Ok(value) => {
                let _ = task.done.send(Ok(value));
                self.release_and_drain().await;
            }
            Err(err) if err.is_rate_limited() && task.retries < self.config.max_retries => {
                let delay = backoff_delay(self.config.base_retry_delay, task.retries);
                warn!(task = %task.id, error = %err, delay_ms = delay.as_millis() as u64, "rate limited, requeueing after backoff");
                // the slot stays held for the backoff window, then the task
                // goes back to the tail with its retry count bumped
                let queue = Arc::clone(&self);
                tokio::spawn(async move {
                    sleep(delay).await;
                    {
                        let mut state = queue.state.lock().await;
                        state.pending.push_back(QueuedTask {
                            retries: task.retries + 1,
                            ..task
                        });
                        state.running -= 1;
                    }
                    queue.spawn_drain(None);
                });
            }
            Err(err) => {
                debug!(task = %task.id, error = %err, "request failed permanently");
                let _ = task.done.send(Err(err));
                self.release_and_drain().await;
            }
        }
    }

    /// Free the slot and look for more work
    async fn release_and_drain(self: Arc<Self>) {
        {
            let mut state = self.state.lock().await;
            state.running -= 1;
        }
        match self.config.min_interval {
            Some(min) => self.spawn_drain(Some(min)),
            None => self.drain().await,
        }
    }
}

/// Backoff delay for the given attempt index: `base * 2^attempt`
pub fn backoff_delay(base: Duration, attempt: usize) -> Duration {
    base.saturating_mul(1u32 << attempt.min(31))
}
