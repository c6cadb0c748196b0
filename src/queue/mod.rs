pub mod request_queue;
pub mod retry;

pub use request_queue::{backoff_delay, QueueConfig, RequestFn, RequestFuture, RequestQueue};
pub use retry::{retry_with_backoff, RetryPolicy};
