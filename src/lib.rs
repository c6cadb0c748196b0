//! Magline library

pub mod api;
pub mod pikpak;
pub mod queue;
pub mod stream;
pub mod utils;

// Re-export main types for easier use
pub use api::{ApiClient, MagnetQuery, MagnetRef, MovieDetail, MovieListing, MovieQuery};
pub use pikpak::{Credentials, DownloadOutcome, Session};
pub use queue::{retry_with_backoff, QueueConfig, RequestQueue, RetryPolicy};
pub use stream::{decode_event_stream, BatchEvent, StreamConsumer, StreamRequest};
pub use utils::{AppSettings, MaglineError};
