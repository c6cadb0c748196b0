pub mod consumer;
pub mod events;

pub use consumer::{decode_event_stream, StreamConsumer, StreamRequest};
pub use events::BatchEvent;
