//! Incremental consumer for the `data: <json>` event stream
//!
//! The batch magnet endpoint flushes one newline-terminated record per movie
//! as soon as it is resolved. Records are decoded and handed to the caller in
//! arrival order without waiting for the full body, so the caller can update
//! per-movie state while later lookups are still running server-side.

use crate::stream::events::BatchEvent;
use crate::utils::error::MaglineError;
use futures::{Stream, StreamExt, TryStreamExt};
use serde_json::Value;
use tracing::{debug, warn};

const DATA_PREFIX: &str = "data: ";

/// Describes the single HTTP call a consumer run performs
#[derive(Debug, Clone)]
pub struct StreamRequest {
    pub url: String,
    pub body: Value,
}

/// Issues one streaming POST and dispatches decoded events
pub struct StreamConsumer {
    http: reqwest::Client,
}

impl StreamConsumer {
    pub fn new(http: reqwest::Client) -> Self {
        Self { http }
    }

    /// Perform the request and invoke `on_event` once per decoded record.
    ///
    /// Fails fast on a non-2xx response or a transport error mid-stream; no
    /// retry happens here, that is the caller's decision. Resolves at
    /// end-of-stream whether or not a `complete` record was seen, so callers
    /// that need the full batch must check for it themselves.
    pub async fn consume<F>(&self, request: StreamRequest, on_event: F) -> Result<(), MaglineError>
    where
        F: FnMut(BatchEvent),
    {
        let response = self
            .http
            .post(&request.url)
            .json(&request.body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(MaglineError::Status(status.as_u16()));
        }

        let body = response.bytes_stream().map_err(MaglineError::from);
        decode_event_stream(body, on_event).await
    }
}

/// Decode a chunked byte stream of `data: <json>\n` records.
///
/// Chunk boundaries are arbitrary: a partial trailing line is buffered until
/// the next chunk completes it, so the delivered event sequence is identical
/// no matter how the transport splits the body. Bytes left without a trailing
/// newline when the stream ends are discarded.
pub async fn decode_event_stream<S, B, F>(stream: S, mut on_event: F) -> Result<(), MaglineError>
where
    S: Stream<Item = Result<B, MaglineError>>,
    B: AsRef<[u8]>,
    F: FnMut(BatchEvent),
{
    futures::pin_mut!(stream);
    let mut buffer: Vec<u8> = Vec::new();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        buffer.extend_from_slice(chunk.as_ref());

        while let Some(pos) = buffer.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = buffer.drain(..=pos).collect();
            if let Some(event) = parse_record(&line[..line.len() - 1]) {
                on_event(event);
            }
        }
    }

    if !buffer.is_empty() {
        debug!(
            bytes = buffer.len(),
            "discarding unterminated trailing record"
        );
    }
    Ok(())
}

/// Parse one complete line; anything malformed is logged and skipped
fn parse_record(line: &[u8]) -> Option<BatchEvent> {
    let text = match std::str::from_utf8(line) {
        Ok(text) => text.trim_end_matches('\r'),
        Err(err) => {
            warn!(error = %err, "skipping non-UTF-8 stream line");
            return None;
        }
    };

    if text.is_empty() {
        return None;
    }

    let json = match text.strip_prefix(DATA_PREFIX) {
        Some(json) => json,
        None => {
            warn!(line = text, "skipping stream line without data prefix");
            return None;
        }
    };

    match serde_json::from_str(json) {
        Ok(event) => Some(event),
        Err(err) => {
            warn!(error = %err, line = text, "skipping malformed stream record");
            None
        }
    }
}
