//! Tests for the incremental event-stream decoder: record framing across
//! arbitrary chunk boundaries, malformed-line tolerance, and failure modes.

use futures::stream;
use magline::api::models::MagnetRef;
use magline::{decode_event_stream, BatchEvent, MaglineError};
use proptest::prelude::*;
use tokio_test::assert_ok;

const FIXTURE: &str = concat!(
    "data: {\"type\":\"start\",\"total\":2}\n",
    "data: {\"type\":\"progress\",\"movie_id\":\"ABC-001\",\"success\":true,\"best_magnet\":{\"link\":\"magnet:?xt=urn:btih:abc\",\"size\":\"4.2GB\"}}\n",
    "data: {\"type\":\"progress\",\"movie_id\":\"ABC-002\",\"success\":false,\"error\":\"暂无可用资源\"}\n",
    "data: {\"type\":\"complete\"}\n",
);

fn fixture_events() -> Vec<BatchEvent> {
    vec![
        BatchEvent::Start { total: 2 },
        BatchEvent::Progress {
            movie_id: "ABC-001".to_string(),
            success: true,
            best_magnet: Some(MagnetRef {
                link: "magnet:?xt=urn:btih:abc".to_string(),
                title: String::new(),
                size: Some("4.2GB".to_string()),
                number_size: None,
                date: None,
                has_subtitle: false,
            }),
            is_downloaded: None,
            error: None,
        },
        BatchEvent::Progress {
            movie_id: "ABC-002".to_string(),
            success: false,
            best_magnet: None,
            is_downloaded: None,
            error: Some("暂无可用资源".to_string()),
        },
        BatchEvent::Complete,
    ]
}

/// Feed chunks through the decoder and collect the dispatched events.
/// The decoder only awaits ready stream items, so no runtime is needed.
fn collect(chunks: Vec<Vec<u8>>) -> (Result<(), MaglineError>, Vec<BatchEvent>) {
    let mut events = Vec::new();
    let result = futures::executor::block_on(decode_event_stream(
        stream::iter(chunks.into_iter().map(Ok::<_, MaglineError>)),
        |event| events.push(event),
    ));
    (result, events)
}

#[test]
fn fixture_decodes_to_four_events_in_order() {
    let (result, events) = collect(vec![FIXTURE.as_bytes().to_vec()]);
    assert_ok!(result);
    assert_eq!(events, fixture_events());
}

#[test]
fn record_split_across_two_chunks_is_reassembled() {
    let (result, events) = collect(vec![
        b"data: {\"type\":\"sta".to_vec(),
        b"rt\",\"total\":3}\ndata: {\"type\":\"complete\"}\n".to_vec(),
    ]);
    assert_ok!(result);
    assert_eq!(
        events,
        vec![BatchEvent::Start { total: 3 }, BatchEvent::Complete]
    );
}

#[test]
fn multibyte_character_split_across_chunks_survives() {
    let bytes = FIXTURE.as_bytes();
    // cut inside the multi-byte error string
    let cut = FIXTURE.find("暂").expect("fixture has the error string") + 1;
    let (result, events) = collect(vec![bytes[..cut].to_vec(), bytes[cut..].to_vec()]);
    assert_ok!(result);
    assert_eq!(events, fixture_events());
}

#[test]
fn one_byte_chunks_yield_the_same_events() {
    let chunks = FIXTURE.as_bytes().iter().map(|b| vec![*b]).collect();
    let (result, events) = collect(chunks);
    assert_ok!(result);
    assert_eq!(events, fixture_events());
}

#[test]
fn malformed_and_non_data_lines_are_skipped() {
    let body = concat!(
        "data: {\"type\":\"start\",\"total\":1}\n",
        ": keep-alive\n",
        "\n",
        "data: {broken json\n",
        "event: something-else\n",
        "data: {\"type\":\"complete\"}\n",
    );
    let (result, events) = collect(vec![body.as_bytes().to_vec()]);
    assert_ok!(result);
    assert_eq!(
        events,
        vec![BatchEvent::Start { total: 1 }, BatchEvent::Complete]
    );
}

#[test]
fn unterminated_trailing_record_is_discarded() {
    let body = "data: {\"type\":\"start\",\"total\":1}\ndata: {\"type\":\"complete\"}";
    let (result, events) = collect(vec![body.as_bytes().to_vec()]);
    assert_ok!(result);
    assert_eq!(events, vec![BatchEvent::Start { total: 1 }]);
}

#[test]
fn transport_error_mid_stream_aborts_after_delivered_events() {
    let chunks: Vec<Result<Vec<u8>, MaglineError>> = vec![
        Ok(b"data: {\"type\":\"start\",\"total\":5}\n".to_vec()),
        Err(MaglineError::Status(502)),
    ];
    let mut events = Vec::new();
    let result = futures::executor::block_on(decode_event_stream(
        stream::iter(chunks),
        |event| events.push(event),
    ));
    assert_eq!(result.expect_err("transport error").status(), Some(502));
    assert_eq!(events, vec![BatchEvent::Start { total: 5 }]);
}

#[test]
fn crlf_terminated_records_decode() {
    let body = "data: {\"type\":\"start\",\"total\":1}\r\ndata: {\"type\":\"complete\"}\r\n";
    let (result, events) = collect(vec![body.as_bytes().to_vec()]);
    assert_ok!(result);
    assert_eq!(
        events,
        vec![BatchEvent::Start { total: 1 }, BatchEvent::Complete]
    );
}

proptest! {
    /// The delivered sequence is invariant under arbitrary chunk boundaries,
    /// including cuts through JSON records and multi-byte characters.
    #[test]
    fn chunk_boundaries_never_change_the_event_sequence(
        mut cuts in proptest::collection::vec(1usize..FIXTURE.len(), 0..8),
    ) {
        let bytes = FIXTURE.as_bytes();
        cuts.sort_unstable();
        cuts.dedup();

        let mut chunks = Vec::new();
        let mut prev = 0;
        for cut in cuts {
            chunks.push(bytes[prev..cut].to_vec());
            prev = cut;
        }
        chunks.push(bytes[prev..].to_vec());

        let (result, events) = collect(chunks);
        prop_assert!(result.is_ok());
        prop_assert_eq!(events, fixture_events());
    }
}
