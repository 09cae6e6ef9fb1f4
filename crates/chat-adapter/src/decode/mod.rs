//! Wire-protocol frame decoders.
//!
//! A decoder is fed raw body chunks as they arrive and returns the provider
//! events they complete. Chunk boundaries carry no meaning: a frame or line
//! may be split across any number of chunks.

use std::collections::VecDeque;

use futures::{Stream, StreamExt as _, stream};
use tracing::warn;

use crate::errors::AdapterError;
use crate::model::ProviderId;
use crate::provider::ProviderEvent;
use crate::transport::ByteStream;

pub mod native;
pub mod sse;

pub use native::NativeFrameDecoder;
pub use sse::SseLineDecoder;

/// Incremental decoder for one response body.
pub trait FrameDecoder: Send {
    /// Consumes a body chunk. Malformed frames are logged and skipped.
    fn push_chunk(&mut self, chunk: &[u8]) -> Vec<ProviderEvent>;

    /// Flushes buffered input at end of body.
    ///
    /// Fails with `InvalidResponseShape` when the body held nothing
    /// decodable.
    fn finish(&mut self) -> Result<Vec<ProviderEvent>, AdapterError>;

    /// Returns `true` once an end-of-stream sentinel was seen.
    fn is_done(&self) -> bool {
        false
    }
}

/// Logs input that failed to parse and returns it as a recoverable
/// `FrameParse` error.
pub(crate) fn malformed(provider: &ProviderId, err: &serde_json::Error) -> AdapterError {
    let err = AdapterError::frame_parse(provider, err.to_string());
    warn!(kind = %err.kind(), error = %err, "skipping malformed input");
    err
}

/// Message for a body that held nothing decodable.
pub(crate) fn nothing_decoded(
    what: &str,
    upstream_message: Option<String>,
    last_parse_error: Option<AdapterError>,
) -> String {
    match (upstream_message, last_parse_error) {
        (Some(message), _) => message,
        (None, Some(err)) => format!("no decodable {what} in response, last error: {err}"),
        (None, None) => format!("no decodable {what} in response"),
    }
}

/// Decodes a byte stream into provider events.
///
/// The byte stream is pulled only when no decoded event is waiting, and it is
/// dropped as soon as the decoder reports an end sentinel.
pub fn decode_stream(
    decoder: Box<dyn FrameDecoder>,
    bytes: ByteStream,
) -> impl Stream<Item = Result<ProviderEvent, AdapterError>> + Send {
    struct State {
        decoder: Box<dyn FrameDecoder>,
        bytes: Option<ByteStream>,
        pending: VecDeque<ProviderEvent>,
        finished: bool,
    }

    stream::try_unfold(
        State {
            decoder,
            bytes: Some(bytes),
            pending: VecDeque::new(),
            finished: false,
        },
        |mut state| async move {
            loop {
                if let Some(event) = state.pending.pop_front() {
                    return Ok(Some((event, state)));
                }
                if state.finished {
                    return Ok(None);
                }
                if state.decoder.is_done() {
                    state.bytes = None;
                }

                let next = match state.bytes.as_mut() {
                    Some(bytes) => bytes.next().await,
                    None => None,
                };
                match next {
                    Some(Ok(chunk)) => {
                        state.pending.extend(state.decoder.push_chunk(&chunk));
                    }
                    Some(Err(err)) => return Err(err),
                    None => {
                        state.bytes = None;
                        state.finished = true;
                        state.pending.extend(state.decoder.finish()?);
                    }
                }
            }
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    use crate::errors::ErrorKind;

    #[test]
    fn malformed_input_is_a_recoverable_frame_parse_error() {
        let parse_err = serde_json::from_str::<serde_json::Value>("{oops").expect_err("invalid");
        let err = malformed(&ProviderId::new("bailian"), &parse_err);
        assert_eq!(err.kind(), ErrorKind::FrameParse);
        assert!(!err.kind().is_fatal());
        assert_eq!(err.provider_id().as_str(), "bailian");
    }

    #[test]
    fn upstream_message_wins_over_parse_error() {
        let parse_err = AdapterError::frame_parse("x", "bad");
        assert_eq!(
            nothing_decoded("frames", Some("Invalid API-key".into()), Some(parse_err.clone())),
            "Invalid API-key"
        );
        assert!(nothing_decoded("frames", None, Some(parse_err)).contains("frame parse error (x): bad"));
        assert_eq!(nothing_decoded("lines", None, None), "no decodable lines in response");
    }

    fn byte_stream(chunks: Vec<&'static str>) -> ByteStream {
        Box::pin(stream::iter(
            chunks
                .into_iter()
                .map(|chunk| Ok(Bytes::from_static(chunk.as_bytes())))
                .collect::<Vec<_>>(),
        ))
    }

    #[tokio::test]
    async fn stops_reading_after_done_sentinel() {
        let bytes: ByteStream = Box::pin(
            byte_stream(vec![
                "data: {\"choices\":[{\"delta\":{\"content\":\"a\"}}]}\n",
                "data: [DONE]\n",
            ])
            .chain(stream::pending()),
        );
        let events: Vec<_> = decode_stream(Box::new(SseLineDecoder::new("deepseek")), bytes)
            .collect()
            .await;
        assert_eq!(
            events,
            vec![Ok(ProviderEvent::TextDelta { text: "a".into() })]
        );
    }

    #[tokio::test]
    async fn read_errors_surface_after_decoded_events() {
        let bytes: ByteStream = Box::pin(
            byte_stream(vec!["{\"output\":{\"text\":\"partial\"}}"]).chain(stream::iter(vec![
                Err(AdapterError::transport("bailian", "connection reset")),
            ])),
        );
        let events: Vec<_> = decode_stream(Box::new(NativeFrameDecoder::new("bailian")), bytes)
            .collect()
            .await;
        assert_eq!(events.len(), 2);
        assert_eq!(
            events[0],
            Ok(ProviderEvent::TextDelta {
                text: "partial".into()
            })
        );
        assert!(matches!(events[1], Err(AdapterError::Transport { .. })));
    }

    #[tokio::test]
    async fn empty_body_is_an_invalid_shape() {
        let events: Vec<_> =
            decode_stream(Box::new(NativeFrameDecoder::new("bailian")), byte_stream(vec![]))
                .collect()
                .await;
        assert!(matches!(
            events.as_slice(),
            [Err(AdapterError::InvalidResponseShape { .. })]
        ));
    }
}
