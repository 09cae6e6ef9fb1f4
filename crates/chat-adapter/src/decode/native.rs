//! DashScope native incremental-output decoder.
//!
//! The upstream body is a sequence of JSON frames. Depending on the endpoint
//! and gateway the frames arrive wrapped in SSE field lines (`id:`, `event:`,
//! `data:`), one per line, or simply concatenated. The text payload moves
//! around between frame shapes, so extraction tries [`TEXT_EXTRACTORS`] in
//! order.

use serde_json::Value;
use tracing::{debug, warn};

use super::FrameDecoder;
use crate::errors::AdapterError;
use crate::finish::FinishReason;
use crate::model::ProviderId;
use crate::provider::ProviderEvent;
use crate::usage::Usage;

/// Pulls a text payload out of one frame shape.
pub type TextExtractor = fn(&Value) -> Option<&str>;

/// Known frame shapes, highest priority first.
pub const TEXT_EXTRACTORS: &[(&str, TextExtractor)] = &[
    ("data.output.text", wrapped_output_text),
    ("output.text", output_text),
    ("string", bare_string),
    ("output", output_string),
];

fn wrapped_output_text(frame: &Value) -> Option<&str> {
    frame.get("data")?.get("output")?.get("text")?.as_str()
}

fn output_text(frame: &Value) -> Option<&str> {
    frame.get("output")?.get("text")?.as_str()
}

fn bare_string(frame: &Value) -> Option<&str> {
    frame.as_str()
}

fn output_string(frame: &Value) -> Option<&str> {
    frame.get("output")?.as_str()
}

/// Returns the text of the first matching frame shape.
pub fn extract_text(frame: &Value) -> Option<&str> {
    TEXT_EXTRACTORS
        .iter()
        .find_map(|(_, extractor)| extractor(frame))
}

/// Object carrying `output` and `usage`, looking through a `data` wrapper.
pub(crate) fn payload_root(frame: &Value) -> &Value {
    match frame.get("data") {
        Some(data) if data.is_object() => data,
        _ => frame,
    }
}

/// Reads `usage.input_tokens` / `usage.output_tokens` when both are present.
pub(crate) fn native_usage(root: &Value) -> Option<Usage> {
    let usage = root.get("usage")?;
    let prompt = usage.get("input_tokens")?.as_u64()?;
    let completion = usage.get("output_tokens")?.as_u64()?;
    Some(Usage::new(
        u32::try_from(prompt).unwrap_or(u32::MAX),
        u32::try_from(completion).unwrap_or(u32::MAX),
    ))
}

pub(crate) fn native_finish_reason(root: &Value) -> Option<FinishReason> {
    root.get("output")?
        .get("finish_reason")?
        .as_str()
        .and_then(FinishReason::from_reported)
}

#[derive(Debug, PartialEq)]
enum LineState {
    /// At the start of a line, before any significant byte.
    Start,
    /// Reading what may be an SSE field name.
    Field(Vec<u8>),
    /// Just after `data:`.
    DataValue,
    /// Bytes belong to a JSON frame.
    Payload,
    /// Rest of the line is ignored.
    Skip,
}

/// Incremental decoder for DashScope native frames.
pub struct NativeFrameDecoder {
    provider: ProviderId,
    line: LineState,
    json_buf: Vec<u8>,
    frames: usize,
    upstream_message: Option<String>,
    last_parse_error: Option<AdapterError>,
}

impl NativeFrameDecoder {
    pub fn new(provider: impl Into<ProviderId>) -> Self {
        Self {
            provider: provider.into(),
            line: LineState::Start,
            json_buf: Vec::new(),
            frames: 0,
            upstream_message: None,
            last_parse_error: None,
        }
    }

    fn feed(&mut self, chunk: &[u8]) {
        for &byte in chunk {
            match &mut self.line {
                LineState::Start => match byte {
                    b'\n' | b'\r' | b' ' | b'\t' => {}
                    b':' => self.line = LineState::Skip,
                    b if b.is_ascii_alphabetic() => self.line = LineState::Field(vec![b]),
                    b => {
                        self.json_buf.push(b);
                        self.line = LineState::Payload;
                    }
                },
                LineState::Field(name) => match byte {
                    b':' => {
                        self.line = if name.as_slice() == b"data" {
                            LineState::DataValue
                        } else {
                            LineState::Skip
                        };
                    }
                    b if b.is_ascii_alphanumeric() || b == b'-' || b == b'_' => name.push(b),
                    b => {
                        // Not a field name after all: a bare token such as `null`.
                        self.json_buf.extend_from_slice(name);
                        self.json_buf.push(b);
                        self.line = if b == b'\n' {
                            LineState::Start
                        } else {
                            LineState::Payload
                        };
                    }
                },
                LineState::DataValue => match byte {
                    b' ' => self.line = LineState::Payload,
                    b'\n' => self.line = LineState::Start,
                    b => {
                        self.json_buf.push(b);
                        self.line = LineState::Payload;
                    }
                },
                LineState::Payload => {
                    self.json_buf.push(byte);
                    if byte == b'\n' {
                        self.line = LineState::Start;
                    }
                }
                LineState::Skip => {
                    if byte == b'\n' {
                        self.line = LineState::Start;
                    }
                }
            }
        }
    }

    fn drain_frames(&mut self, events: &mut Vec<ProviderEvent>) {
        loop {
            let Some(start) = self
                .json_buf
                .iter()
                .position(|b| !b.is_ascii_whitespace())
            else {
                self.json_buf.clear();
                return;
            };
            self.json_buf.drain(..start);

            let (next, consumed) = {
                let mut frames =
                    serde_json::Deserializer::from_slice(&self.json_buf).into_iter::<Value>();
                let next = frames.next();
                (next, frames.byte_offset())
            };
            match next {
                Some(Ok(frame)) => {
                    self.json_buf.drain(..consumed);
                    self.handle_frame(&frame, events);
                }
                Some(Err(err)) if err.is_eof() => return,
                Some(Err(err)) => {
                    self.last_parse_error = Some(super::malformed(&self.provider, &err));
                    self.skip_line();
                }
                None => return,
            }
        }
    }

    /// Discards the malformed frame up to the end of its line.
    fn skip_line(&mut self) {
        match self.json_buf.iter().position(|b| *b == b'\n') {
            Some(end) => {
                self.json_buf.drain(..=end);
            }
            None => {
                self.json_buf.clear();
                if self.line == LineState::Payload {
                    self.line = LineState::Skip;
                }
            }
        }
    }

    fn handle_frame(&mut self, frame: &Value, events: &mut Vec<ProviderEvent>) {
        let root = payload_root(frame);
        let text = extract_text(frame);
        let usage = native_usage(root);
        let finish_reason = native_finish_reason(root);

        if text.is_none() && usage.is_none() && root.get("output").is_none() {
            if let Some(message) = frame.get("message").and_then(Value::as_str) {
                self.upstream_message = Some(message.to_string());
            }
            debug!(provider = %self.provider, "ignoring frame with no recognizable payload");
            return;
        }
        self.frames += 1;

        if let Some(text) = text.filter(|t| !t.is_empty()) {
            events.push(ProviderEvent::TextDelta {
                text: text.to_string(),
            });
        }
        if let Some(reason) = finish_reason {
            events.push(ProviderEvent::FinishReason(reason));
        }
        if let Some(usage) = usage {
            events.push(ProviderEvent::Usage(usage));
        }
    }
}

impl FrameDecoder for NativeFrameDecoder {
    fn push_chunk(&mut self, chunk: &[u8]) -> Vec<ProviderEvent> {
        self.feed(chunk);
        let mut events = Vec::new();
        self.drain_frames(&mut events);
        events
    }

    fn finish(&mut self) -> Result<Vec<ProviderEvent>, AdapterError> {
        // A trailing bare token never saw its line end.
        if let LineState::Field(name) = std::mem::replace(&mut self.line, LineState::Start) {
            self.json_buf.extend_from_slice(&name);
        }
        let mut events = Vec::new();
        self.drain_frames(&mut events);
        if !self.json_buf.is_empty() {
            warn!(
                provider = %self.provider,
                bytes = self.json_buf.len(),
                "discarding truncated trailing frame"
            );
            self.json_buf.clear();
        }

        if self.frames == 0 {
            let message = super::nothing_decoded(
                "frames",
                self.upstream_message.take(),
                self.last_parse_error.take(),
            );
            return Err(AdapterError::invalid_shape(&self.provider, message));
        }
        Ok(events)
    }
}
