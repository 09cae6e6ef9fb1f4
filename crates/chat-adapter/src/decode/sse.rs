//! OpenAI-compatible chat-completion SSE decoder.

use serde_json::Value;
use tracing::debug;

use super::FrameDecoder;
use crate::errors::AdapterError;
use crate::finish::FinishReason;
use crate::model::ProviderId;
use crate::provider::ProviderEvent;
use crate::usage::Usage;

const DONE_SENTINEL: &str = "[DONE]";

/// Line-oriented decoder for `data: <json>` streams ending in `data: [DONE]`.
pub struct SseLineDecoder {
    provider: ProviderId,
    buf: Vec<u8>,
    done: bool,
    decoded_lines: usize,
    upstream_message: Option<String>,
    last_parse_error: Option<AdapterError>,
}

impl SseLineDecoder {
    pub fn new(provider: impl Into<ProviderId>) -> Self {
        Self {
            provider: provider.into(),
            buf: Vec::new(),
            done: false,
            decoded_lines: 0,
            upstream_message: None,
            last_parse_error: None,
        }
    }

    fn handle_line(&mut self, raw: &[u8], events: &mut Vec<ProviderEvent>) {
        let text = String::from_utf8_lossy(raw);
        let line = text.trim();
        if line.is_empty() || line.starts_with(':') {
            return;
        }
        if line.starts_with("event:") || line.starts_with("id:") || line.starts_with("retry:") {
            return;
        }
        let payload = line.strip_prefix("data:").map(str::trim_start).unwrap_or(line);
        if payload == DONE_SENTINEL {
            debug!(provider = %self.provider, "end of stream sentinel");
            self.done = true;
            return;
        }

        let value: Value = match serde_json::from_str(payload) {
            Ok(value) => value,
            Err(err) => {
                self.last_parse_error = Some(super::malformed(&self.provider, &err));
                return;
            }
        };
        if value.get("choices").is_none() && value.get("usage").is_none() {
            if let Some(message) = error_message(&value) {
                self.upstream_message = Some(message.to_string());
            }
            debug!(provider = %self.provider, "ignoring SSE line with no recognizable payload");
            return;
        }
        self.decoded_lines += 1;
        events.extend(chunk_events(&value));
    }
}

/// Events carried by one `chat.completion.chunk` object.
///
/// Reasoning is emitted before content when a chunk carries both.
pub(crate) fn chunk_events(value: &Value) -> Vec<ProviderEvent> {
    let mut events = Vec::new();
    let choice = value.get("choices").and_then(|c| c.get(0));
    if let Some(delta) = choice.and_then(|c| c.get("delta")) {
        if let Some(text) = delta
            .get("reasoning_content")
            .and_then(Value::as_str)
            .filter(|t| !t.is_empty())
        {
            events.push(ProviderEvent::ReasoningDelta {
                text: text.to_string(),
            });
        }
        if let Some(text) = delta
            .get("content")
            .and_then(Value::as_str)
            .filter(|t| !t.is_empty())
        {
            events.push(ProviderEvent::TextDelta {
                text: text.to_string(),
            });
        }
    }
    if let Some(reason) = choice
        .and_then(|c| c.get("finish_reason"))
        .and_then(Value::as_str)
        .and_then(FinishReason::from_reported)
    {
        events.push(ProviderEvent::FinishReason(reason));
    }
    if let Some(usage) = value.get("usage").and_then(openai_usage) {
        events.push(ProviderEvent::Usage(usage));
    }
    events
}

/// Reads `prompt_tokens` / `completion_tokens` from an OpenAI usage object.
pub(crate) fn openai_usage(usage: &Value) -> Option<Usage> {
    let prompt = usage.get("prompt_tokens")?.as_u64()?;
    let completion = usage.get("completion_tokens")?.as_u64()?;
    Some(Usage::new(
        u32::try_from(prompt).unwrap_or(u32::MAX),
        u32::try_from(completion).unwrap_or(u32::MAX),
    ))
}

pub(crate) fn error_message(value: &Value) -> Option<&str> {
    value
        .get("error")
        .and_then(|e| e.get("message"))
        .and_then(Value::as_str)
        .or_else(|| value.get("message").and_then(Value::as_str))
}

impl FrameDecoder for SseLineDecoder {
    fn push_chunk(&mut self, chunk: &[u8]) -> Vec<ProviderEvent> {
        let mut events = Vec::new();
        if self.done {
            return events;
        }
        self.buf.extend_from_slice(chunk);
        while let Some(end) = self.buf.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buf.drain(..=end).collect();
            self.handle_line(&line, &mut events);
            if self.done {
                self.buf.clear();
                break;
            }
        }
        events
    }

    fn finish(&mut self) -> Result<Vec<ProviderEvent>, AdapterError> {
        let mut events = Vec::new();
        if !self.done && !self.buf.is_empty() {
            let line = std::mem::take(&mut self.buf);
            self.handle_line(&line, &mut events);
        }
        if self.decoded_lines == 0 && !self.done {
            let message = super::nothing_decoded(
                "lines",
                self.upstream_message.take(),
                self.last_parse_error.take(),
            );
            return Err(AdapterError::invalid_shape(&self.provider, message));
        }
        Ok(events)
    }

    fn is_done(&self) -> bool {
        self.done
    }
}
