//! Reasoning segment synthesis.
//!
//! Providers with a reasoning channel send reasoning fragments before the
//! answer. [`ReasoningSynthesizer`] wraps those fragments in one balanced
//! `ReasoningStart` / `ReasoningEnd` pair and reports elapsed time while the
//! block is open. Time is passed in by the caller.

use std::time::Instant;

use crate::stream::StreamEvent;

/// Per-stream reasoning block state.
#[derive(Debug)]
pub struct ReasoningSynthesizer {
    block_id: String,
    reasoning_started: bool,
    content_started: bool,
    closed: bool,
    reasoning_start: Option<Instant>,
    last_reported_secs: u64,
}

impl ReasoningSynthesizer {
    pub fn new(block_id: impl Into<String>) -> Self {
        Self {
            block_id: block_id.into(),
            reasoning_started: false,
            content_started: false,
            closed: false,
            reasoning_start: None,
            last_reported_secs: 0,
        }
    }

    /// Creates a synthesizer whose block id is derived from a run id, so
    /// interleaved streams never share one.
    pub fn for_run(run_id: uuid::Uuid) -> Self {
        Self::new(format!("reasoning-{}", run_id.simple()))
    }

    pub fn block_id(&self) -> &str {
        &self.block_id
    }

    /// Returns `true` while a reasoning block is open.
    pub fn is_open(&self) -> bool {
        self.reasoning_started && !self.closed
    }

    /// Handles one reasoning fragment.
    ///
    /// Only one block is opened per stream. Reasoning that arrives after the
    /// block closed is forwarded without markers.
    pub fn reasoning(&mut self, text: &str, now: Instant) -> Vec<StreamEvent> {
        if text.is_empty() {
            return Vec::new();
        }
        let mut events = Vec::with_capacity(3);
        if !self.reasoning_started && !self.content_started {
            self.reasoning_started = true;
            self.reasoning_start = Some(now);
            events.push(StreamEvent::ReasoningStart {
                block_id: self.block_id.clone(),
            });
        }
        events.push(StreamEvent::ReasoningDelta {
            text: text.to_string(),
        });
        if self.is_open() {
            let secs = self.elapsed_secs(now);
            if secs > 0 && secs > self.last_reported_secs {
                self.last_reported_secs = secs;
                events.push(StreamEvent::ReasoningTimeUpdate {
                    block_id: self.block_id.clone(),
                    elapsed_secs: secs,
                });
            }
        }
        events
    }

    /// Handles one answer fragment, closing an open reasoning block first.
    pub fn content(&mut self, text: &str, now: Instant) -> Vec<StreamEvent> {
        if text.is_empty() {
            return Vec::new();
        }
        let mut events = Vec::with_capacity(2);
        if let Some(end) = self.close(now) {
            events.push(end);
        }
        self.content_started = true;
        events.push(StreamEvent::TextDelta {
            text: text.to_string(),
        });
        events
    }

    /// Closes an open block at the end of the stream.
    pub fn finish(&mut self, now: Instant) -> Option<StreamEvent> {
        self.close(now)
    }

    fn close(&mut self, now: Instant) -> Option<StreamEvent> {
        if !self.is_open() {
            return None;
        }
        self.closed = true;
        Some(StreamEvent::ReasoningEnd {
            block_id: self.block_id.clone(),
            elapsed_secs: self.elapsed_secs(now),
        })
    }

    fn elapsed_secs(&self, now: Instant) -> u64 {
        self.reasoning_start
            .map(|start| now.saturating_duration_since(start).as_secs())
            .unwrap_or(0)
    }
}
