//! Turns decoded provider events into the public event stream.
//!
//! [`StreamAssembler`] owns the per-stream reasoning state, accumulates the
//! emitted text for usage estimation and guarantees a single terminal event.

use std::time::Instant;

use crate::content::ChatResponse;
use crate::errors::AdapterError;
use crate::finish::FinishReason;
use crate::provider::ProviderEvent;
use crate::reasoning::ReasoningSynthesizer;
use crate::stream::StreamEvent;
use crate::usage::Usage;

pub struct StreamAssembler {
    synthesizer: ReasoningSynthesizer,
    prompt_text: String,
    text: String,
    reasoning: String,
    reported_usage: Option<Usage>,
    finish_reason: Option<FinishReason>,
    terminated: bool,
}

impl StreamAssembler {
    /// `prompt_text` is the serialized request messages.
    pub fn new(synthesizer: ReasoningSynthesizer, prompt_text: impl Into<String>) -> Self {
        Self {
            synthesizer,
            prompt_text: prompt_text.into(),
            text: String::new(),
            reasoning: String::new(),
            reported_usage: None,
            finish_reason: None,
            terminated: false,
        }
    }

    /// Maps one provider event to zero or more stream events.
    pub fn push(&mut self, event: ProviderEvent, now: Instant) -> Vec<StreamEvent> {
        if self.terminated {
            return Vec::new();
        }
        match event {
            ProviderEvent::TextDelta { text } => {
                self.text.push_str(&text);
                self.synthesizer.content(&text, now)
            }
            ProviderEvent::ReasoningDelta { text } => {
                self.reasoning.push_str(&text);
                self.synthesizer.reasoning(&text, now)
            }
            ProviderEvent::Usage(usage) => {
                self.reported_usage = Some(usage);
                Vec::new()
            }
            ProviderEvent::FinishReason(reason) => {
                self.finish_reason = Some(reason);
                Vec::new()
            }
        }
    }

    /// Ends the stream successfully.
    ///
    /// Upstream usage wins over the estimate.
    pub fn finish(&mut self, now: Instant) -> Vec<StreamEvent> {
        if self.terminated {
            return Vec::new();
        }
        self.terminated = true;
        let mut events: Vec<StreamEvent> = self.synthesizer.finish(now).into_iter().collect();
        events.push(StreamEvent::Finish {
            reason: self.finish_reason.unwrap_or_default(),
            usage: self.usage(),
        });
        events
    }

    /// Ends the stream with a fatal error, closing an open reasoning block first.
    pub fn fail(&mut self, err: &AdapterError, now: Instant) -> Vec<StreamEvent> {
        if self.terminated {
            return Vec::new();
        }
        self.terminated = true;
        let mut events: Vec<StreamEvent> = self.synthesizer.finish(now).into_iter().collect();
        events.push(StreamEvent::StreamError {
            kind: err.kind(),
            message: err.to_string(),
        });
        events
    }

    pub fn usage(&self) -> Usage {
        self.reported_usage.unwrap_or_else(|| {
            Usage::estimate(&self.prompt_text, &self.text, &self.reasoning)
        })
    }

    /// Aggregated result of everything pushed so far.
    pub fn response(&self) -> ChatResponse {
        ChatResponse {
            text: self.text.clone(),
            reasoning: (!self.reasoning.is_empty()).then(|| self.reasoning.clone()),
            finish_reason: self.finish_reason.unwrap_or_default(),
            usage: self.usage(),
        }
    }
}
