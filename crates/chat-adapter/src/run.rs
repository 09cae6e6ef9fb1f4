use std::sync::Arc;
use std::time::Instant;

use futures::{Stream, StreamExt as _, stream};
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, info, warn};

use crate::assemble::StreamAssembler;
use crate::content::{ChatResponse, InputMessage};
use crate::decode::decode_stream;
use crate::errors::{AdapterError, ChatError};
use crate::harness::HarnessInner;
use crate::message::{CanonicalMessage, Role, canonicalize};
use crate::model::{GenerationConfig, ModelRef, ProviderId, RunOptions};
use crate::provider::{ProviderAdapter, ProviderRequest};
use crate::reasoning::ReasoningSynthesizer;
use crate::request::RequestDescriptor;
use crate::stream::StreamEvent;
use crate::transport::Transport;
use crate::usage::Usage;

/// Handle used to request cancellation of a running stream.
#[derive(Clone)]
pub struct AbortHandle {
    tx: watch::Sender<bool>,
}

impl AbortHandle {
    /// Requests cancellation.
    ///
    /// The connection is closed and no further event is delivered, not even
    /// a pending `Finish`.
    pub fn abort(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_aborted(&self) -> bool {
        *self.tx.borrow()
    }
}

/// Builder for configuring and starting a single model run.
///
/// This is the main user-facing API for providing messages and generation
/// parameters before either streaming events or generating a buffered result.
pub struct RunBuilder {
    harness: Arc<HarnessInner>,
    session_id: uuid::Uuid,
    session_name: String,
    model: ModelRef,
    system_prompt: Option<String>,
    messages: Vec<InputMessage>,
    generation: GenerationConfig,
    options: RunOptions,
}

impl RunBuilder {
    pub(crate) fn new(harness: Arc<HarnessInner>, session_id: uuid::Uuid, model: ModelRef) -> Self {
        Self {
            harness,
            session_id,
            session_name: String::new(),
            model,
            system_prompt: None,
            messages: Vec::new(),
            generation: GenerationConfig::default(),
            options: RunOptions::default(),
        }
    }

    pub(crate) fn session_name(mut self, name: String) -> Self {
        self.session_name = name;
        self
    }

    /// Sets a system prompt placed ahead of the conversation.
    pub fn system_prompt(mut self, text: impl Into<String>) -> Self {
        self.system_prompt = Some(text.into());
        self
    }

    /// Appends conversation messages in order.
    pub fn messages(mut self, messages: impl IntoIterator<Item = InputMessage>) -> Self {
        self.messages.extend(messages);
        self
    }

    /// Appends one conversation message.
    pub fn message(mut self, message: impl Into<InputMessage>) -> Self {
        self.messages.push(message.into());
        self
    }

    /// Appends a plain text user message.
    pub fn user_text(self, text: impl Into<String>) -> Self {
        self.message(InputMessage::user(text))
    }

    pub fn temperature(mut self, temperature: f64) -> Self {
        self.generation.temperature = Some(temperature);
        self
    }

    pub fn top_p(mut self, top_p: f64) -> Self {
        self.generation.top_p = Some(top_p);
        self
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.generation.max_tokens = Some(max_tokens);
        self
    }

    /// Replaces all sampling parameters. The stream flag is set by the entry
    /// point used to start the run.
    pub fn generation_config(mut self, generation: GenerationConfig) -> Self {
        self.generation = generation;
        self
    }

    /// Sets the bounded stream buffer size used between the runtime task and
    /// the consumer.
    pub fn stream_buffer_capacity(mut self, capacity: usize) -> Self {
        self.options.stream_buffer_capacity = capacity;
        self
    }

    /// Validates the builder state and starts a streaming run.
    ///
    /// Credentials are checked here, so a missing key fails before any
    /// network call.
    pub async fn start_stream(self) -> Result<RunStream, ChatError> {
        let capacity = self.options.stream_buffer_capacity;
        let validated = self.validate_and_build_request(true)?;
        let ValidatedRun {
            provider,
            transport,
            request,
            descriptor,
        } = validated;

        let (tx, rx) = mpsc::channel(capacity);
        let (final_tx, final_rx) = oneshot::channel();
        let (abort_tx, abort_rx) = watch::channel(false);

        let abort_handle = AbortHandle { tx: abort_tx };
        let run_id = request.run_id;
        let session_id = request.session_id;
        let model = request.model.clone();
        tokio::spawn(run_task(
            provider,
            transport,
            request,
            descriptor,
            tx,
            final_tx,
            abort_rx.clone(),
        ));

        Ok(RunStream {
            run_id,
            session_id,
            provider: model.provider,
            model: model.model,
            rx,
            final_rx,
            abort_handle,
            abort_rx,
            saw_terminal: false,
        })
    }

    /// Sends one non-streaming request and returns the complete response.
    ///
    /// Usage is estimated when the upstream reports none.
    pub async fn generate(self) -> Result<ChatResponse, ChatError> {
        let ValidatedRun {
            provider,
            transport,
            request,
            descriptor,
        } = self.validate_and_build_request(false)?;
        let provider_id = request.model.provider.clone();
        info!(run_id = %request.run_id, provider = %provider_id, model = %request.model.model, "buffered run started");

        let body = transport.send(&provider_id, &descriptor).await?;
        let parsed = provider.parse_response(&body)?;
        let usage = parsed.usage.unwrap_or_else(|| {
            Usage::estimate(
                &request.prompt_text(),
                &parsed.text,
                parsed.reasoning.as_deref().unwrap_or_default(),
            )
        });
        info!(run_id = %request.run_id, provider = %provider_id, total_tokens = usage.total_tokens(), "buffered run finished");
        Ok(ChatResponse {
            text: parsed.text,
            reasoning: parsed.reasoning,
            finish_reason: parsed.finish_reason.unwrap_or_default(),
            usage,
        })
    }

    /// Streams to completion and returns the answer text.
    pub async fn collect_text(self) -> Result<String, ChatError> {
        let stream = self.start_stream().await?;
        Ok(stream.finish().await?.text)
    }

    fn validate_and_build_request(self, stream: bool) -> Result<ValidatedRun, ChatError> {
        if self.model.provider.as_str().trim().is_empty() {
            return Err(ChatError::Validation(
                "model provider must not be empty".into(),
            ));
        }
        if self.model.model.trim().is_empty() {
            return Err(ChatError::Validation("model must not be empty".into()));
        }
        if self.options.stream_buffer_capacity == 0 {
            return Err(ChatError::Validation(
                "stream_buffer_capacity must be greater than 0".into(),
            ));
        }

        let mut messages = Vec::with_capacity(self.messages.len() + 1);
        if let Some(system_prompt) = self
            .system_prompt
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
        {
            messages.push(CanonicalMessage::new(Role::System, system_prompt));
        }
        messages.extend(canonicalize(&self.messages));
        if messages.iter().all(|m| m.role == Role::System) {
            return Err(ChatError::Validation(
                "at least one non-system message with text content is required".into(),
            ));
        }

        let provider = self
            .harness
            .provider(&self.model.provider)
            .ok_or_else(|| ChatError::ProviderNotFound {
                provider: self.model.provider.clone(),
            })?;

        let request = ProviderRequest {
            run_id: uuid::Uuid::new_v4(),
            session_id: self.session_id,
            model: self.model,
            messages,
            generation: self.generation.stream(stream),
        };
        let descriptor = provider.build_request(&request)?;
        debug!(run_id = %request.run_id, session = %self.session_name, request = ?descriptor, "request built");

        Ok(ValidatedRun {
            provider,
            transport: self.harness.transport(),
            request,
            descriptor,
        })
    }
}

struct ValidatedRun {
    provider: Arc<dyn ProviderAdapter>,
    transport: Arc<dyn Transport>,
    request: ProviderRequest,
    descriptor: RequestDescriptor,
}

/// Streaming handle returned by `RunBuilder::start_stream`.
///
/// Use `next_event()` to consume events as they arrive and `finish()` to obtain
/// the final result after the terminal event. Dropping the handle cancels the
/// run.
pub struct RunStream {
    run_id: uuid::Uuid,
    session_id: uuid::Uuid,
    provider: ProviderId,
    model: String,
    rx: mpsc::Receiver<StreamEvent>,
    final_rx: oneshot::Receiver<Result<ChatResponse, ChatError>>,
    abort_handle: AbortHandle,
    abort_rx: watch::Receiver<bool>,
    saw_terminal: bool,
}

impl RunStream {
    /// Returns the run id for this stream.
    pub fn run_id(&self) -> uuid::Uuid {
        self.run_id
    }

    /// Returns the session id that owns this run.
    pub fn session_id(&self) -> uuid::Uuid {
        self.session_id
    }

    /// Returns a handle that can cancel the run.
    pub fn abort_handle(&self) -> AbortHandle {
        self.abort_handle.clone()
    }

    /// Waits for and returns the next normalized stream event.
    ///
    /// Returns `None` after the terminal event, after cancellation, or once
    /// the run task has stopped.
    pub async fn next_event(&mut self) -> Option<StreamEvent> {
        if self.saw_terminal || self.abort_handle.is_aborted() {
            return None;
        }
        let event = tokio::select! {
            biased;
            _ = wait_for_abort(&mut self.abort_rx) => None,
            event = self.rx.recv() => event,
        };
        if event.as_ref().is_some_and(StreamEvent::is_terminal) {
            self.saw_terminal = true;
        }
        event
    }

    /// Drains the stream (if needed) and returns the terminal run result.
    ///
    /// This is safe to call after consuming events manually with `next_event()`.
    pub async fn finish(mut self) -> Result<ChatResponse, ChatError> {
        while !self.saw_terminal {
            if self.next_event().await.is_none() {
                break;
            }
        }
        if self.abort_handle.is_aborted() {
            return Err(ChatError::Cancelled);
        }

        match self.final_rx.await {
            Ok(result) => result,
            Err(_) => Err(ChatError::protocol_msg(format!(
                "run task ended without final result (provider={}, model={})",
                self.provider, self.model
            ))),
        }
    }

    /// Converts the handle into a `Stream` of events.
    pub fn into_event_stream(self) -> impl Stream<Item = StreamEvent> + Send {
        stream::unfold(self, |mut run| async move {
            run.next_event().await.map(|event| (event, run))
        })
    }
}

/// Resolves once cancellation was requested. Never resolves if every
/// `AbortHandle` was dropped without aborting.
async fn wait_for_abort(abort_rx: &mut watch::Receiver<bool>) {
    loop {
        if *abort_rx.borrow_and_update() {
            return;
        }
        if abort_rx.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

enum Delivery {
    Sent,
    Stopped,
}

/// Sends an event, giving up when the run is aborted while waiting for
/// buffer space.
async fn deliver(
    tx: &mpsc::Sender<StreamEvent>,
    abort_rx: &mut watch::Receiver<bool>,
    event: StreamEvent,
) -> Delivery {
    tokio::select! {
        biased;
        _ = wait_for_abort(abort_rx) => Delivery::Stopped,
        sent = tx.send(event) => match sent {
            Ok(()) => Delivery::Sent,
            Err(_) => Delivery::Stopped,
        },
    }
}

async fn deliver_all(
    tx: &mpsc::Sender<StreamEvent>,
    abort_rx: &mut watch::Receiver<bool>,
    events: Vec<StreamEvent>,
) -> Delivery {
    for event in events {
        if let Delivery::Stopped = deliver(tx, abort_rx, event).await {
            return Delivery::Stopped;
        }
    }
    Delivery::Sent
}

async fn run_task(
    provider: Arc<dyn ProviderAdapter>,
    transport: Arc<dyn Transport>,
    request: ProviderRequest,
    descriptor: RequestDescriptor,
    tx: mpsc::Sender<StreamEvent>,
    final_tx: oneshot::Sender<Result<ChatResponse, ChatError>>,
    mut abort_rx: watch::Receiver<bool>,
) {
    let run_id = request.run_id;
    let provider_id = request.model.provider.clone();
    let model_name = request.model.model.clone();
    info!(run_id = %run_id, provider = %provider_id, model = %model_name, "stream run started");

    let mut assembler = StreamAssembler::new(
        ReasoningSynthesizer::for_run(request.run_id),
        request.prompt_text(),
    );

    let opened = tokio::select! {
        biased;
        _ = wait_for_abort(&mut abort_rx) => {
            debug!(run_id = %run_id, "run cancelled before upstream responded");
            let _ = final_tx.send(Err(ChatError::Cancelled));
            return;
        }
        _ = tx.closed() => {
            debug!(run_id = %run_id, "run stream dropped before upstream responded");
            return;
        }
        opened = transport.open_stream(&provider_id, &descriptor) => opened,
    };
    let bytes = match opened {
        Ok(bytes) => bytes,
        Err(err) => {
            fail_run(&tx, &mut abort_rx, final_tx, &mut assembler, &err).await;
            return;
        }
    };

    let mut events = Box::pin(decode_stream(provider.decoder(), bytes));
    loop {
        let next = tokio::select! {
            biased;
            _ = wait_for_abort(&mut abort_rx) => {
                debug!(run_id = %run_id, "run cancelled, closing upstream");
                let _ = final_tx.send(Err(ChatError::Cancelled));
                return;
            }
            _ = tx.closed() => {
                debug!(run_id = %run_id, "run stream dropped, closing upstream");
                return;
            }
            next = events.next() => next,
        };
        match next {
            Some(Ok(event)) => {
                let mapped = assembler.push(event, Instant::now());
                if let Delivery::Stopped = deliver_all(&tx, &mut abort_rx, mapped).await {
                    let _ = final_tx.send(Err(ChatError::Cancelled));
                    return;
                }
            }
            Some(Err(err)) => {
                fail_run(&tx, &mut abort_rx, final_tx, &mut assembler, &err).await;
                return;
            }
            None => {
                let terminal = assembler.finish(Instant::now());
                let response = assembler.response();
                info!(
                    run_id = %run_id,
                    provider = %provider_id,
                    finish_reason = %response.finish_reason,
                    prompt_tokens = response.usage.prompt_tokens,
                    completion_tokens = response.usage.completion_tokens,
                    "stream run finished"
                );
                let result = match deliver_all(&tx, &mut abort_rx, terminal).await {
                    Delivery::Sent => Ok(response),
                    Delivery::Stopped => Err(ChatError::Cancelled),
                };
                let _ = final_tx.send(result);
                return;
            }
        }
    }
}

async fn fail_run(
    tx: &mpsc::Sender<StreamEvent>,
    abort_rx: &mut watch::Receiver<bool>,
    final_tx: oneshot::Sender<Result<ChatResponse, ChatError>>,
    assembler: &mut StreamAssembler,
    err: &AdapterError,
) {
    warn!(provider = %err.provider_id(), kind = %err.kind(), error = %err, "stream run failed");
    let events = assembler.fail(err, Instant::now());
    let result = match deliver_all(tx, abort_rx, events).await {
        Delivery::Sent => Err(ChatError::StreamFailed {
            kind: err.kind(),
            message: err.to_string(),
        }),
        Delivery::Stopped => Err(ChatError::Cancelled),
    };
    let _ = final_tx.send(result);
}
