//! Common imports for typical usage.
//!
//! Exports the builder, runtime and event types most callers need.
pub use crate::{
    AbortHandle, ChatError, ChatResponse, FinishReason, GenerationConfig, Harness, HarnessBuilder,
    InputMessage, ModelRef, ProviderId, RunBuilder, RunStream, Session, SessionConfig, StreamEvent,
    Usage,
};
