//! Streaming protocol adapter for LLM chat providers.
//!
//! Two upstream wire protocols are normalized into one ordered stream of
//! [`StreamEvent`]s: DashScope's native incremental-output protocol and the
//! OpenAI-compatible chat-completions SSE protocol (with a reasoning channel).
//! Vendor-specific configuration lives under `vendors::*`.
//!
//! # Streaming
//!
//! ```no_run
//! use chat_adapter::prelude::*;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), ChatError> {
//! let harness = Harness::from_env()?;
//!
//! let mut stream = harness
//!     .session(SessionConfig::named("demo"))
//!     .run(ModelRef::new("deepseek", "deepseek-r1"))
//!     .system_prompt("Answer briefly.")
//!     .user_text("Why is the sky blue?")
//!     .start_stream()
//!     .await?;
//!
//! while let Some(event) = stream.next_event().await {
//!     match event {
//!         StreamEvent::ReasoningDelta { text } | StreamEvent::TextDelta { text } => print!("{text}"),
//!         StreamEvent::Finish { usage, .. } => println!("\n[{} tokens]", usage.total_tokens()),
//!         StreamEvent::StreamError { message, .. } => eprintln!("\n{message}"),
//!         _ => {}
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub(crate) mod assemble;
/// Credential sources and endpoint defaults.
pub mod config;
/// Caller-side message and response types.
pub mod content;
/// Incremental frame decoders for each wire protocol.
pub mod decode;
/// Error taxonomy.
pub mod errors;
/// Completion reason mapping.
pub mod finish;
/// Harness entry point and builder.
pub mod harness;
/// Message canonicalization.
pub mod message;
/// Model and provider identifiers plus generation parameters.
pub mod model;
/// Built-in model catalog.
pub mod models;
/// Tracing subscriber setup.
pub mod observability;
/// Common imports for typical usage.
pub mod prelude;
/// Provider adapter contracts used by vendor integrations.
pub mod provider;
/// Reasoning block synthesis.
pub mod reasoning;
/// HTTP request descriptors.
pub mod request;
/// Run builder, streaming handle, and cancellation handle.
pub mod run;
/// Session configuration and session handle.
pub mod session;
/// Normalized public stream events.
pub mod stream;
/// Conversation title generation.
pub mod title;
/// HTTP transport.
pub mod transport;
/// Token usage accounting and estimation.
pub mod usage;
/// Vendor-specific integrations.
pub mod vendors;

pub use config::Credential;
pub use content::{ChatResponse, ContentPart, InputMessage, MessageContent};
pub use errors::{AdapterError, ChatError, ErrorKind};
pub use finish::FinishReason;
pub use harness::{Harness, HarnessBuilder};
pub use message::{CanonicalMessage, Role, canonicalize};
pub use model::{GenerationConfig, ModelRef, ProviderId, RunOptions};
pub use provider::{ParsedResponse, ProviderAdapter, ProviderEvent, ProviderRequest};
pub use reasoning::ReasoningSynthesizer;
pub use request::RequestDescriptor;
pub use run::{AbortHandle, RunBuilder, RunStream};
pub use session::{Session, SessionConfig};
pub use stream::StreamEvent;
pub use title::{FALLBACK_TITLE, generate_title};
pub use transport::{ByteStream, HttpTransport, Transport};
pub use usage::{Usage, estimate_tokens};
