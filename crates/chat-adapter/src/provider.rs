use crate::decode::FrameDecoder;
use crate::errors::AdapterError;
use crate::finish::FinishReason;
use crate::message::CanonicalMessage;
use crate::model::{GenerationConfig, ModelRef, ProviderId};
use crate::request::RequestDescriptor;
use crate::usage::Usage;

/// Provider-agnostic request passed to adapters.
#[derive(Clone, Debug)]
pub struct ProviderRequest {
    pub run_id: uuid::Uuid,
    pub session_id: uuid::Uuid,
    pub model: ModelRef,
    pub messages: Vec<CanonicalMessage>,
    pub generation: GenerationConfig,
}

impl ProviderRequest {
    /// Serialized canonical messages, used as the prompt side of usage
    /// estimation.
    pub fn prompt_text(&self) -> String {
        serde_json::to_string(&self.messages).unwrap_or_default()
    }
}

/// Decoded provider events before reasoning synthesis.
#[derive(Clone, Debug, PartialEq)]
pub enum ProviderEvent {
    TextDelta { text: String },
    ReasoningDelta { text: String },
    /// Usage reported by the upstream.
    Usage(Usage),
    /// Completion code reported by the upstream.
    FinishReason(FinishReason),
}

/// Result of parsing a buffered (non-streaming) response body.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ParsedResponse {
    pub text: String,
    pub reasoning: Option<String>,
    pub finish_reason: Option<FinishReason>,
    pub usage: Option<Usage>,
}

/// Contract implemented by each wire protocol.
///
/// Adapters are pure: they describe requests and decode responses. The
/// harness owns the transport, so the same adapter serves streaming and
/// buffered calls.
pub trait ProviderAdapter: Send + Sync {
    /// Returns the stable provider id used for registration and routing.
    fn id(&self) -> ProviderId;

    /// Builds the HTTP request for `req`.
    ///
    /// Fails with `MissingCredential` when no credential is configured.
    /// `req.generation.stream` selects the streaming form of the request.
    fn build_request(&self, req: &ProviderRequest) -> Result<RequestDescriptor, AdapterError>;

    /// Returns a fresh decoder for one streaming response.
    fn decoder(&self) -> Box<dyn FrameDecoder>;

    /// Parses a complete buffered response body.
    fn parse_response(&self, body: &[u8]) -> Result<ParsedResponse, AdapterError>;
}
