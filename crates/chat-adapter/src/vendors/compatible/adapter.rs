use serde_json::Value;
use tracing::debug;

use crate::config::resolve_credential;
use crate::decode::sse::{error_message, openai_usage};
use crate::decode::{FrameDecoder, SseLineDecoder};
use crate::errors::AdapterError;
use crate::finish::FinishReason;
use crate::model::ProviderId;
use crate::provider::{ParsedResponse, ProviderAdapter, ProviderRequest};
use crate::request::RequestDescriptor;

use super::config::CompatibleConfig;

const DEFAULT_TEMPERATURE: f64 = 0.7;
const DEFAULT_TOP_P: f64 = 0.95;

/// Provider adapter for OpenAI-style chat completions, streamed over SSE.
///
/// Models with a reasoning channel (for example `deepseek-r1`) send
/// `reasoning_content` deltas ahead of the answer.
pub struct CompatibleProvider {
    config: CompatibleConfig,
}

impl CompatibleProvider {
    pub fn new(config: CompatibleConfig) -> Self {
        Self { config }
    }

    /// Creates a provider reading `DASHSCOPE_TOKEN` / `DASHSCOPE_BASE_URL`.
    pub fn from_env() -> Self {
        Self::new(CompatibleConfig::from_env())
    }

    fn provider_id(&self) -> &ProviderId {
        &self.config.provider_id
    }
}

impl ProviderAdapter for CompatibleProvider {
    fn id(&self) -> ProviderId {
        self.config.provider_id.clone()
    }

    fn build_request(&self, req: &ProviderRequest) -> Result<RequestDescriptor, AdapterError> {
        let token = resolve_credential(self.provider_id(), &self.config.credential)?;
        let stream = req.generation.is_stream();
        debug!(run_id = %req.run_id, session_id = %req.session_id, model = %req.model.model, stream, "building chat-completions request");

        let mut request =
            RequestDescriptor::post_json(self.config.completions_url(), build_request_body(req))
                .bearer_auth(&token)
                .streaming(stream);
        if stream {
            request = request.header("Accept", "text/event-stream");
        }
        Ok(request)
    }

    fn decoder(&self) -> Box<dyn FrameDecoder> {
        Box::new(SseLineDecoder::new(self.provider_id()))
    }

    fn parse_response(&self, body: &[u8]) -> Result<ParsedResponse, AdapterError> {
        let value: Value = serde_json::from_slice(body).map_err(|e| {
            AdapterError::invalid_shape(self.provider_id(), format!("response is not JSON: {e}"))
        })?;
        let Some(choice) = value.get("choices").and_then(|c| c.get(0)) else {
            let message = error_message(&value).unwrap_or("response carries no choices");
            return Err(AdapterError::invalid_shape(self.provider_id(), message));
        };
        let message = choice.get("message");
        let field = |name: &str| {
            message
                .and_then(|m| m.get(name))
                .and_then(Value::as_str)
                .map(ToOwned::to_owned)
        };
        Ok(ParsedResponse {
            text: field("content").unwrap_or_default(),
            reasoning: field("reasoning_content").filter(|r| !r.is_empty()),
            finish_reason: choice
                .get("finish_reason")
                .and_then(Value::as_str)
                .and_then(FinishReason::from_reported),
            usage: value.get("usage").and_then(openai_usage),
        })
    }
}

/// Flat chat-completions body. `max_tokens` is sent only when set.
pub(crate) fn build_request_body(req: &ProviderRequest) -> Value {
    let generation = &req.generation;
    let mut body = serde_json::json!({
        "model": req.model.model,
        "messages": req.messages,
        "temperature": generation.temperature.unwrap_or(DEFAULT_TEMPERATURE),
        "top_p": generation.top_p.unwrap_or(DEFAULT_TOP_P),
        "stream": generation.is_stream(),
    });
    if let Some(max_tokens) = generation.max_tokens {
        body["max_tokens"] = Value::from(max_tokens);
    }
    body
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{CanonicalMessage, Role};
    use crate::model::{GenerationConfig, ModelRef};
    use crate::usage::Usage;

    fn request(generation: GenerationConfig) -> ProviderRequest {
        ProviderRequest {
            run_id: uuid::Uuid::new_v4(),
            session_id: uuid::Uuid::new_v4(),
            model: ModelRef::new("deepseek", "deepseek-r1"),
            messages: vec![CanonicalMessage::new(Role::User, "why?")],
            generation,
        }
    }

    fn provider() -> CompatibleProvider {
        CompatibleProvider::new(CompatibleConfig::new("sk-test"))
    }

    #[test]
    fn streaming_body_is_flat_with_defaults() {
        let descriptor = provider()
            .build_request(&request(GenerationConfig::default().stream(true)))
            .expect("request");
        assert_eq!(
            descriptor.url,
            "https://dashscope.aliyuncs.com/compatible-mode/v1/chat/completions"
        );
        assert_eq!(
            descriptor.body,
            serde_json::json!({
                "model": "deepseek-r1",
                "messages": [{"role": "user", "content": "why?"}],
                "temperature": 0.7,
                "top_p": 0.95,
                "stream": true
            })
        );
        assert_eq!(descriptor.header_value("Authorization"), Some("Bearer sk-test"));
        assert_eq!(descriptor.header_value("accept"), Some("text/event-stream"));
    }

    #[test]
    fn max_tokens_is_sent_only_when_set() {
        let descriptor = provider()
            .build_request(&request(GenerationConfig::default().max_tokens(256)))
            .expect("request");
        assert_eq!(descriptor.body["max_tokens"], serde_json::json!(256));
        assert_eq!(descriptor.body["stream"], serde_json::json!(false));
    }

    #[test]
    fn custom_provider_id_and_path() {
        let provider = CompatibleProvider::new(
            CompatibleConfig::new("k")
                .provider_id("local")
                .base_url("http://127.0.0.1:8080/")
                .path("/v1/chat/completions"),
        );
        assert_eq!(provider.id(), ProviderId::new("local"));
        let descriptor = provider
            .build_request(&request(GenerationConfig::default()))
            .expect("request");
        assert_eq!(descriptor.url, "http://127.0.0.1:8080/v1/chat/completions");
    }

    #[test]
    fn parses_buffered_completion_with_reasoning() {
        let parsed = provider()
            .parse_response(
                br#"{"choices":[{"message":{"role":"assistant","content":"42","reasoning_content":"math"},"finish_reason":"stop"}],"usage":{"prompt_tokens":3,"completion_tokens":4,"total_tokens":7}}"#,
            )
            .expect("parse");
        assert_eq!(parsed.text, "42");
        assert_eq!(parsed.reasoning.as_deref(), Some("math"));
        assert_eq!(parsed.finish_reason, Some(FinishReason::Stop));
        assert_eq!(parsed.usage, Some(Usage::new(3, 4)));
    }

    #[test]
    fn body_without_choices_is_an_invalid_shape() {
        let err = provider()
            .parse_response(br#"{"error":{"message":"Incorrect API key provided."}}"#)
            .expect_err("no choices");
        assert!(matches!(err, AdapterError::InvalidResponseShape { .. }));
        assert!(err.to_string().contains("Incorrect API key provided."));
    }
}
