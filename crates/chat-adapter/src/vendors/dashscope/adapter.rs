use serde_json::Value;
use tracing::debug;

use crate::config::resolve_credential;
use crate::decode::native::{extract_text, native_finish_reason, native_usage, payload_root};
use crate::decode::{FrameDecoder, NativeFrameDecoder};
use crate::errors::AdapterError;
use crate::model::ProviderId;
use crate::provider::{ParsedResponse, ProviderAdapter, ProviderRequest};
use crate::request::RequestDescriptor;

use super::config::DashScopeConfig;

/// Default provider id for the native protocol.
pub const DASHSCOPE_PROVIDER: &str = "bailian";

const DEFAULT_TEMPERATURE: f64 = 0.7;
const DEFAULT_TOP_P: f64 = 0.8;
const DEFAULT_MAX_TOKENS: u32 = 1500;

/// Provider adapter for DashScope's native text-generation API.
pub struct DashScopeProvider {
    id: ProviderId,
    config: DashScopeConfig,
}

impl DashScopeProvider {
    pub fn new(config: DashScopeConfig) -> Self {
        Self {
            id: ProviderId::new(DASHSCOPE_PROVIDER),
            config,
        }
    }

    /// Creates a provider reading `DASHSCOPE_TOKEN` / `DASHSCOPE_BASE_URL`.
    pub fn from_env() -> Self {
        Self::new(DashScopeConfig::from_env())
    }

    /// Registers the adapter under a different provider id.
    pub fn with_id(mut self, id: impl Into<ProviderId>) -> Self {
        self.id = id.into();
        self
    }
}

impl ProviderAdapter for DashScopeProvider {
    fn id(&self) -> ProviderId {
        self.id.clone()
    }

    fn build_request(&self, req: &ProviderRequest) -> Result<RequestDescriptor, AdapterError> {
        let token = resolve_credential(&self.id, &self.config.credential)?;
        let body = build_request_body(req);
        let stream = req.generation.is_stream();
        debug!(run_id = %req.run_id, session_id = %req.session_id, model = %req.model.model, stream, "building DashScope request");

        let mut request = RequestDescriptor::post_json(self.config.generation_url(), body)
            .bearer_auth(&token)
            .streaming(stream);
        if stream {
            request = request
                .header("Accept", "text/event-stream")
                .header("X-DashScope-SSE", "enable");
        }
        Ok(request)
    }

    fn decoder(&self) -> Box<dyn FrameDecoder> {
        Box::new(NativeFrameDecoder::new(self.id.clone()))
    }

    fn parse_response(&self, body: &[u8]) -> Result<ParsedResponse, AdapterError> {
        let value: Value = serde_json::from_slice(body).map_err(|e| {
            AdapterError::invalid_shape(&self.id, format!("response is not JSON: {e}"))
        })?;
        let Some(text) = extract_text(&value) else {
            let message = crate::decode::sse::error_message(&value)
                .unwrap_or("response carries no output text");
            return Err(AdapterError::invalid_shape(&self.id, message));
        };
        let root = payload_root(&value);
        Ok(ParsedResponse {
            text: text.to_string(),
            reasoning: None,
            finish_reason: native_finish_reason(root),
            usage: native_usage(root),
        })
    }
}

/// Request body in the native `{model, input, parameters}` layout.
pub(crate) fn build_request_body(req: &ProviderRequest) -> Value {
    let generation = &req.generation;
    let mut parameters = serde_json::json!({
        "temperature": generation.temperature.unwrap_or(DEFAULT_TEMPERATURE),
        "top_p": generation.top_p.unwrap_or(DEFAULT_TOP_P),
        "max_tokens": generation.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
    });
    if generation.is_stream() {
        parameters["incremental_output"] = Value::Bool(true);
    }
    serde_json::json!({
        "model": req.model.model,
        "input": { "messages": req.messages },
        "parameters": parameters,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Credential;
    use crate::message::{CanonicalMessage, Role};
    use crate::model::{GenerationConfig, ModelRef};

    fn request(generation: GenerationConfig) -> ProviderRequest {
        ProviderRequest {
            run_id: uuid::Uuid::new_v4(),
            session_id: uuid::Uuid::new_v4(),
            model: ModelRef::new("bailian", "qwen-max"),
            messages: vec![
                CanonicalMessage::new(Role::System, "be brief"),
                CanonicalMessage::new(Role::User, "hello"),
            ],
            generation,
        }
    }

    fn provider() -> DashScopeProvider {
        DashScopeProvider::new(
            DashScopeConfig::new("sk-test").base_url("https://dashscope.example.com/"),
        )
    }

    #[test]
    fn streaming_body_nests_messages_and_parameters() {
        let req = request(GenerationConfig::default().stream(true));
        let descriptor = provider().build_request(&req).expect("request");
        assert_eq!(
            descriptor.url,
            "https://dashscope.example.com/api/v1/services/aigc/text-generation/generation"
        );
        assert_eq!(
            descriptor.body,
            serde_json::json!({
                "model": "qwen-max",
                "input": {"messages": [
                    {"role": "system", "content": "be brief"},
                    {"role": "user", "content": "hello"}
                ]},
                "parameters": {
                    "temperature": 0.7,
                    "top_p": 0.8,
                    "max_tokens": 1500,
                    "incremental_output": true
                }
            })
        );
        assert_eq!(descriptor.header_value("authorization"), Some("Bearer sk-test"));
        assert_eq!(descriptor.header_value("x-dashscope-sse"), Some("enable"));
        assert!(descriptor.stream);
    }

    #[test]
    fn buffered_body_omits_incremental_output_and_honors_overrides() {
        let req = request(
            GenerationConfig::default()
                .temperature(0.5)
                .top_p(0.9)
                .max_tokens(100),
        );
        let descriptor = provider().build_request(&req).expect("request");
        assert_eq!(
            descriptor.body["parameters"],
            serde_json::json!({"temperature": 0.5, "top_p": 0.9, "max_tokens": 100})
        );
        assert_eq!(descriptor.header_value("x-dashscope-sse"), None);
        assert!(!descriptor.stream);
    }

    #[test]
    fn missing_credential_fails_before_building() {
        let provider = DashScopeProvider::new(
            DashScopeConfig::new("").credential(Credential::Env("CHAT_ADAPTER_TEST_NO_TOKEN".into())),
        );
        let err = provider
            .build_request(&request(GenerationConfig::default()))
            .expect_err("no credential");
        assert!(matches!(err, AdapterError::MissingCredential { .. }));
    }

    #[test]
    fn parses_buffered_response_shapes() {
        let provider = provider();
        let parsed = provider
            .parse_response(
                br#"{"output":{"text":"Hi","finish_reason":"stop"},"usage":{"input_tokens":5,"output_tokens":1},"request_id":"r"}"#,
            )
            .expect("parse");
        assert_eq!(parsed.text, "Hi");
        assert_eq!(parsed.finish_reason, Some(crate::finish::FinishReason::Stop));
        assert_eq!(parsed.usage, Some(crate::usage::Usage::new(5, 1)));

        let wrapped = provider
            .parse_response(br#"{"data":{"output":{"text":"Yo"}}}"#)
            .expect("wrapped");
        assert_eq!(wrapped.text, "Yo");
        assert_eq!(wrapped.usage, None);
    }

    #[test]
    fn error_body_is_an_invalid_shape() {
        let err = provider()
            .parse_response(br#"{"code":"InvalidApiKey","message":"Invalid API-key provided."}"#)
            .expect_err("error body");
        assert!(err.to_string().contains("Invalid API-key provided."));
    }
}
