use crate::config::{self, Credential};
use crate::model::ProviderId;

/// Provider id used when none is configured.
pub const COMPATIBLE_PROVIDER: &str = "deepseek";

/// Configuration for an OpenAI-compatible chat-completions endpoint.
#[derive(Clone, Debug)]
pub struct CompatibleConfig {
    /// Id the adapter registers under.
    pub provider_id: ProviderId,
    pub credential: Credential,
    pub base_url: String,
    /// Path appended to `base_url`.
    pub path: String,
}

impl CompatibleConfig {
    /// Creates a config for DashScope's compatible mode using a fixed API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            provider_id: ProviderId::new(COMPATIBLE_PROVIDER),
            credential: Credential::Static(api_key.into()),
            base_url: config::DEFAULT_BASE_URL.to_string(),
            path: "/compatible-mode/v1/chat/completions".to_string(),
        }
    }

    /// Reads `DASHSCOPE_TOKEN` per request and `DASHSCOPE_BASE_URL` once.
    pub fn from_env() -> Self {
        Self {
            credential: Credential::default(),
            base_url: config::base_url_from_env(),
            ..Self::new("")
        }
    }

    pub fn provider_id(mut self, id: impl Into<ProviderId>) -> Self {
        self.provider_id = id.into();
        self
    }

    pub fn credential(mut self, credential: Credential) -> Self {
        self.credential = credential;
        self
    }

    /// Overrides the API base URL (for proxies or test servers).
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Overrides the completions path, e.g. `/v1/chat/completions` for a
    /// plain OpenAI-style server.
    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    pub(crate) fn completions_url(&self) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            self.path.trim_start_matches('/')
        )
    }
}

impl Default for CompatibleConfig {
    fn default() -> Self {
        Self::from_env()
    }
}
