use crate::config::{self, Credential};

/// Configuration for the DashScope native text-generation API.
#[derive(Clone, Debug)]
pub struct DashScopeConfig {
    /// API key source, sent as a bearer token.
    pub credential: Credential,
    /// Endpoint root, without the `/api/v1/...` path.
    pub base_url: String,
}

impl DashScopeConfig {
    /// Creates a config using a fixed API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            credential: Credential::Static(api_key.into()),
            base_url: config::DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Reads the key from `DASHSCOPE_TOKEN` when each request is built and the
    /// endpoint from `DASHSCOPE_BASE_URL` when set.
    pub fn from_env() -> Self {
        Self {
            credential: Credential::default(),
            base_url: config::base_url_from_env(),
        }
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

    pub(crate) fn generation_url(&self) -> String {
        format!(
            "{}/api/v1/services/aigc/text-generation/generation",
            self.base_url.trim_end_matches('/')
        )
    }
}

impl Default for DashScopeConfig {
    fn default() -> Self {
        Self::from_env()
    }
}
