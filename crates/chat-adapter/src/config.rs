use std::fmt;

use crate::errors::AdapterError;
use crate::model::ProviderId;

/// Default DashScope endpoint shared by both wire protocols.
pub const DEFAULT_BASE_URL: &str = "https://dashscope.aliyuncs.com";
/// Environment variable holding the DashScope API key.
pub const TOKEN_ENV: &str = "DASHSCOPE_TOKEN";
/// Environment variable overriding [`DEFAULT_BASE_URL`].
pub const BASE_URL_ENV: &str = "DASHSCOPE_BASE_URL";

/// Where a provider credential comes from.
///
/// `Env` is read when a request is built, so a credential exported after the
/// harness was created is still picked up.
#[derive(Clone, PartialEq, Eq)]
pub enum Credential {
    Static(String),
    Env(String),
}

impl Credential {
    /// Returns the credential value, treating blank values as absent.
    pub fn resolve(&self) -> Option<String> {
        let value = match self {
            Self::Static(value) => Some(value.clone()),
            Self::Env(var) => std::env::var(var).ok(),
        };
        value
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn hint(&self) -> String {
        match self {
            Self::Static(_) => "configured API key is empty".to_string(),
            Self::Env(var) => format!("set {var}"),
        }
    }
}

impl Default for Credential {
    fn default() -> Self {
        Self::Env(TOKEN_ENV.to_string())
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Static(_) => f.write_str("Static(<redacted>)"),
            Self::Env(var) => f.debug_tuple("Env").field(var).finish(),
        }
    }
}

/// Resolves `credential` or fails with `MissingCredential` for `provider`.
pub(crate) fn resolve_credential(
    provider: &ProviderId,
    credential: &Credential,
) -> Result<String, AdapterError> {
    credential
        .resolve()
        .ok_or_else(|| AdapterError::missing_credential(provider, credential.hint()))
}

/// Base URL from `DASHSCOPE_BASE_URL`, falling back to the public endpoint.
pub(crate) fn base_url_from_env() -> String {
    std::env::var(BASE_URL_ENV)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_static_credential_is_missing() {
        let err = resolve_credential(&ProviderId::new("bailian"), &Credential::Static("  ".into()))
            .expect_err("blank");
        assert_eq!(err.kind(), crate::errors::ErrorKind::MissingCredential);
    }

    #[test]
    fn unset_env_credential_names_the_variable() {
        let credential = Credential::Env("CHAT_ADAPTER_TEST_UNSET_TOKEN".into());
        let err = resolve_credential(&ProviderId::new("bailian"), &credential).expect_err("unset");
        assert!(err.to_string().contains("CHAT_ADAPTER_TEST_UNSET_TOKEN"));
    }

    #[test]
    fn static_credential_is_trimmed_and_redacted() {
        let credential = Credential::Static(" sk-1 ".into());
        assert_eq!(credential.resolve().as_deref(), Some("sk-1"));
        assert_eq!(format!("{credential:?}"), "Static(<redacted>)");
    }
}
