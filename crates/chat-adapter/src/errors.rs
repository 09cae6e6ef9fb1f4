use std::fmt;

use crate::model::ProviderId;

/// Canonical error classification carried by `StreamEvent::StreamError`.
///
/// `FrameParse` is the only recoverable kind: it is logged and the offending
/// frame or line is skipped, so it never reaches a caller as a terminal event.
#[derive(Clone, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ErrorKind {
    /// No credential could be resolved for the provider (pre-flight).
    MissingCredential,
    /// Upstream answered with a non-2xx status.
    UpstreamHttp { status: u16 },
    /// A single frame or line could not be parsed.
    FrameParse,
    /// The response had no interpretable top-level shape at all.
    InvalidResponseShape,
    /// Connection-level failure.
    Transport,
}

impl ErrorKind {
    /// Returns `true` for kinds that terminate a stream.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::FrameParse)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingCredential => f.write_str("missing_credential"),
            Self::UpstreamHttp { status } => write!(f, "upstream_http({status})"),
            Self::FrameParse => f.write_str("frame_parse"),
            Self::InvalidResponseShape => f.write_str("invalid_response_shape"),
            Self::Transport => f.write_str("transport"),
        }
    }
}

/// Errors raised by request builders, transports and frame decoders before
/// they are normalized into stream events.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AdapterError {
    /// Credential absent from configuration.
    #[error("missing credential ({provider}): {hint}")]
    MissingCredential { provider: ProviderId, hint: String },
    /// Upstream returned a non-success HTTP status.
    #[error("upstream HTTP error ({provider}): status {status}: {body}")]
    UpstreamHttp {
        provider: ProviderId,
        status: u16,
        body: String,
    },
    /// One frame or line failed to parse.
    #[error("frame parse error ({provider}): {message}")]
    FrameParse {
        provider: ProviderId,
        message: String,
    },
    /// The response as a whole could not be interpreted.
    #[error("invalid response shape ({provider}): {message}")]
    InvalidResponseShape {
        provider: ProviderId,
        message: String,
    },
    /// Network or stream I/O failed.
    #[error("transport error ({provider}): {message}")]
    Transport {
        provider: ProviderId,
        message: String,
    },
}

impl AdapterError {
    /// Creates a missing-credential error.
    pub fn missing_credential(provider: impl Into<ProviderId>, hint: impl Into<String>) -> Self {
        Self::MissingCredential {
            provider: provider.into(),
            hint: hint.into(),
        }
    }

    /// Creates an upstream HTTP error.
    pub fn upstream_http(provider: impl Into<ProviderId>, status: u16, body: impl Into<String>) -> Self {
        Self::UpstreamHttp {
            provider: provider.into(),
            status,
            body: body.into(),
        }
    }

    /// Creates a per-frame parse error.
    pub fn frame_parse(provider: impl Into<ProviderId>, message: impl Into<String>) -> Self {
        Self::FrameParse {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Creates a top-level response shape error.
    pub fn invalid_shape(provider: impl Into<ProviderId>, message: impl Into<String>) -> Self {
        Self::InvalidResponseShape {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Creates a transport-level error.
    pub fn transport(provider: impl Into<ProviderId>, message: impl Into<String>) -> Self {
        Self::Transport {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Returns the canonical kind for this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MissingCredential { .. } => ErrorKind::MissingCredential,
            Self::UpstreamHttp { status, .. } => ErrorKind::UpstreamHttp { status: *status },
            Self::FrameParse { .. } => ErrorKind::FrameParse,
            Self::InvalidResponseShape { .. } => ErrorKind::InvalidResponseShape,
            Self::Transport { .. } => ErrorKind::Transport,
        }
    }

    /// Returns the provider associated with this error.
    pub fn provider_id(&self) -> &ProviderId {
        match self {
            Self::MissingCredential { provider, .. }
            | Self::UpstreamHttp { provider, .. }
            | Self::FrameParse { provider, .. }
            | Self::InvalidResponseShape { provider, .. }
            | Self::Transport { provider, .. } => provider,
        }
    }
}

/// Top-level error type for the public chat API.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChatError {
    /// Invalid harness/provider configuration.
    #[error("config error: {0}")]
    Config(String),
    /// Invalid caller input to the builder API.
    #[error("validation error: {0}")]
    Validation(String),
    /// Requested provider is not registered in the harness.
    #[error("provider not found: {provider}")]
    ProviderNotFound { provider: ProviderId },
    /// Failure raised before a stream was established, or by a buffered call.
    #[error(transparent)]
    Adapter(#[from] AdapterError),
    /// Terminal failure reported by a started stream.
    #[error("stream failed ({kind}): {message}")]
    StreamFailed { kind: ErrorKind, message: String },
    /// The caller cancelled the run.
    #[error("cancelled")]
    Cancelled,
    /// Internal protocol misuse or invariant violation.
    #[error("protocol error: {0}")]
    Protocol(String),
}

impl ChatError {
    pub(crate) fn protocol_msg(message: impl Into<String>) -> Self {
        Self::Protocol(message.into())
    }

    /// Returns the canonical error kind when this error maps onto the taxonomy.
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            Self::Adapter(err) => Some(err.kind()),
            Self::StreamFailed { kind, .. } => Some(kind.clone()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_maps_every_variant() {
        assert_eq!(
            AdapterError::missing_credential("bailian", "set DASHSCOPE_TOKEN").kind(),
            ErrorKind::MissingCredential
        );
        assert_eq!(
            AdapterError::upstream_http("bailian", 429, "slow down").kind(),
            ErrorKind::UpstreamHttp { status: 429 }
        );
        assert_eq!(AdapterError::frame_parse("x", "bad").kind(), ErrorKind::FrameParse);
        assert_eq!(
            AdapterError::invalid_shape("x", "empty").kind(),
            ErrorKind::InvalidResponseShape
        );
        assert_eq!(AdapterError::transport("x", "reset").kind(), ErrorKind::Transport);
    }

    #[test]
    fn only_frame_parse_is_recoverable() {
        assert!(!ErrorKind::FrameParse.is_fatal());
        assert!(ErrorKind::Transport.is_fatal());
        assert!(ErrorKind::UpstreamHttp { status: 500 }.is_fatal());
    }

    #[test]
    fn chat_error_exposes_adapter_kind() {
        let err = ChatError::from(AdapterError::upstream_http("deepseek", 401, "unauthorized"));
        assert_eq!(err.kind(), Some(ErrorKind::UpstreamHttp { status: 401 }));
        assert!(err.to_string().contains("status 401"));
        assert_eq!(ChatError::Cancelled.kind(), None);
    }
}
