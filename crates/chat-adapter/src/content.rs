use crate::finish::FinishReason;
use crate::usage::Usage;

/// A caller-supplied conversation message before canonicalization.
///
/// `role` is kept as a raw string so conversations coming from other systems
/// deserialize without loss; unknown roles are coerced later.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct InputMessage {
    pub role: String,
    pub content: MessageContent,
}

impl InputMessage {
    pub fn new(role: impl Into<String>, content: impl Into<MessageContent>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
        }
    }

    pub fn system(text: impl Into<String>) -> Self {
        Self::new("system", text.into())
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::new("user", text.into())
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self::new("assistant", text.into())
    }
}

impl From<&str> for InputMessage {
    fn from(value: &str) -> Self {
        Self::user(value)
    }
}

impl From<String> for InputMessage {
    fn from(value: String) -> Self {
        Self::user(value)
    }
}

/// Message body: plain text or a structured multi-part body.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

impl From<String> for MessageContent {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&str> for MessageContent {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<Vec<ContentPart>> for MessageContent {
    fn from(value: Vec<ContentPart>) -> Self {
        Self::Parts(value)
    }
}

/// One part of a structured message body.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
#[non_exhaustive]
pub enum ContentPart {
    Text {
        text: String,
    },
    /// Reasoning captured from an earlier assistant turn.
    Reasoning {
        text: String,
    },
    Image {
        image: String,
    },
    File {
        data: String,
        #[serde(rename = "mimeType", default, skip_serializing_if = "Option::is_none")]
        mime_type: Option<String>,
    },
    ToolCall {
        #[serde(rename = "toolCallId")]
        tool_call_id: String,
        #[serde(rename = "toolName")]
        tool_name: String,
        #[serde(default)]
        args: serde_json::Value,
    },
    ToolResult {
        #[serde(rename = "toolCallId")]
        tool_call_id: String,
        #[serde(rename = "toolName")]
        tool_name: String,
        #[serde(default)]
        result: serde_json::Value,
    },
    /// Any part type this crate does not know about.
    #[serde(other)]
    Unsupported,
}

impl ContentPart {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }
}

/// Final aggregated result of a completed request.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize, Default)]
pub struct ChatResponse {
    /// Answer text.
    pub text: String,
    /// Reasoning text, for providers exposing a reasoning channel.
    pub reasoning: Option<String>,
    pub finish_reason: FinishReason,
    pub usage: Usage,
}
