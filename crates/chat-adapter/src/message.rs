//! Message canonicalization.
//!
//! Providers accept only flat `{role, content}` pairs with string content.
//! [`canonicalize`] converts caller conversations into that shape without any
//! I/O.

use std::fmt;

use tracing::{debug, warn};

use crate::content::{ContentPart, InputMessage, MessageContent};

/// Roles every provider understands.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

impl Role {
    /// Parses a recognized role, ignoring surrounding whitespace and ASCII case.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "system" => Some(Self::System),
            "user" => Some(Self::User),
            "assistant" => Some(Self::Assistant),
            "tool" => Some(Self::Tool),
            _ => None,
        }
    }

    /// Parses a role, falling back to `User` for anything unrecognized.
    pub fn coerce(raw: &str) -> Self {
        Self::parse(raw).unwrap_or_else(|| {
            warn!(role = raw, "unrecognized message role, treating as user");
            Self::User
        })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::Tool => "tool",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Provider-agnostic message with flattened string content.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct CanonicalMessage {
    pub role: Role,
    pub content: String,
}

impl CanonicalMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// Flattens a conversation into canonical messages, preserving order.
///
/// Text parts are joined with newlines and tool results are rendered as JSON.
/// Reasoning, image, file, tool-call and unknown parts carry nothing a
/// text-only provider can use and are dropped. Messages left with no content
/// are omitted.
pub fn canonicalize(messages: &[InputMessage]) -> Vec<CanonicalMessage> {
    messages
        .iter()
        .filter_map(|message| {
            let role = Role::coerce(&message.role);
            let content = flatten_content(&message.content);
            if content.is_empty() {
                debug!(role = %role, "dropping message with no text content");
                return None;
            }
            Some(CanonicalMessage { role, content })
        })
        .collect()
}

/// Renders a single message body as plain text.
pub fn flatten_content(content: &MessageContent) -> String {
    match content {
        MessageContent::Text(text) => text.clone(),
        MessageContent::Parts(parts) => {
            let mut segments = Vec::with_capacity(parts.len());
            for part in parts {
                match part {
                    ContentPart::Text { text } => segments.push(text.clone()),
                    ContentPart::ToolResult { result, .. } => match result {
                        serde_json::Value::String(text) => segments.push(text.clone()),
                        other => segments.push(other.to_string()),
                    },
                    _ => {}
                }
            }
            segments.join("\n")
        }
    }
}
