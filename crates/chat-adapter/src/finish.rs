use std::fmt;

/// Canonical reason a generation stopped.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    #[default]
    Stop,
    Length,
    ContentFilter,
    ToolCalls,
}

impl FinishReason {
    /// Maps a provider-native completion code.
    ///
    /// Unknown or missing codes map to `Stop`.
    pub fn from_provider(code: Option<&str>) -> Self {
        match code.map(str::trim) {
            Some("length") => Self::Length,
            Some("content_filter" | "content-filter") => Self::ContentFilter,
            Some("tool_calls" | "tool-calls") => Self::ToolCalls,
            _ => Self::Stop,
        }
    }

    /// Parses a completion code that may be a real reason or a placeholder.
    ///
    /// DashScope reports `"null"` on intermediate frames; that and an empty
    /// string mean no reason yet.
    pub(crate) fn from_reported(code: &str) -> Option<Self> {
        match code.trim() {
            "" | "null" => None,
            other => Some(Self::from_provider(Some(other))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Stop => "stop",
            Self::Length => "length",
            Self::ContentFilter => "content_filter",
            Self::ToolCalls => "tool_calls",
        }
    }
}

impl fmt::Display for FinishReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
