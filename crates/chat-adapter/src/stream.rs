use crate::errors::ErrorKind;
use crate::finish::FinishReason;
use crate::usage::Usage;

/// Normalized stream events exposed by `RunStream`.
///
/// Events arrive in upstream order. Exactly one terminal event (`Finish` or
/// `StreamError`) ends every stream that is not cancelled.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    /// Incremental answer text.
    TextDelta { text: String },
    /// Incremental reasoning text.
    ReasoningDelta { text: String },
    /// Opens the stream's reasoning block.
    ReasoningStart { block_id: String },
    /// Live elapsed time of the open reasoning block.
    ReasoningTimeUpdate { block_id: String, elapsed_secs: u64 },
    /// Closes the reasoning block with its final duration.
    ReasoningEnd { block_id: String, elapsed_secs: u64 },
    /// Terminal success event.
    Finish { reason: FinishReason, usage: Usage },
    /// Terminal failure event.
    StreamError { kind: ErrorKind, message: String },
}

impl StreamEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Finish { .. } | Self::StreamError { .. })
    }
}
