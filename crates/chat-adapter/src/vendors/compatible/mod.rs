//! OpenAI-compatible chat-completions protocol.
//!
//! DashScope serves this protocol under `/compatible-mode/v1`; any other
//! OpenAI-style server works by overriding the base URL and path.
mod adapter;
mod config;

pub use adapter::CompatibleProvider;
pub use config::{COMPATIBLE_PROVIDER, CompatibleConfig};
