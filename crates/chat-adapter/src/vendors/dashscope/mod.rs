//! DashScope native text-generation protocol.
//!
//! Requests nest messages under `input` and sampling under `parameters`;
//! streamed responses are incremental JSON frames decoded by
//! [`NativeFrameDecoder`](crate::decode::NativeFrameDecoder).
mod adapter;
mod config;

pub use adapter::{DASHSCOPE_PROVIDER, DashScopeProvider};
pub use config::DashScopeConfig;
