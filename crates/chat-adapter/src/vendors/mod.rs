//! Vendor wire protocols.
pub mod compatible;
pub mod dashscope;
