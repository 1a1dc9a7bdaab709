//! 上游 LLM Provider

pub mod claude;
